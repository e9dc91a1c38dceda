//! Signing and verification of assembled transactions

mod common;

use bitcoin::{Amount, Network};
use btcw_core::address::BitcoinAddressCodec;
use btcw_core::assembler::{TransactionAssembler, UnsignedTransaction};
use btcw_core::fee::{FeeModel, LegacyFeeModel, SegwitFeeModel};
use btcw_core::keys;
use btcw_core::signer::Signer;
use btcw_core::types::SensitiveString;
use btcw_core::utxo_selection::CoinSelector;
use btcw_core::TransferError;
use common::{scenario_rate, setup, utxos};
use std::sync::Arc;

fn build_unsigned(
    from: &str,
    amounts: &[u64],
    amount: u64,
    model: Arc<dyn FeeModel>,
) -> UnsignedTransaction {
    let rate = scenario_rate();
    let selection = CoinSelector::new(model.clone())
        .select(&utxos(amounts), Amount::from_sat(amount), rate)
        .unwrap();
    TransactionAssembler::new(model, Arc::new(BitcoinAddressCodec::new(Network::Testnet)))
        .assemble(&selection, from, &common::recipient_address(), Amount::from_sat(amount), rate)
        .unwrap()
}

#[test]
fn test_sign_legacy_inputs() {
    setup();
    let unsigned = build_unsigned(
        &common::sender_address(),
        &[4_000, 6_000, 7_000, 9_000],
        12_000,
        Arc::new(LegacyFeeModel),
    );
    assert!(unsigned.tx.input.len() > 1);

    let signer = Signer::new();
    let signed = signer.sign(&unsigned, &common::sender_key()).unwrap();

    assert!(signed.tx.input.iter().all(|i| !i.script_sig.is_empty() && i.witness.is_empty()));
    assert!(signer.verify(&signed).is_ok());
    assert_eq!(signed.to_hex(), hex::encode(signed.to_bytes()));
    assert_eq!(signed.fee, unsigned.fee);
}

#[test]
fn test_sign_segwit_inputs() {
    setup();
    let unsigned = build_unsigned(
        &common::segwit_sender_address(),
        &[30_000],
        17_891,
        Arc::new(SegwitFeeModel),
    );

    let signer = Signer::new();
    let signed = signer.sign(&unsigned, &common::segwit_sender_key()).unwrap();

    let input = &signed.tx.input[0];
    assert!(input.script_sig.is_empty());
    assert_eq!(input.witness.len(), 2);
    assert!(signer.verify_input(&signed.tx, 0, &signed.prevouts[0]).is_ok());
    // witness data does not change the txid
    assert_eq!(signed.txid(), unsigned.tx.txid());
}

#[test]
fn test_uncompressed_legacy_key() {
    setup();
    let key = keys::private_key_from_hex(
        &SensitiveString::new("18e14a7b6a307f426a94f8114701e7c8e774e7f9a47e2c2035db29a206321725"),
        Network::Testnet,
        false,
    )
    .unwrap();
    let from = keys::legacy_address(&key).to_string();
    let unsigned = build_unsigned(&from, &[50_000], 20_000, Arc::new(LegacyFeeModel));

    let signer = Signer::new();
    let signed = signer.sign(&unsigned, &key).unwrap();
    assert!(signer.verify(&signed).is_ok());
}

#[test]
fn test_signing_twice_gives_two_valid_signatures() {
    setup();
    let unsigned = build_unsigned(
        &common::sender_address(),
        &[5_000, 15_000, 33_000],
        17_891,
        Arc::new(LegacyFeeModel),
    );
    let signer = Signer::new();
    let key = common::sender_key();

    let first = signer.sign(&unsigned, &key).unwrap();
    let second = Signer::new().sign(&unsigned, &key).unwrap();

    assert!(signer.verify(&first).is_ok());
    assert!(signer.verify(&second).is_ok());
    assert_eq!(first.to_bytes(), second.to_bytes());
}

#[test]
fn test_wrong_key_is_signing_error() {
    setup();
    let unsigned = build_unsigned(
        &common::sender_address(),
        &[50_000],
        20_000,
        Arc::new(LegacyFeeModel),
    );
    let err = Signer::new()
        .sign(&unsigned, &common::key_from_byte(0x44))
        .unwrap_err();
    assert!(matches!(err, TransferError::SigningError(_)));
}

#[test]
fn test_segwit_signature_commits_to_amount() {
    setup();
    let unsigned = build_unsigned(
        &common::segwit_sender_address(),
        &[30_000],
        10_000,
        Arc::new(SegwitFeeModel),
    );
    let signer = Signer::new();
    let signed = signer.sign(&unsigned, &common::segwit_sender_key()).unwrap();

    let mut tampered = signed.prevouts[0].clone();
    tampered.amount = Amount::from_sat(31_000);
    assert!(matches!(
        signer.verify_input(&signed.tx, 0, &tampered),
        Err(TransferError::SigningError(_))
    ));
}

#[test]
fn test_modified_output_invalidates_signature() {
    setup();
    let unsigned = build_unsigned(
        &common::sender_address(),
        &[50_000],
        20_000,
        Arc::new(LegacyFeeModel),
    );
    let signer = Signer::new();
    let mut signed = signer.sign(&unsigned, &common::sender_key()).unwrap();
    signed.tx.output[0].value += 1;

    assert!(signer.verify(&signed).is_err());
}

#[test]
fn test_unsigned_input_fails_verification() {
    setup();
    let unsigned = build_unsigned(
        &common::sender_address(),
        &[50_000],
        20_000,
        Arc::new(LegacyFeeModel),
    );
    let err = Signer::new()
        .verify_input(&unsigned.tx, 0, &unsigned.prevouts[0])
        .unwrap_err();
    assert!(matches!(err, TransferError::SigningError(_)));
}
