mod common;

use anyhow::Result;
use bitcoin::{Amount, Network};
use btcw_core::address::BitcoinAddressCodec;
use btcw_core::assembler::ChangePolicy;
use btcw_core::cancel::Cancellation;
use btcw_core::config::{self, Config};
use btcw_core::fee::{FeeModel, FeeModelKind, FeeRate, SegwitFeeModel};
use btcw_core::memory::{FixedFeeRate, RecordingBroadcaster, StaticUnspentOutputs};
use btcw_core::transfer::{TransferRequest, TransferService};
use btcw_core::utxo_selection::SearchKind;
use btcw_core::TransferError;
use std::error::Error;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

// Writes `content` to a config file inside a fresh temp directory
fn write_config(content: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("btcw.toml");
    fs::write(&config_path, content).expect("Failed to write test config");
    (temp_dir, config_path)
}

#[test]
fn test_ensure_config_exists_creates_default() -> Result<()> {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("btcw.toml");

    config::ensure_config_exists(&config_path)?;
    assert!(config_path.exists(), "Config file was not created");

    let config = Config::load(&config_path)?;
    assert_eq!(config, Config::default());
    assert_eq!(config.bitcoin_network()?, Network::Testnet);
    Ok(())
}

#[test]
fn test_ensure_config_exists_keeps_existing_file() -> Result<()> {
    let (_dir, config_path) = write_config("[network]\nnetwork = \"regtest\"\n");

    config::ensure_config_exists(&config_path)?;

    let config = Config::load(&config_path)?;
    assert_eq!(config.bitcoin_network()?, Network::Regtest);
    Ok(())
}

#[test]
fn test_save_and_load_round_trip() -> Result<()> {
    let (_dir, config_path) = write_config("");

    let mut config = Config::default();
    config.network.network = "signet".to_string();
    config.network.timeout_seconds = 5;
    config.selection.search = SearchKind::Randomized;
    config.selection.seed = Some(42);
    config.fees.model = FeeModelKind::Segwit;
    config.change.fold_dust = true;
    config.change.dust_limit = 1_000;
    config.save(&config_path)?;

    let loaded = Config::load(&config_path)?;
    assert_eq!(loaded, config);
    assert_eq!(loaded.change_policy(), ChangePolicy::FoldDust(1_000));
    assert_eq!(loaded.request_timeout().as_secs(), 5);
    Ok(())
}

#[test]
fn test_invalid_toml_is_an_error() {
    let (_dir, config_path) = write_config("[network\nnetwork = ");
    let result = Config::load(&config_path);
    assert!(result.is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    assert!(Config::load(temp_dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_service_from_config_uses_configured_fee_model() -> Result<()> {
    common::setup();
    let (_dir, config_path) = write_config(
        r#"
        [fees]
        model = "segwit"

        [transfer]
        verify_before_broadcast = true
        "#,
    );
    let config = Config::load(&config_path)?;

    let from = common::segwit_sender_address();
    let rate = common::scenario_rate();
    let service = TransferService::from_config(
        &config,
        Arc::new(StaticUnspentOutputs::new().with_outputs(&from, common::utxos(&[30_000]))),
        Arc::new(FixedFeeRate(rate)),
        Arc::new(RecordingBroadcaster::new()),
        Arc::new(BitcoinAddressCodec::new(config.bitcoin_network()?)),
    )?;

    let request = TransferRequest::new(from, common::recipient_address(), Amount::from_sat(17_891));
    let receipt = service.transfer(&request, &common::segwit_sender_key(), &Cancellation::none())?;
    assert_eq!(receipt.signed.fee, SegwitFeeModel.estimated_fee(rate, 1, 2));
    Ok(())
}

#[test]
fn test_service_from_invalid_config_fails() {
    let mut config = Config::default();
    config.network.conf_target = 0;

    let result = TransferService::from_config(
        &config,
        Arc::new(StaticUnspentOutputs::new()),
        Arc::new(FixedFeeRate(FeeRate::ZERO)),
        Arc::new(RecordingBroadcaster::new()),
        Arc::new(BitcoinAddressCodec::new(Network::Testnet)),
    );
    match result {
        Err(err @ TransferError::Config { .. }) => {
            let cause = err.source().map(|s| s.to_string()).unwrap_or_default();
            assert!(cause.contains("confirmation target"), "unexpected cause: {}", cause);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("invalid config accepted"),
    }
}
