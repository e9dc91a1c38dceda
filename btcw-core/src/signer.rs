//! Transaction signing and signature verification
//!
//! Every input is signed against its own previous output: P2PKH inputs use
//! the legacy sighash and get `<sig> <pubkey>` as script sig, P2WPKH inputs
//! use the BIP143 sighash (which commits to the amount) and get a
//! `[sig, pubkey]` witness. Signatures use RFC6979 nonces, so re-signing the
//! same skeleton with the same key yields the same bytes.
//!
//! # Security Considerations
//!
//! - The key is checked against every input script before anything is signed
//! - Private keys are borrowed, never copied or logged

use crate::assembler::{PreviousOutput, UnsignedTransaction};
use crate::error::{TransferError, TransferResult};
use crate::logging::{log_params, log_signing, sanitize_for_logging, LogLevel};
use bitcoin::consensus::encode::{serialize, serialize_hex};
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, Instruction, PushBytesBuf};
use bitcoin::secp256k1::{All, Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{PrivateKey, PublicKey, Script, ScriptBuf, Transaction, Txid, Witness};
use log::debug;

/// A fully signed transaction, ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub prevouts: Vec<PreviousOutput>,
    pub fee: u64,
    pub change: u64,
}

impl SignedTransaction {
    /// Consensus serialization
    pub fn to_bytes(&self) -> Vec<u8> {
        serialize(&self.tx)
    }

    /// Consensus serialization as lowercase hex, the form nodes accept
    pub fn to_hex(&self) -> String {
        serialize_hex(&self.tx)
    }

    pub fn txid(&self) -> Txid {
        self.tx.txid()
    }

    pub fn vsize(&self) -> usize {
        self.tx.vsize()
    }
}

/// Kinds of previous output script the signer can spend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpendKind {
    P2pkh,
    P2wpkh,
}

/// Signs and verifies transaction inputs
pub struct Signer {
    secp: Secp256k1<All>,
}

impl Signer {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    /// Sign every input of `unsigned` with `key`
    ///
    /// # Arguments
    /// * `unsigned` - Transaction skeleton with its previous outputs
    /// * `key` - Private key controlling every previous output
    ///
    /// # Returns
    /// * The signed transaction, or `SigningError` when the key does not
    ///   match an input script or signing fails
    pub fn sign(
        &self,
        unsigned: &UnsignedTransaction,
        key: &PrivateKey,
    ) -> TransferResult<SignedTransaction> {
        let tx = &unsigned.tx;
        if tx.input.len() != unsigned.prevouts.len() {
            return Err(TransferError::SigningError(format!(
                "{} inputs but {} previous outputs",
                tx.input.len(),
                unsigned.prevouts.len()
            )));
        }

        let public_key = key.public_key(&self.secp);
        let kinds = unsigned
            .prevouts
            .iter()
            .enumerate()
            .map(|(index, prevout)| spend_kind(&public_key, &prevout.script_pubkey, index))
            .collect::<TransferResult<Vec<_>>>()?;

        let mut cache = SighashCache::new(tx);
        let mut signatures = Vec::with_capacity(kinds.len());
        for (index, (prevout, kind)) in unsigned.prevouts.iter().zip(&kinds).enumerate() {
            let message = sighash_message(
                &mut cache,
                index,
                prevout,
                *kind,
                &public_key,
                EcdsaSighashType::All,
            )?;
            let signature = bitcoin::ecdsa::Signature {
                sig: self.secp.sign_ecdsa(&message, &key.inner),
                hash_ty: EcdsaSighashType::All,
            };
            debug!("Signed input {} ({:?})", index, kind);
            signatures.push(signature.to_vec());
        }

        let mut signed = tx.clone();
        for ((input, kind), signature) in signed.input.iter_mut().zip(&kinds).zip(signatures) {
            match kind {
                SpendKind::P2pkh => {
                    let push = PushBytesBuf::try_from(signature).map_err(|e| {
                        TransferError::SigningError(format!("signature push: {}", e))
                    })?;
                    input.script_sig = Builder::new()
                        .push_slice(push)
                        .push_key(&public_key)
                        .into_script();
                }
                SpendKind::P2wpkh => {
                    let mut witness = Witness::new();
                    witness.push(signature);
                    witness.push(public_key.to_bytes());
                    input.witness = witness;
                }
            }
        }

        let signed = SignedTransaction {
            tx: signed,
            prevouts: unsigned.prevouts.clone(),
            fee: unsigned.fee,
            change: unsigned.change,
        };
        log_signing(
            LogLevel::Info,
            "transaction signed",
            Some(log_params(vec![
                ("inputs", signed.tx.input.len().to_string()),
                ("txid", sanitize_for_logging(&signed.txid().to_string())),
            ])),
        );
        Ok(signed)
    }

    /// Fail with `SigningError` unless `key` can spend outputs locked by `script`
    pub fn check_key(&self, key: &PrivateKey, script: &Script) -> TransferResult<()> {
        spend_kind(&key.public_key(&self.secp), script, 0).map(|_| ())
    }

    /// Check the signature of one input against its previous output
    ///
    /// Re-derives the sighash from the previous script and amount, checks
    /// that the supplied public key hashes to the script, and verifies the
    /// ECDSA signature.
    pub fn verify_input(
        &self,
        tx: &Transaction,
        index: usize,
        prevout: &PreviousOutput,
    ) -> TransferResult<()> {
        let input = tx.input.get(index).ok_or_else(|| {
            TransferError::SigningError(format!("transaction has no input {}", index))
        })?;

        let pushes: Vec<Vec<u8>> = if prevout.script_pubkey.is_p2pkh() {
            script_pushes(&input.script_sig)?
        } else {
            input.witness.to_vec()
        };
        let (sig_bytes, key_bytes) = match pushes.as_slice() {
            [sig, key] => (sig, key),
            _ => {
                return Err(TransferError::SigningError(format!(
                    "input {} is not signed",
                    index
                )))
            }
        };

        let public_key = PublicKey::from_slice(key_bytes).map_err(|e| {
            TransferError::SigningError(format!("input {} public key: {}", index, e))
        })?;
        let kind = spend_kind(&public_key, &prevout.script_pubkey, index)?;
        let signature = bitcoin::ecdsa::Signature::from_slice(sig_bytes).map_err(|e| {
            TransferError::SigningError(format!("input {} signature: {}", index, e))
        })?;

        let mut cache = SighashCache::new(tx);
        let message = sighash_message(
            &mut cache,
            index,
            prevout,
            kind,
            &public_key,
            signature.hash_ty,
        )?;
        self.secp
            .verify_ecdsa(&message, &signature.sig, &public_key.inner)
            .map_err(|_| {
                TransferError::SigningError(format!("input {} signature does not verify", index))
            })
    }

    /// Verify every input of a signed transaction
    pub fn verify(&self, signed: &SignedTransaction) -> TransferResult<()> {
        if signed.tx.input.len() != signed.prevouts.len() {
            return Err(TransferError::SigningError(
                "input and previous output counts differ".to_string(),
            ));
        }
        for (index, prevout) in signed.prevouts.iter().enumerate() {
            self.verify_input(&signed.tx, index, prevout)?;
        }
        Ok(())
    }
}

impl Default for Signer {
    fn default() -> Self {
        Self::new()
    }
}

/// Match `public_key` against the script being spent
fn spend_kind(public_key: &PublicKey, script: &Script, index: usize) -> TransferResult<SpendKind> {
    if script.is_p2pkh() {
        if ScriptBuf::new_p2pkh(&public_key.pubkey_hash()).as_script() != script {
            return Err(TransferError::SigningError(format!(
                "key does not control input {}",
                index
            )));
        }
        return Ok(SpendKind::P2pkh);
    }

    if script.is_v0_p2wpkh() {
        let wpkh = public_key.wpubkey_hash().ok_or_else(|| {
            TransferError::SigningError(format!(
                "input {} is segwit but the key is uncompressed",
                index
            ))
        })?;
        if ScriptBuf::new_v0_p2wpkh(&wpkh).as_script() != script {
            return Err(TransferError::SigningError(format!(
                "key does not control input {}",
                index
            )));
        }
        return Ok(SpendKind::P2wpkh);
    }

    Err(TransferError::SigningError(format!(
        "input {} has an unsupported script type",
        index
    )))
}

fn sighash_message(
    cache: &mut SighashCache<&Transaction>,
    index: usize,
    prevout: &PreviousOutput,
    kind: SpendKind,
    public_key: &PublicKey,
    hash_ty: EcdsaSighashType,
) -> TransferResult<Message> {
    let digest = match kind {
        SpendKind::P2pkh => cache
            .legacy_signature_hash(index, &prevout.script_pubkey, hash_ty.to_u32())?
            .to_byte_array(),
        SpendKind::P2wpkh => {
            let script_code = ScriptBuf::new_p2pkh(&public_key.pubkey_hash());
            cache
                .segwit_signature_hash(index, &script_code, prevout.amount.to_sat(), hash_ty)?
                .to_byte_array()
        }
    };
    Ok(Message::from_slice(&digest)?)
}

/// Data pushes of a push-only script sig
fn script_pushes(script: &Script) -> TransferResult<Vec<Vec<u8>>> {
    let mut pushes = Vec::new();
    for instruction in script.instructions() {
        match instruction {
            Ok(Instruction::PushBytes(bytes)) => pushes.push(bytes.as_bytes().to_vec()),
            Ok(Instruction::Op(_)) => {
                return Err(TransferError::SigningError(
                    "script sig is not push-only".to_string(),
                ))
            }
            Err(e) => return Err(TransferError::SigningError(format!("script sig: {}", e))),
        }
    }
    Ok(pushes)
}
