//! Shared fixtures for btcw-core integration tests

#![allow(dead_code)]

use bitcoin::hashes::Hash;
use bitcoin::{Network, PrivateKey, Txid};
use btcw_core::fee::FeeRate;
use btcw_core::keys;
use btcw_core::logging::{self, LogConfig, LogLevel};
use btcw_core::types::UnspentOutput;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging once for the whole test binary
pub fn setup() {
    INIT.call_once(|| {
        let config = LogConfig {
            level: LogLevel::Error,
            log_file: None,
            include_timestamps: false,
            include_source_location: false,
            json_format: false,
        };
        let _ = logging::init(&config);
    });
}

pub const NETWORK: Network = Network::Testnet;

/// Fee rate at which one input and two outputs cost exactly 2000 sats
/// under the legacy model
pub fn scenario_rate() -> FeeRate {
    FeeRate::from_sat_per_kvb(7_722)
}

pub fn key_from_byte(byte: u8) -> PrivateKey {
    PrivateKey::from_slice(&[byte; 32], NETWORK).expect("valid test key")
}

/// Key whose legacy address funds the test transfers
pub fn sender_key() -> PrivateKey {
    key_from_byte(0x11)
}

pub fn sender_address() -> String {
    keys::legacy_address(&sender_key()).to_string()
}

pub fn segwit_sender_key() -> PrivateKey {
    key_from_byte(0x22)
}

pub fn segwit_sender_address() -> String {
    keys::segwit_address(&segwit_sender_key())
        .expect("compressed key")
        .to_string()
}

pub fn recipient_address() -> String {
    keys::segwit_address(&key_from_byte(0x33))
        .expect("compressed key")
        .to_string()
}

pub fn txid(n: u8) -> Txid {
    Txid::from_byte_array([n; 32])
}

/// One output per amount, each from a distinct transaction
pub fn utxos(amounts: &[u64]) -> Vec<UnspentOutput> {
    amounts
        .iter()
        .enumerate()
        .map(|(i, amount)| UnspentOutput::new(txid(i as u8 + 1), i as u32, *amount))
        .collect()
}

pub fn sats(outputs: &[UnspentOutput]) -> Vec<u64> {
    outputs.iter().map(|u| u.sats()).collect()
}
