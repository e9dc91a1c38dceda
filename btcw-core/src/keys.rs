//! Private key loading and address derivation
//!
//! Secrets come in as [`SensitiveString`] so the text form is zeroed once the
//! key is parsed. Fresh keys are drawn from the thread-local generator and
//! the raw bytes are wiped after use.

use crate::error::{TransferError, TransferResult};
use crate::types::SensitiveString;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::{Address, Network, PrivateKey};
use rand::RngCore;
use zeroize::Zeroize;

/// Generate a new compressed private key for `network`
pub fn generate_private_key(network: Network) -> TransferResult<PrivateKey> {
    let mut bytes = [0u8; 32];
    // retry on out-of-range scalars
    for _ in 0..8 {
        rand::rng().fill_bytes(&mut bytes);
        let parsed = PrivateKey::from_slice(&bytes, network);
        bytes.zeroize();
        if let Ok(key) = parsed {
            return Ok(key);
        }
    }
    Err(TransferError::SigningError(
        "could not generate a valid private key".to_string(),
    ))
}

/// Load a private key from wallet import format
pub fn private_key_from_wif(wif: &SensitiveString) -> TransferResult<PrivateKey> {
    PrivateKey::from_wif(wif.expose_secret().trim())
        .map_err(|_| TransferError::SigningError("invalid WIF private key".to_string()))
}

/// Load a private key from 64 hex characters
///
/// # Arguments
/// * `hex_key` - Hex encoded 32-byte secret
/// * `network` - Network the key is used on
/// * `compressed` - Whether the public key is serialized compressed
pub fn private_key_from_hex(
    hex_key: &SensitiveString,
    network: Network,
    compressed: bool,
) -> TransferResult<PrivateKey> {
    let mut bytes = hex::decode(hex_key.expose_secret().trim())
        .map_err(|_| TransferError::SigningError("private key is not valid hex".to_string()))?;
    if bytes.len() != 32 {
        bytes.zeroize();
        return Err(TransferError::SigningError(
            "private key must be 32 bytes".to_string(),
        ));
    }

    let parsed = PrivateKey::from_slice(&bytes, network);
    bytes.zeroize();
    let mut key = parsed
        .map_err(|_| TransferError::SigningError("private key out of range".to_string()))?;
    key.compressed = compressed;
    Ok(key)
}

/// Load a key that may be either WIF or hex, as found in config or on a CLI
pub fn parse_private_key(
    secret: &SensitiveString,
    network: Network,
) -> TransferResult<PrivateKey> {
    let text = secret.expose_secret().trim();
    let is_hex = text.len() == 64 && text.chars().all(|c| c.is_ascii_hexdigit());
    let mut key = if is_hex {
        private_key_from_hex(secret, network, true)?
    } else {
        private_key_from_wif(secret)?
    };

    // WIF only tells mainnet from the test networks
    if (key.network == Network::Bitcoin) != (network == Network::Bitcoin) {
        return Err(TransferError::SigningError(format!(
            "private key is for {}, expected {}",
            key.network, network
        )));
    }
    key.network = network;
    Ok(key)
}

/// Legacy pay-to-pubkey-hash address of a key
pub fn legacy_address(key: &PrivateKey) -> Address {
    let secp = Secp256k1::signing_only();
    Address::p2pkh(&key.public_key(&secp), key.network)
}

/// Native segwit pay-to-witness-pubkey-hash address of a key
///
/// Fails for uncompressed keys, which cannot be used with segwit.
pub fn segwit_address(key: &PrivateKey) -> TransferResult<Address> {
    let secp = Secp256k1::signing_only();
    Address::p2wpkh(&key.public_key(&secp), key.network).map_err(|_| {
        TransferError::SigningError("segwit addresses need a compressed key".to_string())
    })
}
