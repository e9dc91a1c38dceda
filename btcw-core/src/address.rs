//! Address to spend-script resolution
//!
//! The assembler needs a script pubkey for the payment and change outputs,
//! and the signer needs to know which script each input spends. Both get it
//! through an [`AddressCodec`], so tests and other chains can swap the
//! encoding without touching the pipeline.

use crate::error::{TransferError, TransferResult};
use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Network, ScriptBuf};
use std::str::FromStr;

/// Resolves a textual address into the script that locks funds to it
pub trait AddressCodec: Send + Sync {
    /// Script pubkey for `address`
    ///
    /// # Errors
    /// `InvalidAddress` when the address is malformed or belongs to another network
    fn script_for(&self, address: &str) -> TransferResult<ScriptBuf>;
}

/// [`AddressCodec`] backed by the `bitcoin` crate's address parser
#[derive(Debug, Clone, Copy)]
pub struct BitcoinAddressCodec {
    network: Network,
}

impl BitcoinAddressCodec {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Parse and network-check an address
    pub fn parse(&self, address: &str) -> TransferResult<Address> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(TransferError::InvalidAddress("empty address".to_string()));
        }

        let unchecked = Address::<NetworkUnchecked>::from_str(trimmed)
            .map_err(|e| TransferError::InvalidAddress(format!("{}: {}", trimmed, e)))?;

        unchecked.require_network(self.network).map_err(|_| {
            TransferError::InvalidAddress(format!(
                "{} is not a {} address",
                trimmed, self.network
            ))
        })
    }
}

impl AddressCodec for BitcoinAddressCodec {
    fn script_for(&self, address: &str) -> TransferResult<ScriptBuf> {
        Ok(self.parse(address)?.script_pubkey())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_p2pkh_script() {
        let codec = BitcoinAddressCodec::new(Network::Bitcoin);
        let script = codec.script_for("1PMycacnJaSqwwJqjawXBErnLsZ7RkXUAs").unwrap();
        assert!(script.is_p2pkh());
    }

    #[test]
    fn test_segwit_script() {
        let codec = BitcoinAddressCodec::new(Network::Bitcoin);
        let script = codec
            .script_for("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4")
            .unwrap();
        assert!(script.is_v0_p2wpkh());
    }

    #[test]
    fn test_wrong_network_rejected() {
        let codec = BitcoinAddressCodec::new(Network::Testnet);
        let err = codec
            .script_for("1PMycacnJaSqwwJqjawXBErnLsZ7RkXUAs")
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidAddress(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = BitcoinAddressCodec::new(Network::Bitcoin);
        assert!(matches!(
            codec.script_for("not-an-address"),
            Err(TransferError::InvalidAddress(_))
        ));
        assert!(matches!(codec.script_for("  "), Err(TransferError::InvalidAddress(_))));
    }
}
