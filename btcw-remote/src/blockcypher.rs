//! Address indexer client (BlockCypher REST API)
//!
//! Unspent outputs come from `GET {base}/addrs/{address}?unspentOnly=true`,
//! balances from `GET {base}/addrs/{address}/balance`. Only the fields the
//! wallet uses are decoded; everything else in the response is ignored.

use crate::error::RemoteError;
use crate::http::{self, DEFAULT_TIMEOUT};
use btcw_core::cancel::Cancellation;
use btcw_core::logging::sanitize_for_logging;
use btcw_core::source::UnspentOutputSource;
use btcw_core::types::UnspentOutput;
use btcw_core::{TransferError, TransferResult};
use bitcoin::Txid;
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Public testnet3 endpoint
pub const TESTNET_BASE_URL: &str = "https://api.blockcypher.com/v1/btc/test3";

/// Public mainnet endpoint
pub const MAINNET_BASE_URL: &str = "https://api.blockcypher.com/v1/btc/main";

/// Address endpoint response
#[derive(Deserialize, Debug, Clone)]
pub struct AddressEndpoint {
    pub address: String,
    #[serde(default)]
    pub balance: i64,
    #[serde(default)]
    pub unconfirmed_balance: i64,
    #[serde(default)]
    pub final_balance: i64,
    #[serde(default)]
    pub n_tx: u64,
    #[serde(default)]
    pub txrefs: Vec<TxRef>,
}

/// One transaction reference of an address
#[derive(Deserialize, Debug, Clone)]
pub struct TxRef {
    pub tx_hash: String,
    #[serde(default)]
    pub block_height: i64,
    /// Output index, -1 when the reference is an input
    pub tx_output_n: i64,
    pub value: u64,
    #[serde(default)]
    pub spent: bool,
    #[serde(default)]
    pub confirmations: u64,
}

/// Balance endpoint response
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BalanceResponse {
    pub address: String,
    #[serde(default)]
    pub total_received: u64,
    #[serde(default)]
    pub total_sent: u64,
    #[serde(default)]
    pub balance: i64,
    #[serde(default)]
    pub unconfirmed_balance: i64,
    #[serde(default)]
    pub final_balance: i64,
    #[serde(default)]
    pub n_tx: u64,
}

impl AddressEndpoint {
    pub fn parse(body: &str) -> Result<Self, RemoteError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Unspent outputs among the references
    pub fn unspent_outputs(&self) -> Result<Vec<UnspentOutput>, RemoteError> {
        self.txrefs
            .iter()
            .filter(|txref| !txref.spent)
            .map(TxRef::to_unspent_output)
            .collect()
    }
}

impl TxRef {
    pub fn to_unspent_output(&self) -> Result<UnspentOutput, RemoteError> {
        let txid = Txid::from_str(&self.tx_hash)
            .map_err(|e| RemoteError::Malformed(format!("tx_hash {}: {}", self.tx_hash, e)))?;
        let vout = u32::try_from(self.tx_output_n).map_err(|_| {
            RemoteError::Malformed(format!(
                "tx_output_n {} is not an output index",
                self.tx_output_n
            ))
        })?;
        Ok(UnspentOutput::new(txid, vout, self.value))
    }
}

impl BalanceResponse {
    pub fn parse(body: &str) -> Result<Self, RemoteError> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Blocking client for the indexer
#[derive(Debug, Clone)]
pub struct BlockCypherClient {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl BlockCypherClient {
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        Ok(Self {
            base_url: http::normalize_base_url(base_url),
            client: http::build_client()?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn testnet() -> Result<Self, RemoteError> {
        Self::new(TESTNET_BASE_URL)
    }

    pub fn mainnet() -> Result<Self, RemoteError> {
        Self::new(MAINNET_BASE_URL)
    }

    /// Upper bound for each request; the caller's deadline can shorten it
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the unspent-outputs query for `address`
    pub fn unspent_url(&self, address: &str) -> TransferResult<String> {
        Ok(format!(
            "{}/addrs/{}?unspentOnly=true",
            self.base_url,
            path_segment(address)?
        ))
    }

    /// URL of the balance query for `address`
    pub fn balance_url(&self, address: &str) -> TransferResult<String> {
        Ok(format!("{}/addrs/{}/balance", self.base_url, path_segment(address)?))
    }

    /// Confirmed and unconfirmed balance of `address`
    pub fn balance(&self, address: &str, cancel: &Cancellation) -> TransferResult<BalanceResponse> {
        cancel.check()?;
        let url = self.balance_url(address)?;
        debug!("Fetching balance for {}", sanitize_for_logging(address));

        let result = http::send(self.client.get(&url), cancel, self.timeout)
            .and_then(|body| BalanceResponse::parse(&body));
        http::settle(result, cancel, |e| {
            let context = format!("balance lookup for {}", sanitize_for_logging(address));
            e.into_source_unavailable(context)
        })
    }
}

impl UnspentOutputSource for BlockCypherClient {
    fn fetch(&self, address: &str, cancel: &Cancellation) -> TransferResult<Vec<UnspentOutput>> {
        cancel.check()?;
        let url = self.unspent_url(address)?;
        debug!("Fetching unspent outputs for {}", sanitize_for_logging(address));

        let result = http::send(self.client.get(&url), cancel, self.timeout)
            .and_then(|body| AddressEndpoint::parse(&body))
            .and_then(|endpoint| endpoint.unspent_outputs());
        let outputs = http::settle(result, cancel, |e| {
            e.into_source_unavailable(format!(
                "unspent outputs for {}",
                sanitize_for_logging(address)
            ))
        })?;

        debug!("Indexer returned {} unspent outputs", outputs.len());
        Ok(outputs)
    }
}

// Addresses are base58 or bech32; anything else would change the URL path
fn path_segment(address: &str) -> TransferResult<&str> {
    let address = address.trim();
    if address.is_empty() || !address.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(TransferError::InvalidAddress(format!(
            "{:?} is not a valid address",
            sanitize_for_logging(address)
        )));
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let client = BlockCypherClient::new("https://api.blockcypher.com/v1/btc/test3/").unwrap();
        assert_eq!(
            client.unspent_url("miruDdUTqQv9eXMPPwXL73b9iy4gv8KeuH").unwrap(),
            "https://api.blockcypher.com/v1/btc/test3/addrs/miruDdUTqQv9eXMPPwXL73b9iy4gv8KeuH?unspentOnly=true"
        );
        assert_eq!(
            client.balance_url("miruDdUTqQv9eXMPPwXL73b9iy4gv8KeuH").unwrap(),
            "https://api.blockcypher.com/v1/btc/test3/addrs/miruDdUTqQv9eXMPPwXL73b9iy4gv8KeuH/balance"
        );
    }

    #[test]
    fn test_path_injection_rejected() {
        let client = BlockCypherClient::testnet().unwrap();
        assert!(matches!(
            client.unspent_url("../txs/abc"),
            Err(TransferError::InvalidAddress(_))
        ));
        assert!(client.unspent_url("").is_err());
    }

    #[test]
    fn test_input_reference_is_malformed_output() {
        let txref = TxRef {
            tx_hash: "bc26416ce0facd6733b26f5322b21f834ec9206eea9525ffd44e6c1102810fad".to_string(),
            block_height: 2_866_858,
            tx_output_n: -1,
            value: 17_891,
            spent: false,
            confirmations: 19,
        };
        assert!(matches!(txref.to_unspent_output(), Err(RemoteError::Malformed(_))));
    }
}
