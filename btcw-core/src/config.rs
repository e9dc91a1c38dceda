//! Configuration management for transfers
//!
//! Settings live in a TOML file. Every section and field has a default, so a
//! partial file (or an empty one) is valid.
//!
//! ```toml
//! [network]
//! network = "testnet"
//! indexer_url = "https://api.blockcypher.com/v1/btc/test3"
//! node_rpc_url = "http://127.0.0.1:18332"
//!
//! [selection]
//! search = "branch_and_bound"
//!
//! [change]
//! fold_dust = true
//! ```
//!
//! ## Security Considerations
//!
//! - No private key material belongs in this file
//! - Values must pass [`Config::validate`] before they drive a transfer

use crate::assembler::ChangePolicy;
use crate::fee::FeeModelKind;
use crate::logging::LogConfig;
use crate::types::DUST_THRESHOLD;
use crate::utxo_selection::types::{
    SearchKind, SelectionOptions, DEFAULT_NODE_BUDGET, DEFAULT_RANDOM_TRIALS,
};
use anyhow::{anyhow, bail, Context, Result};
use bitcoin::Network;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub fees: FeesConfig,

    #[serde(default)]
    pub change: ChangeConfig,

    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Chain and remote service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// bitcoin (or mainnet), testnet, signet, regtest
    #[serde(default = "default_network")]
    pub network: String,

    /// Base URL of the address indexer
    #[serde(default = "default_indexer_url")]
    pub indexer_url: String,

    /// Node JSON-RPC endpoint
    #[serde(default = "default_node_rpc_url")]
    pub node_rpc_url: String,

    /// Upper bound for a single request
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,

    /// Confirmation target passed to `estimatesmartfee`
    #[serde(default = "default_conf_target")]
    pub conf_target: u32,

    /// `maxfeerate` passed to `sendrawtransaction`, in BTC/kvB
    #[serde(default = "default_max_fee_rate")]
    pub max_fee_rate: Decimal,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            indexer_url: default_indexer_url(),
            node_rpc_url: default_node_rpc_url(),
            timeout_seconds: default_timeout(),
            conf_target: default_conf_target(),
            max_fee_rate: default_max_fee_rate(),
        }
    }
}

/// Coin selection search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub search: SearchKind,

    #[serde(default = "default_node_budget")]
    pub node_budget: usize,

    #[serde(default = "default_random_trials")]
    pub random_trials: usize,

    /// Fixed seed for the randomized search
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            search: SearchKind::default(),
            node_budget: default_node_budget(),
            random_trials: default_random_trials(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FeesConfig {
    /// Transaction size model: legacy or segwit
    #[serde(default)]
    pub model: FeeModelKind,
}

/// Change output handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeConfig {
    /// Give change below `dust_limit` to the fee
    #[serde(default)]
    pub fold_dust: bool,

    #[serde(default = "default_dust_limit")]
    pub dust_limit: u64,
}

impl Default for ChangeConfig {
    fn default() -> Self {
        Self {
            fold_dust: false,
            dust_limit: default_dust_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Re-verify every input signature before handing off for broadcast
    #[serde(default = "default_true")]
    pub verify_before_broadcast: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            verify_before_broadcast: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.bitcoin_network()?;

        if self.network.timeout_seconds == 0 {
            bail!("Invalid network timeout: must be greater than 0");
        }

        if self.network.conf_target == 0 {
            bail!("Invalid confirmation target: must be greater than 0");
        }

        if self.network.max_fee_rate.is_sign_negative() {
            bail!("Invalid max fee rate: must not be negative");
        }

        for (name, url) in [
            ("indexer_url", &self.network.indexer_url),
            ("node_rpc_url", &self.network.node_rpc_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("Invalid {}: {} is not an http(s) URL", name, url);
            }
        }

        if self.selection.search == SearchKind::Randomized && self.selection.random_trials == 0 {
            bail!("Invalid random_trials: randomized search needs at least one trial");
        }

        if self.selection.search == SearchKind::BranchAndBound && self.selection.node_budget == 0 {
            bail!("Invalid node_budget: must be greater than 0");
        }

        Ok(())
    }

    /// The configured chain
    pub fn bitcoin_network(&self) -> Result<Network> {
        match self.network.network.to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" => Ok(Network::Bitcoin),
            "testnet" => Ok(Network::Testnet),
            "signet" => Ok(Network::Signet),
            "regtest" => Ok(Network::Regtest),
            other => bail!("Invalid network type: {}", other),
        }
    }

    pub fn selection_options(&self) -> SelectionOptions {
        SelectionOptions {
            search: self.selection.search,
            node_budget: self.selection.node_budget,
            random_trials: self.selection.random_trials,
            seed: self.selection.seed,
        }
    }

    pub fn change_policy(&self) -> ChangePolicy {
        if self.change.fold_dust {
            ChangePolicy::FoldDust(self.change.dust_limit)
        } else {
            ChangePolicy::OmitZero
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.network.timeout_seconds))
    }
}

/// Ensure a configuration file exists at the specified path
/// If it doesn't exist, create it with default values
pub fn ensure_config_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }
        Config::default().save(path)?;
    }

    Ok(())
}

// Default value functions

fn default_network() -> String {
    "testnet".to_string()
}

fn default_indexer_url() -> String {
    "https://api.blockcypher.com/v1/btc/test3".to_string()
}

fn default_node_rpc_url() -> String {
    "http://127.0.0.1:18332".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_conf_target() -> u32 {
    1000
}

fn default_max_fee_rate() -> Decimal {
    dec!(0.10)
}

fn default_node_budget() -> usize {
    DEFAULT_NODE_BUDGET
}

fn default_random_trials() -> usize {
    DEFAULT_RANDOM_TRIALS
}

fn default_dust_limit() -> u64 {
    DUST_THRESHOLD
}

fn default_true() -> bool {
    true
}
