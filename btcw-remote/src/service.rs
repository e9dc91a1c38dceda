//! Wiring a transfer service from configuration

use crate::blockcypher::BlockCypherClient;
use crate::rpc::NodeRpcClient;
use anyhow::{Context, Result};
use btcw_core::address::BitcoinAddressCodec;
use btcw_core::config::Config;
use btcw_core::transfer::TransferService;
use log::info;
use std::path::Path;
use std::sync::Arc;

/// Indexer client for the configured endpoint and timeout
pub fn indexer_from_config(config: &Config) -> Result<BlockCypherClient> {
    Ok(BlockCypherClient::new(&config.network.indexer_url)
        .context("Failed to create indexer client")?
        .with_timeout(config.request_timeout()))
}

/// Node RPC client for the configured endpoint, timeout and fee settings
pub fn node_from_config(config: &Config) -> Result<NodeRpcClient> {
    Ok(NodeRpcClient::new(&config.network.node_rpc_url)
        .context("Failed to create node RPC client")?
        .with_timeout(config.request_timeout())
        .with_conf_target(config.network.conf_target)
        .with_max_fee_rate(config.network.max_fee_rate))
}

/// A transfer service backed by the indexer and the node
///
/// The node serves both fee estimation and broadcast.
pub fn service_from_config(config: &Config) -> Result<TransferService> {
    config.validate()?;
    let network = config.bitcoin_network()?;
    let indexer = Arc::new(indexer_from_config(config)?);
    let node = Arc::new(node_from_config(config)?);

    info!(
        "Transfer service on {} using indexer {} and node {}",
        network,
        indexer.base_url(),
        node.url()
    );

    Ok(TransferService::from_config(
        config,
        indexer,
        node.clone(),
        node,
        Arc::new(BitcoinAddressCodec::new(network)),
    )?)
}

/// Load a configuration file, creating a default one if missing, and build
/// the service from it
pub fn load_service(path: &Path) -> Result<TransferService> {
    btcw_core::config::ensure_config_exists(path)?;
    let config = Config::load(path)?;
    service_from_config(&config)
}
