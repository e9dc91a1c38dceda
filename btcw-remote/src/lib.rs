//! Remote collaborators for btcw-core
//!
//! Blocking HTTP implementations of the source and broadcaster traits:
//!
//! - `blockcypher`: Address indexer client, unspent outputs and balances
//! - `rpc`: Node JSON-RPC client, fee estimation and broadcast
//! - `service`: Builds a `TransferService` from a configuration file
//!
//! Every request is bounded by the configured timeout and by the caller's
//! cancellation deadline, whichever is sooner.

pub mod blockcypher;
pub mod error;
mod http;
pub mod rpc;
pub mod service;

pub use blockcypher::{AddressEndpoint, BalanceResponse, BlockCypherClient, TxRef};
pub use error::RemoteError;
pub use http::DEFAULT_TIMEOUT;
pub use rpc::{parse_broadcast_response, parse_fee_estimate, NodeRpcClient};
pub use service::{load_service, service_from_config};
