//! External collaborators of the transfer pipeline
//!
//! The pipeline reads unspent outputs and a fee rate from the outside world
//! and hands the signed transaction to a broadcaster. Each gets the caller's
//! [`Cancellation`] so blocking I/O can respect the deadline.
//!
//! Implementations must map their own failures onto
//! [`TransferError::SourceUnavailable`](crate::error::TransferError::SourceUnavailable)
//! or [`TransferError::BroadcastRejected`](crate::error::TransferError::BroadcastRejected)
//! rather than panicking.

use crate::cancel::Cancellation;
use crate::error::TransferResult;
use crate::fee::FeeRate;
use crate::types::UnspentOutput;
use bitcoin::Txid;

/// Provides the currently unspent outputs of an address
pub trait UnspentOutputSource: Send + Sync {
    /// Fetch the unspent outputs of `address`
    ///
    /// Must only return outputs that are unspent at the time of the call.
    fn fetch(&self, address: &str, cancel: &Cancellation) -> TransferResult<Vec<UnspentOutput>>;
}

/// Provides the fee rate for a new transaction
pub trait FeeRateSource: Send + Sync {
    fn current_fee_rate(&self, cancel: &Cancellation) -> TransferResult<FeeRate>;
}

/// Submits a signed transaction to the network
pub trait Broadcaster: Send + Sync {
    /// Submit consensus-encoded transaction bytes
    ///
    /// # Returns
    /// * The transaction id reported by the network
    fn submit(&self, tx_bytes: &[u8], cancel: &Cancellation) -> TransferResult<Txid>;
}
