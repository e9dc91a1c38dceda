//! Error handling for transaction building
//!
//! Every failure in the fetch -> select -> assemble -> sign -> broadcast
//! pipeline is returned as a [`TransferError`]. Nothing on a non-test path
//! aborts the process; the caller decides whether to retry, report or give up.
//!
//! # Security Considerations
//!
//! - Error messages never contain private key material
//! - Collaborator errors keep their original error as `source` for diagnostics

use std::error::Error as StdError;
use thiserror::Error;

/// Result alias used throughout the crate
pub type TransferResult<T> = Result<T, TransferError>;

/// Boxed source error carried by collaborator failures
pub type BoxedSource = Box<dyn StdError + Send + Sync>;

/// The error type for building, signing and submitting a transfer
#[derive(Debug, Error)]
pub enum TransferError {
    /// No subset of the unspent outputs can cover amount plus fee
    #[error("Insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// The bounded search ran out of budget without a candidate
    #[error("No viable UTXO combination found after {attempts} attempts")]
    NoViableCombination { attempts: usize },

    /// Malformed or wrong-network address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Key/script mismatch or a cryptographic failure
    #[error("Signing error: {0}")]
    SigningError(String),

    /// A remote source (indexer, fee estimator) failed or returned garbage
    #[error("Source unavailable: {context}")]
    SourceUnavailable {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The broadcaster refused the transaction
    #[error("Broadcast rejected: {0}")]
    BroadcastRejected(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Configuration errors
    #[error("Configuration error: {context}")]
    Config {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl TransferError {
    /// Build a `SourceUnavailable` error without an underlying cause
    pub fn source_unavailable(context: impl Into<String>) -> Self {
        TransferError::SourceUnavailable {
            context: context.into(),
            source: None,
        }
    }

    /// Build a `SourceUnavailable` error wrapping the underlying cause
    pub fn source_unavailable_with<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        TransferError::SourceUnavailable {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a `Config` error wrapping the load or validation failure
    pub fn config(context: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        TransferError::Config {
            context: context.into(),
            source: Some(source.into()),
        }
    }

    /// Whether the failure came from an external collaborator rather than
    /// from the wallet's own funds or inputs
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            TransferError::SourceUnavailable { .. } | TransferError::BroadcastRejected(_)
        )
    }
}

impl From<bitcoin::secp256k1::Error> for TransferError {
    fn from(err: bitcoin::secp256k1::Error) -> Self {
        TransferError::SigningError(format!("secp256k1: {}", err))
    }
}

impl From<bitcoin::sighash::Error> for TransferError {
    fn from(err: bitcoin::sighash::Error) -> Self {
        TransferError::SigningError(format!("sighash: {}", err))
    }
}

impl From<bitcoin::address::Error> for TransferError {
    fn from(err: bitcoin::address::Error) -> Self {
        TransferError::InvalidAddress(err.to_string())
    }
}
