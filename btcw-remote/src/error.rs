//! Error types for the remote collaborators

use btcw_core::TransferError;

/// Errors that can occur when talking to the indexer or the node
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Transport failure, including timeouts
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Body was not the JSON we expected
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Non-2xx response
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The node answered with a JSON-RPC error object
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Well-formed JSON with unusable content
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// Wrap as a failed read from a remote source
    pub fn into_source_unavailable(self, context: impl Into<String>) -> TransferError {
        TransferError::source_unavailable_with(context, self)
    }

    /// Wrap as a refused broadcast, keeping the node's reason when there is one
    pub fn into_broadcast_rejected(self) -> TransferError {
        match self {
            RemoteError::Rpc(reason) => TransferError::BroadcastRejected(reason),
            other => TransferError::BroadcastRejected(other.to_string()),
        }
    }
}

impl From<RemoteError> for TransferError {
    fn from(err: RemoteError) -> Self {
        err.into_source_unavailable("remote request failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_rpc_reason_survives_broadcast_mapping() {
        let err = RemoteError::Rpc("min relay fee not met".to_string()).into_broadcast_rejected();
        assert!(matches!(
            err,
            TransferError::BroadcastRejected(reason) if reason == "min relay fee not met"
        ));
    }

    #[test]
    fn test_status_maps_to_source_unavailable() {
        let err: TransferError = RemoteError::Status {
            status: 503,
            body: "busy".to_string(),
        }
        .into();
        assert!(matches!(err, TransferError::SourceUnavailable { .. }));
        assert!(err.source().is_some());
    }
}
