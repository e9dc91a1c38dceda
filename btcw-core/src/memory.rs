//! In-memory collaborators
//!
//! Fixed unspent outputs, a fixed fee rate and a broadcaster that records
//! what it was given. Used by tests and by hosts that already hold the data.

use crate::cancel::Cancellation;
use crate::error::{TransferError, TransferResult};
use crate::fee::FeeRate;
use crate::source::{Broadcaster, FeeRateSource, UnspentOutputSource};
use crate::types::UnspentOutput;
use bitcoin::consensus::encode::deserialize;
use bitcoin::{Transaction, Txid};
use std::collections::HashMap;
use std::sync::Mutex;

/// Returns the same outputs for an address on every call
#[derive(Debug, Default)]
pub struct StaticUnspentOutputs {
    by_address: HashMap<String, Vec<UnspentOutput>>,
    unavailable: bool,
}

impl StaticUnspentOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outputs(mut self, address: &str, outputs: Vec<UnspentOutput>) -> Self {
        self.by_address.insert(address.to_string(), outputs);
        self
    }

    /// Make every fetch fail with `SourceUnavailable`
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

impl UnspentOutputSource for StaticUnspentOutputs {
    fn fetch(&self, address: &str, cancel: &Cancellation) -> TransferResult<Vec<UnspentOutput>> {
        cancel.check()?;
        if self.unavailable {
            return Err(TransferError::source_unavailable("static source marked unavailable"));
        }
        Ok(self.by_address.get(address).cloned().unwrap_or_default())
    }
}

/// Always reports the same fee rate
#[derive(Debug, Clone, Copy)]
pub struct FixedFeeRate(pub FeeRate);

impl FeeRateSource for FixedFeeRate {
    fn current_fee_rate(&self, cancel: &Cancellation) -> TransferResult<FeeRate> {
        cancel.check()?;
        Ok(self.0)
    }
}

/// Records submitted transactions and answers with their txid
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    submitted: Mutex<Vec<Vec<u8>>>,
    reject_with: Option<String>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every submission with `reason`
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            reject_with: Some(reason.into()),
        }
    }

    /// Raw bytes of every accepted submission, oldest first
    pub fn submitted(&self) -> Vec<Vec<u8>> {
        match self.submitted.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn submit(&self, tx_bytes: &[u8], cancel: &Cancellation) -> TransferResult<Txid> {
        cancel.check()?;
        if let Some(reason) = &self.reject_with {
            return Err(TransferError::BroadcastRejected(reason.clone()));
        }

        let tx: Transaction = deserialize(tx_bytes).map_err(|e| {
            TransferError::BroadcastRejected(format!("undecodable transaction: {}", e))
        })?;

        match self.submitted.lock() {
            Ok(mut guard) => guard.push(tx_bytes.to_vec()),
            Err(poisoned) => poisoned.into_inner().push(tx_bytes.to_vec()),
        }
        Ok(tx.txid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;

    #[test]
    fn test_static_outputs_by_address() {
        let utxo = UnspentOutput::new(Txid::all_zeros(), 0, 1_000);
        let source = StaticUnspentOutputs::new().with_outputs("addr", vec![utxo]);
        let cancel = Cancellation::none();

        assert_eq!(source.fetch("addr", &cancel).unwrap(), vec![utxo]);
        assert!(source.fetch("other", &cancel).unwrap().is_empty());
    }

    #[test]
    fn test_cancelled_fetch() {
        let source = StaticUnspentOutputs::new();
        let cancel = Cancellation::none();
        cancel.cancel();
        assert!(matches!(source.fetch("addr", &cancel), Err(TransferError::Cancelled)));
    }

    #[test]
    fn test_rejecting_broadcaster() {
        let broadcaster = RecordingBroadcaster::rejecting("min relay fee not met");
        let err = broadcaster.submit(&[], &Cancellation::none()).unwrap_err();
        assert!(matches!(
            err,
            TransferError::BroadcastRejected(reason) if reason == "min relay fee not met"
        ));
        assert!(broadcaster.submitted().is_empty());
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let broadcaster = RecordingBroadcaster::new();
        assert!(broadcaster.submit(&[0xde, 0xad], &Cancellation::none()).is_err());
    }
}
