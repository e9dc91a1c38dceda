//! Common data types for transaction building
//!
//! These are the values that flow through the pipeline: the unspent outputs
//! handed in by an [`UnspentOutputSource`](crate::source::UnspentOutputSource)
//! and the secret wrapper used to carry key material into the signer.
//!
//! # Security Boundaries
//!
//! [`UnspentOutput`] holds public chain data only. Private keys travel as
//! [`SensitiveString`] (WIF or hex text) and are zeroed when dropped.

use bitcoin::{Amount, OutPoint, Txid};
use std::fmt;
use zeroize::Zeroize;

/// Constant for dust threshold (minimum output value)
pub const DUST_THRESHOLD: u64 = 546;

/// Constant for satoshis per Bitcoin
pub const SATS_PER_BTC: u64 = 100_000_000;

/// Number of outputs every fee estimate assumes: payment plus change
pub const STANDARD_OUTPUT_COUNT: usize = 2;

/// A previously created output that can be spent as a transaction input
///
/// Immutable once retrieved. Selection never mutates an `UnspentOutput`;
/// it only decides which ones to reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnspentOutput {
    /// Transaction id and output index being referenced
    pub outpoint: OutPoint,
    /// Value locked in the output
    pub amount: Amount,
    /// Whether the source considers this output usable right now
    pub spendable: bool,
}

impl UnspentOutput {
    /// Create a spendable unspent output
    ///
    /// # Arguments
    /// * `txid` - Id of the transaction that created the output
    /// * `vout` - Index of the output within that transaction
    /// * `amount_sats` - Value in satoshis
    pub fn new(txid: Txid, vout: u32, amount_sats: u64) -> Self {
        Self {
            outpoint: OutPoint::new(txid, vout),
            amount: Amount::from_sat(amount_sats),
            spendable: true,
        }
    }

    /// Same output with the spendable flag replaced
    pub fn with_spendable(mut self, spendable: bool) -> Self {
        self.spendable = spendable;
        self
    }

    /// Value in satoshis
    pub fn sats(&self) -> u64 {
        self.amount.to_sat()
    }
}

/// Sum the values of a slice of outputs in satoshis
///
/// Saturates instead of overflowing.
pub fn total_sats(outputs: &[UnspentOutput]) -> u64 {
    outputs
        .iter()
        .fold(0u64, |acc, utxo| acc.saturating_add(utxo.sats()))
}

/// A string that contains sensitive data that should be zeroed when dropped
///
/// # Security
///
/// Used for WIF and hex encoded private keys. The content is zeroed on drop
/// and never shows up in `Debug` or `Display` output.
///
/// # Examples
///
/// ```
/// use btcw_core::types::SensitiveString;
///
/// let wif = SensitiveString::new("cVt4o7BGAig1UXywgGSmARhxMdzP5qvQsxKkSsc1XEkw3tDTQFpy");
/// assert_eq!(format!("{}", wif), "[REDACTED]");
/// ```
#[derive(Zeroize)]
pub struct SensitiveString {
    inner: String,
}

impl SensitiveString {
    pub fn new(s: impl Into<String>) -> Self {
        Self { inner: s.into() }
    }

    /// Expose the secret value
    ///
    /// # Security
    ///
    /// The returned reference must not be persisted or logged.
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Clone for SensitiveString {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl fmt::Debug for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveString([REDACTED], length={})", self.len())
    }
}

impl fmt::Display for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<String> for SensitiveString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SensitiveString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Drop for SensitiveString {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;

    #[test]
    fn test_total_sats() {
        let txid = Txid::all_zeros();
        let outputs = vec![
            UnspentOutput::new(txid, 0, 5_000),
            UnspentOutput::new(txid, 1, 15_000),
        ];
        assert_eq!(total_sats(&outputs), 20_000);
        assert_eq!(total_sats(&[]), 0);
    }

    #[test]
    fn test_sensitive_string_is_redacted() {
        let secret = SensitiveString::new("L1aW4aubDFB7yfras2S1mN3bqg9nwySY8nkoLmJebSLD5BWv3ENZ");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert!(!format!("{:?}", secret).contains("L1aW"));
        assert_eq!(secret.len(), 52);
    }
}
