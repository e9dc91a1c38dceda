//! Fee rates and transaction size models
//!
//! A [`FeeModel`] turns an input/output count into an estimated virtual size,
//! and a [`FeeRate`] turns that size into satoshis. Both coin selection and
//! assembly go through the same model, so the fee a selection was sized for
//! is exactly the fee the assembled transaction pays.
//!
//! The size models are linear heuristics, not the exact serialized size.
//! [`LegacyFeeModel`] charges every input as a P2PKH spend, which
//! overestimates the fee for segwit inputs and can slightly underestimate it
//! for uncompressed-key P2PKH inputs. [`SegwitFeeModel`] is the P2WPKH
//! counterpart.

use crate::types::SATS_PER_BTC;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Fee rate in satoshis per 1000 virtual bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FeeRate(u64);

impl FeeRate {
    pub const ZERO: FeeRate = FeeRate(0);

    pub fn from_sat_per_kvb(sat_per_kvb: u64) -> Self {
        FeeRate(sat_per_kvb)
    }

    pub fn from_sat_per_vb(sat_per_vb: u64) -> Self {
        FeeRate(sat_per_vb.saturating_mul(1000))
    }

    /// Convert a BTC/kvB rate, the unit a node's `estimatesmartfee` reports
    ///
    /// Rounded half-up to the satoshi. Returns `None` for negative rates or
    /// rates that do not fit in a `u64`.
    pub fn from_btc_per_kvb(btc_per_kvb: Decimal) -> Option<Self> {
        if btc_per_kvb.is_sign_negative() {
            return None;
        }
        let sats = btc_per_kvb
            .checked_mul(Decimal::from(SATS_PER_BTC))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        sats.to_u64().map(FeeRate)
    }

    pub fn as_sat_per_kvb(&self) -> u64 {
        self.0
    }

    /// Fee for a transaction of `vbytes` virtual bytes, rounded up
    pub fn fee_for_vsize(&self, vbytes: u64) -> u64 {
        let scaled = u128::from(self.0) * u128::from(vbytes);
        let fee = (scaled + 999) / 1000;
        u64::try_from(fee).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sat/kvB", self.0)
    }
}

/// Estimates the size of a transaction from its shape
///
/// Implementations must be pure: the same counts always give the same size.
pub trait FeeModel: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Estimated virtual size in bytes
    fn estimated_vsize(&self, inputs: usize, outputs: usize) -> u64;

    /// Estimated total fee in satoshis
    ///
    /// # Arguments
    /// * `rate` - Fee rate to apply
    /// * `inputs` - Number of inputs
    /// * `outputs` - Number of outputs
    ///
    /// # Returns
    /// The fee, never negative; a zero rate always gives zero
    fn estimated_fee(&self, rate: FeeRate, inputs: usize, outputs: usize) -> u64 {
        rate.fee_for_vsize(self.estimated_vsize(inputs, outputs))
    }
}

/// P2PKH sized heuristic: `inputs*180 + outputs*34 + 10 + inputs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyFeeModel;

impl LegacyFeeModel {
    pub const INPUT_SIZE: u64 = 180;
    pub const OUTPUT_SIZE: u64 = 34;
    pub const OVERHEAD: u64 = 10;
}

impl FeeModel for LegacyFeeModel {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn estimated_vsize(&self, inputs: usize, outputs: usize) -> u64 {
        let inputs = inputs as u64;
        let outputs = outputs as u64;
        inputs
            .saturating_mul(Self::INPUT_SIZE)
            .saturating_add(outputs.saturating_mul(Self::OUTPUT_SIZE))
            .saturating_add(Self::OVERHEAD)
            .saturating_add(inputs)
    }
}

/// P2WPKH sized heuristic: `inputs*68 + outputs*31 + 10` vbytes
#[derive(Debug, Clone, Copy, Default)]
pub struct SegwitFeeModel;

impl SegwitFeeModel {
    pub const INPUT_VSIZE: u64 = 68;
    pub const OUTPUT_VSIZE: u64 = 31;
    pub const OVERHEAD: u64 = 10;
}

impl FeeModel for SegwitFeeModel {
    fn name(&self) -> &'static str {
        "segwit"
    }

    fn estimated_vsize(&self, inputs: usize, outputs: usize) -> u64 {
        (inputs as u64)
            .saturating_mul(Self::INPUT_VSIZE)
            .saturating_add((outputs as u64).saturating_mul(Self::OUTPUT_VSIZE))
            .saturating_add(Self::OVERHEAD)
    }
}

/// Size model selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeeModelKind {
    #[default]
    Legacy,
    Segwit,
}

impl FeeModelKind {
    pub fn build(&self) -> Arc<dyn FeeModel> {
        match self {
            FeeModelKind::Legacy => Arc::new(LegacyFeeModel),
            FeeModelKind::Segwit => Arc::new(SegwitFeeModel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_legacy_vsize() {
        assert_eq!(LegacyFeeModel.estimated_vsize(1, 2), 259);
        // inputs*180 + outputs*34 + 10 + inputs
        assert_eq!(LegacyFeeModel.estimated_vsize(3, 2), 3 * 180 + 2 * 34 + 10 + 3);
        assert_eq!(LegacyFeeModel.estimated_vsize(3, 2), 621);
        assert_eq!(LegacyFeeModel.estimated_vsize(0, 0), 10);
    }

    #[test]
    fn test_segwit_vsize() {
        assert_eq!(SegwitFeeModel.estimated_vsize(1, 2), 140);
        assert!(SegwitFeeModel.estimated_vsize(4, 2) < LegacyFeeModel.estimated_vsize(4, 2));
    }

    #[test]
    fn test_fee_rounds_up() {
        let rate = FeeRate::from_sat_per_kvb(7_722);
        // 7722 * 259 / 1000 = 1999.998
        assert_eq!(LegacyFeeModel.estimated_fee(rate, 1, 2), 2_000);
        assert_eq!(FeeRate::from_sat_per_kvb(1_000).fee_for_vsize(259), 259);
    }

    #[test]
    fn test_zero_rate_is_free() {
        assert_eq!(LegacyFeeModel.estimated_fee(FeeRate::ZERO, 25, 2), 0);
        assert_eq!(SegwitFeeModel.estimated_fee(FeeRate::ZERO, 25, 2), 0);
    }

    #[test]
    fn test_from_btc_per_kvb() {
        assert_eq!(
            FeeRate::from_btc_per_kvb(dec!(0.00001)),
            Some(FeeRate::from_sat_per_kvb(1_000))
        );
        assert_eq!(
            FeeRate::from_btc_per_kvb(dec!(0.000012345)),
            Some(FeeRate::from_sat_per_kvb(1_235))
        );
        assert_eq!(FeeRate::from_btc_per_kvb(dec!(-0.0001)), None);
    }

    #[test]
    fn test_sat_per_vb() {
        assert_eq!(FeeRate::from_sat_per_vb(5).as_sat_per_kvb(), 5_000);
        assert_eq!(FeeRate::from_sat_per_vb(5).to_string(), "5000 sat/kvB");
    }

    #[test]
    fn test_kind_builds_model() {
        assert_eq!(FeeModelKind::Legacy.build().name(), "legacy");
        assert_eq!(FeeModelKind::Segwit.build().name(), "segwit");
    }
}
