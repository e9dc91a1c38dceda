//! Fallback search strategies
//!
//! When every output smaller than the target overshoots the requirement, the
//! selector hands that subset to a [`Search`] to pick which of them to spend.
//! Each strategy must return a subset whose sum covers
//! [`SpendTarget::required`] for its own input count.

use crate::error::TransferResult;
use crate::fee::{FeeModel, FeeRate};
use crate::types::{UnspentOutput, STANDARD_OUTPUT_COUNT};

pub mod branch_and_bound;
pub mod randomized;

pub use branch_and_bound::BranchAndBound;
pub use randomized::Randomized;

/// What a selection has to pay for
#[derive(Clone, Copy)]
pub struct SpendTarget<'a> {
    /// Payment amount in satoshis
    pub amount: u64,
    pub fee_rate: FeeRate,
    pub fee_model: &'a dyn FeeModel,
}

impl<'a> SpendTarget<'a> {
    pub fn new(amount: u64, fee_rate: FeeRate, fee_model: &'a dyn FeeModel) -> Self {
        Self {
            amount,
            fee_rate,
            fee_model,
        }
    }

    /// Fee for `inputs` inputs paying to the payment and change outputs
    pub fn fee(&self, inputs: usize) -> u64 {
        self.fee_model
            .estimated_fee(self.fee_rate, inputs, STANDARD_OUTPUT_COUNT)
    }

    /// Amount plus fee that `inputs` inputs have to cover
    pub fn required(&self, inputs: usize) -> u64 {
        self.amount.saturating_add(self.fee(inputs))
    }
}

/// Trait defining a fallback search over candidate outputs
pub trait Search {
    /// Name of this strategy
    fn name(&self) -> &'static str;

    /// Pick a covering subset of `candidates`
    ///
    /// # Arguments
    /// * `candidates` - Outputs to choose from, in ascending amount order
    /// * `target` - Amount and fee parameters to cover
    ///
    /// # Returns
    /// * The chosen outputs, or an error when no subset was found
    fn search(
        &self,
        candidates: &[UnspentOutput],
        target: &SpendTarget<'_>,
    ) -> TransferResult<Vec<UnspentOutput>>;
}
