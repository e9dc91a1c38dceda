//! Main coin selector implementation
//!
//! [`CoinSelector`] runs three phases in order and the first that succeeds
//! wins:
//!
//! 1. **Exact match**: a single output equal to amount plus the one-input fee.
//! 2. **Smaller aggregate**: every output below the amount, taken together.
//!    If they sum exactly to the requirement they are spent as a whole. If
//!    they fall short, the smallest single output above the one-input
//!    requirement is spent alone. If they overshoot, phase 3 runs on them.
//! 3. **Search**: a [`Search`] strategy picks a covering subset of the
//!    smaller outputs. The strategy is chosen per call from
//!    [`SelectionOptions`].
//!
//! All fees assume two outputs (payment and change), matching what the
//! assembler produces.
//!
//! # Usage
//!
//! ```
//! use btcw_core::fee::{FeeRate, LegacyFeeModel};
//! use btcw_core::types::UnspentOutput;
//! use btcw_core::utxo_selection::selector::CoinSelector;
//! use bitcoin::hashes::Hash;
//! use bitcoin::{Amount, Txid};
//! use std::sync::Arc;
//!
//! let utxos = vec![
//!     UnspentOutput::new(Txid::all_zeros(), 0, 5_000),
//!     UnspentOutput::new(Txid::all_zeros(), 1, 15_000),
//!     UnspentOutput::new(Txid::all_zeros(), 2, 33_000),
//! ];
//!
//! let selector = CoinSelector::new(Arc::new(LegacyFeeModel));
//! let result = selector
//!     .select(&utxos, Amount::from_sat(17_891), FeeRate::from_sat_per_kvb(7_722))
//!     .unwrap();
//! assert!(result.total_selected.to_sat() >= 17_891 + result.fee);
//! ```

use crate::error::{TransferError, TransferResult};
use crate::fee::{FeeModel, FeeRate, LegacyFeeModel};
use crate::logging::{log_params, log_selection, LogLevel};
use crate::types::{total_sats, UnspentOutput};
use crate::utxo_selection::strategies::{BranchAndBound, Randomized, Search, SpendTarget};
use crate::utxo_selection::types::{SearchKind, SelectionOptions, SelectionPhase, SelectionResult};
use bitcoin::Amount;
use log::{debug, warn};
use std::sync::Arc;

/// Chooses which unspent outputs pay for a transfer
pub struct CoinSelector {
    fee_model: Arc<dyn FeeModel>,
    options: SelectionOptions,
}

impl CoinSelector {
    pub fn new(fee_model: Arc<dyn FeeModel>) -> Self {
        Self {
            fee_model,
            options: SelectionOptions::default(),
        }
    }

    pub fn with_options(fee_model: Arc<dyn FeeModel>, options: SelectionOptions) -> Self {
        Self { fee_model, options }
    }

    pub fn fee_model(&self) -> &dyn FeeModel {
        self.fee_model.as_ref()
    }

    pub fn options(&self) -> &SelectionOptions {
        &self.options
    }

    fn search_strategy(&self) -> Box<dyn Search> {
        match self.options.search {
            SearchKind::BranchAndBound => Box::new(BranchAndBound::with_node_budget(
                self.options.node_budget,
            )),
            SearchKind::Randomized => Box::new(Randomized::with_params(
                self.options.random_trials,
                self.options.seed,
            )),
        }
    }

    /// Select outputs covering `target` plus fee
    ///
    /// # Arguments
    /// * `utxos` - All outputs of the source address; unspendable ones are ignored
    /// * `target` - Payment amount, must be greater than zero
    /// * `fee_rate` - Fee rate for this build
    ///
    /// # Returns
    /// * The chosen outputs in ascending amount order, or `InsufficientFunds`,
    ///   `NoViableCombination` or `InvalidAmount`
    pub fn select(
        &self,
        utxos: &[UnspentOutput],
        target: Amount,
        fee_rate: FeeRate,
    ) -> TransferResult<SelectionResult> {
        let result = self.run_phases(utxos, target, fee_rate)?;
        log_selection(
            LogLevel::Info,
            "outputs selected",
            Some(log_params(vec![
                ("phase", result.phase.to_string()),
                ("inputs", result.input_count().to_string()),
                ("total_sats", result.total_selected.to_sat().to_string()),
                ("fee_sats", result.fee.to_string()),
            ])),
        );
        Ok(result)
    }

    fn run_phases(
        &self,
        utxos: &[UnspentOutput],
        target: Amount,
        fee_rate: FeeRate,
    ) -> TransferResult<SelectionResult> {
        if target == Amount::ZERO {
            return Err(TransferError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }

        let spend = SpendTarget::new(target.to_sat(), fee_rate, self.fee_model.as_ref());

        let mut sorted: Vec<UnspentOutput> =
            utxos.iter().filter(|u| u.spendable).copied().collect();
        sorted.sort_by_key(|u| u.amount);

        debug!(
            "Selecting for {} sats at {} ({} model) from {} spendable of {} outputs",
            spend.amount,
            fee_rate,
            self.fee_model.name(),
            sorted.len(),
            utxos.len()
        );

        let single_required = spend.required(1);

        // Phase 1: exact single match
        if let Some(exact) = sorted.iter().find(|u| u.sats() == single_required) {
            debug!("Phase 1: output of {} sats matches exactly", exact.sats());
            return Ok(SelectionResult::new(
                vec![*exact],
                spend.fee(1),
                SelectionPhase::ExactMatch,
            ));
        }

        // Phase 2: everything smaller than the amount
        let smaller: Vec<UnspentOutput> = sorted
            .iter()
            .filter(|u| u.sats() < spend.amount)
            .copied()
            .collect();
        let smaller_sum = total_sats(&smaller);
        let aggregate_required = spend.required(smaller.len());

        if !smaller.is_empty() && smaller_sum == aggregate_required {
            debug!(
                "Phase 2: {} smaller outputs sum exactly to {} sats",
                smaller.len(),
                aggregate_required
            );
            let fee = spend.fee(smaller.len());
            return Ok(SelectionResult::new(smaller, fee, SelectionPhase::SmallerAggregate));
        }

        if smaller_sum < aggregate_required {
            debug!(
                "Phase 2: smaller outputs sum to {} of {} sats, trying one larger output",
                smaller_sum, aggregate_required
            );
            return match sorted.iter().find(|u| u.sats() > single_required) {
                Some(larger) => {
                    debug!("Phase 2: spending single output of {} sats", larger.sats());
                    Ok(SelectionResult::new(
                        vec![*larger],
                        spend.fee(1),
                        SelectionPhase::SingleLarger,
                    ))
                }
                None => {
                    let available = total_sats(&sorted);
                    warn!(
                        "Insufficient funds: need {} sats in one output, {} available in total",
                        single_required, available
                    );
                    Err(TransferError::InsufficientFunds {
                        needed: single_required,
                        available,
                    })
                }
            };
        }

        // Phase 3: the smaller outputs overshoot, search among them
        let search = self.search_strategy();
        debug!(
            "Phase 3: {} smaller outputs overshoot by {} sats, running {} search",
            smaller.len(),
            smaller_sum - aggregate_required,
            search.name()
        );
        let chosen = search.search(&smaller, &spend)?;
        let fee = spend.fee(chosen.len());
        Ok(SelectionResult::new(chosen, fee, SelectionPhase::Search))
    }
}

impl Default for CoinSelector {
    fn default() -> Self {
        Self::new(Arc::new(LegacyFeeModel))
    }
}
