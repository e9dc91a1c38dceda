//! Types for UTXO selection
//!
//! The result of a selection, the phase that produced it, and the options
//! that pick and bound the fallback search.

use crate::types::{total_sats, UnspentOutput};
use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of search nodes branch and bound may visit
pub const DEFAULT_NODE_BUDGET: usize = 100_000;

/// Default number of shuffles the randomized search tries
pub const DEFAULT_RANDOM_TRIALS: usize = 1_000;

/// Which phase of the selector produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    /// A single output equal to amount plus the one-input fee
    ExactMatch,
    /// Every output smaller than the amount, summing exactly to the requirement
    SmallerAggregate,
    /// The smallest single output above the one-input requirement
    SingleLarger,
    /// Picked by the fallback search over the smaller outputs
    Search,
}

impl fmt::Display for SelectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionPhase::ExactMatch => "exact-match",
            SelectionPhase::SmallerAggregate => "smaller-aggregate",
            SelectionPhase::SingleLarger => "single-larger",
            SelectionPhase::Search => "search",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful selection
///
/// `total_selected` always equals the sum of `chosen`, and covers the target
/// amount plus `fee`, the fee estimated for `chosen.len()` inputs and two
/// outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub chosen: Vec<UnspentOutput>,
    pub total_selected: Amount,
    pub fee: u64,
    pub phase: SelectionPhase,
}

impl SelectionResult {
    pub fn new(chosen: Vec<UnspentOutput>, fee: u64, phase: SelectionPhase) -> Self {
        let total_selected = Amount::from_sat(total_sats(&chosen));
        Self {
            chosen,
            total_selected,
            fee,
            phase,
        }
    }

    pub fn input_count(&self) -> usize {
        self.chosen.len()
    }
}

/// Fallback search used when the smaller outputs overshoot the requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    /// Deterministic minimal-input search
    #[default]
    BranchAndBound,
    /// Bounded random shuffles, fewest inputs wins
    Randomized,
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchKind::BranchAndBound => f.write_str("branch_and_bound"),
            SearchKind::Randomized => f.write_str("randomized"),
        }
    }
}

/// Tuning for the selector's fallback search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionOptions {
    pub search: SearchKind,
    pub node_budget: usize,
    pub random_trials: usize,
    /// Fixed seed for the randomized search; a fresh seed per call otherwise
    pub seed: Option<u64>,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            search: SearchKind::BranchAndBound,
            node_budget: DEFAULT_NODE_BUDGET,
            random_trials: DEFAULT_RANDOM_TRIALS,
            seed: None,
        }
    }
}
