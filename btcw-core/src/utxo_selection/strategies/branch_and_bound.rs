//! Deterministic minimal-input search
//!
//! Finds the smallest input count `k` that can cover the requirement, then
//! looks among the `k`-subsets for the one that overshoots the least. The
//! same candidates and target always give the same answer.

use crate::error::{TransferError, TransferResult};
use crate::types::{total_sats, UnspentOutput};
use crate::utxo_selection::strategies::{Search, SpendTarget};
use crate::utxo_selection::types::DEFAULT_NODE_BUDGET;
use log::{debug, trace};

/// Branch and bound search minimising input count, then excess
#[derive(Debug, Clone)]
pub struct BranchAndBound {
    /// Maximum number of search nodes to visit before settling for the best so far
    node_budget: usize,
}

impl BranchAndBound {
    pub fn new() -> Self {
        Self {
            node_budget: DEFAULT_NODE_BUDGET,
        }
    }

    pub fn with_node_budget(node_budget: usize) -> Self {
        Self { node_budget }
    }
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self::new()
    }
}

/// State of one k-subset search over amounts sorted largest first
struct SubsetSearch<'s> {
    amounts: &'s [u64],
    /// `prefix[i]` is the sum of the `i` largest amounts
    prefix: &'s [u64],
    required: u64,
    nodes_left: usize,
    picked: Vec<usize>,
    best: Vec<usize>,
    best_sum: u64,
}

impl<'s> SubsetSearch<'s> {
    fn range_sum(&self, from: usize, to: usize) -> u64 {
        self.prefix[to] - self.prefix[from]
    }

    /// Extend `picked` with `remaining` more indexes starting at `start`
    fn explore(&mut self, start: usize, remaining: usize, sum: u64) {
        if self.best_sum == self.required || self.nodes_left == 0 {
            return;
        }
        self.nodes_left -= 1;

        if remaining == 0 {
            if sum >= self.required && sum < self.best_sum {
                self.best_sum = sum;
                self.best = self.picked.clone();
            }
            return;
        }

        let n = self.amounts.len();
        for i in start..=(n - remaining) {
            // largest possible completion still falls short
            if sum.saturating_add(self.range_sum(i, i + remaining)) < self.required {
                return;
            }
            // smallest possible completion already does no better than the best
            if sum.saturating_add(self.range_sum(n - remaining, n)) >= self.best_sum {
                return;
            }
            self.picked.push(i);
            self.explore(i + 1, remaining - 1, sum.saturating_add(self.amounts[i]));
            self.picked.pop();
            if self.best_sum == self.required || self.nodes_left == 0 {
                return;
            }
        }
    }
}

impl Search for BranchAndBound {
    fn name(&self) -> &'static str {
        "branch_and_bound"
    }

    fn search(
        &self,
        candidates: &[UnspentOutput],
        target: &SpendTarget<'_>,
    ) -> TransferResult<Vec<UnspentOutput>> {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by(|a, b| candidates[*b].amount.cmp(&candidates[*a].amount));
        let amounts: Vec<u64> = order.iter().map(|i| candidates[*i].sats()).collect();

        let mut prefix = Vec::with_capacity(amounts.len() + 1);
        prefix.push(0u64);
        for amount in &amounts {
            let last = prefix[prefix.len() - 1];
            prefix.push(last.saturating_add(*amount));
        }

        // The k largest outputs are the best any k-subset can do
        let k = match (1..=amounts.len()).find(|k| prefix[*k] >= target.required(*k)) {
            Some(k) => k,
            None => {
                return Err(TransferError::InsufficientFunds {
                    needed: target.required(amounts.len().max(1)),
                    available: total_sats(candidates),
                })
            }
        };

        let required = target.required(k);
        let mut state = SubsetSearch {
            amounts: &amounts,
            prefix: &prefix,
            required,
            nodes_left: self.node_budget,
            picked: Vec::with_capacity(k),
            best: (0..k).collect(),
            best_sum: prefix[k],
        };
        state.explore(0, k, 0);

        trace!(
            "branch and bound visited {} nodes",
            self.node_budget - state.nodes_left
        );
        debug!(
            "branch and bound picked {} inputs, excess {} sats",
            k,
            state.best_sum - required
        );

        let mut picked: Vec<usize> = state.best.iter().map(|i| order[*i]).collect();
        picked.sort_unstable();
        Ok(picked.into_iter().map(|i| candidates[i]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::{FeeRate, LegacyFeeModel};
    use bitcoin::hashes::Hash;
    use bitcoin::Txid;

    fn outputs(amounts: &[u64]) -> Vec<UnspentOutput> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, a)| UnspentOutput::new(Txid::all_zeros(), i as u32, *a))
            .collect()
    }

    #[test]
    fn test_prefers_fewest_inputs() {
        let model = LegacyFeeModel;
        let target = SpendTarget::new(10_000, FeeRate::ZERO, &model);
        let candidates = outputs(&[2_000, 3_000, 4_000, 5_000, 6_000]);

        let chosen = BranchAndBound::new().search(&candidates, &target).unwrap();
        assert_eq!(chosen.len(), 2);
        assert_eq!(total_sats(&chosen), 10_000);
    }

    #[test]
    fn test_least_excess_among_equal_counts() {
        let model = LegacyFeeModel;
        let target = SpendTarget::new(9_900, FeeRate::ZERO, &model);
        let candidates = outputs(&[1_500, 4_000, 6_000, 9_000]);

        // 4000 + 6000 overshoots by 100, every pair with 9000 by more
        let chosen = BranchAndBound::new().search(&candidates, &target).unwrap();
        let amounts: Vec<u64> = chosen.iter().map(|u| u.sats()).collect();
        assert_eq!(amounts, vec![4_000, 6_000]);
    }

    #[test]
    fn test_fee_grows_with_inputs() {
        let model = LegacyFeeModel;
        let rate = FeeRate::from_sat_per_kvb(1_000);
        let target = SpendTarget::new(10_000, rate, &model);
        // two inputs need 10_000 + 440
        let candidates = outputs(&[5_000, 5_000, 5_300, 5_200]);

        let chosen = BranchAndBound::new().search(&candidates, &target).unwrap();
        assert_eq!(chosen.len(), 2);
        assert!(total_sats(&chosen) >= target.required(2));
        assert_eq!(total_sats(&chosen), 10_500);
    }

    #[test]
    fn test_zero_budget_keeps_largest_subset() {
        let model = LegacyFeeModel;
        let target = SpendTarget::new(5_000, FeeRate::ZERO, &model);
        let candidates = outputs(&[1_000, 2_000, 3_000, 4_000]);

        let chosen = BranchAndBound::with_node_budget(0)
            .search(&candidates, &target)
            .unwrap();
        let amounts: Vec<u64> = chosen.iter().map(|u| u.sats()).collect();
        assert_eq!(amounts, vec![3_000, 4_000]);
    }

    #[test]
    fn test_insufficient() {
        let model = LegacyFeeModel;
        let target = SpendTarget::new(50_000, FeeRate::ZERO, &model);
        let candidates = outputs(&[1_000, 2_000]);

        let err = BranchAndBound::new().search(&candidates, &target).unwrap_err();
        assert!(matches!(
            err,
            TransferError::InsufficientFunds {
                available: 3_000,
                ..
            }
        ));
    }
}
