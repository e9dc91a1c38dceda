//! Bounded randomized search
//!
//! Each trial shuffles the candidates and adds them one at a time until the
//! running sum meets the requirement for the inputs taken so far. An exact
//! hit ends the search; an overshoot is recorded and the next trial starts.
//! The recorded combination with the fewest inputs wins, earliest first.
//!
//! The generator is created once per call from an explicit seed, so a fixed
//! seed reproduces the same selection and concurrent calls share nothing.

use crate::error::{TransferError, TransferResult};
use crate::types::UnspentOutput;
use crate::utxo_selection::strategies::{Search, SpendTarget};
use crate::utxo_selection::types::DEFAULT_RANDOM_TRIALS;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

#[derive(Debug, Clone)]
pub struct Randomized {
    trials: usize,
    seed: Option<u64>,
}

impl Randomized {
    pub fn new() -> Self {
        Self {
            trials: DEFAULT_RANDOM_TRIALS,
            seed: None,
        }
    }

    /// # Arguments
    /// * `trials` - Number of shuffles to try
    /// * `seed` - Fixed generator seed, or `None` for a fresh one per call
    pub fn with_params(trials: usize, seed: Option<u64>) -> Self {
        Self { trials, seed }
    }
}

impl Default for Randomized {
    fn default() -> Self {
        Self::new()
    }
}

impl Search for Randomized {
    fn name(&self) -> &'static str {
        "randomized"
    }

    fn search(
        &self,
        candidates: &[UnspentOutput],
        target: &SpendTarget<'_>,
    ) -> TransferResult<Vec<UnspentOutput>> {
        let seed = self.seed.unwrap_or_else(rand::random::<u64>);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        let mut best: Option<Vec<usize>> = None;

        for trial in 0..self.trials {
            order.shuffle(&mut rng);

            let mut sum = 0u64;
            for (taken, index) in order.iter().enumerate() {
                sum = sum.saturating_add(candidates[*index].sats());
                let count = taken + 1;
                let required = target.required(count);
                if sum < required {
                    continue;
                }

                let combination = &order[..count];
                if sum == required {
                    debug!("randomized search hit the requirement exactly on trial {}", trial);
                    return Ok(in_candidate_order(candidates, combination.to_vec()));
                }
                if best.as_ref().map_or(true, |b| count < b.len()) {
                    best = Some(combination.to_vec());
                }
                break;
            }
        }

        match best {
            Some(indexes) => {
                debug!(
                    "randomized search settled on {} inputs after {} trials",
                    indexes.len(),
                    self.trials
                );
                Ok(in_candidate_order(candidates, indexes))
            }
            None => Err(TransferError::NoViableCombination {
                attempts: self.trials,
            }),
        }
    }
}

// Chosen outputs in the order the candidates were given
fn in_candidate_order(candidates: &[UnspentOutput], mut indexes: Vec<usize>) -> Vec<UnspentOutput> {
    indexes.sort_unstable();
    indexes.into_iter().map(|i| candidates[i]).collect()
}
