use impact_core::{ErrorInfo, ImpactError, RngHandle};
use serde::{Deserialize, Serialize};

use crate::config::{LadderConfig, LadderPolicy};
use crate::determinism;

/// Validated temperature ladder, coldest rung first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ladder {
    temperatures: Vec<f64>,
}

impl Ladder {
    /// Accepts a ladder whose first rung is exactly 1 and which increases
    /// strictly.
    pub fn new(temperatures: Vec<f64>) -> Result<Self, ImpactError> {
        let Some(&first) = temperatures.first() else {
            return Err(ImpactError::config("zero-chains", "ladder needs at least one rung"));
        };
        if first != 1.0 {
            return Err(ImpactError::Configuration(
                ErrorInfo::new("ladder-base", "coldest temperature must be exactly 1")
                    .with_context("temperature", first.to_string()),
            ));
        }
        for (rung, pair) in temperatures.windows(2).enumerate() {
            if !(pair[1] > pair[0] && pair[1].is_finite()) {
                return Err(ImpactError::Configuration(
                    ErrorInfo::new("ladder-order", "temperatures must increase strictly")
                        .with_context("rung", (rung + 1).to_string())
                        .with_context("temperature", pair[1].to_string()),
                ));
            }
        }
        Ok(Self { temperatures })
    }

    /// Builds the ladder described by a configuration block.
    pub fn from_config(config: &LadderConfig) -> Result<Self, ImpactError> {
        match &config.policy {
            LadderPolicy::Geometric { ratio, hottest } => {
                if config.replicas == 0 {
                    return Err(ImpactError::config(
                        "zero-chains",
                        "ladder needs at least one replica",
                    ));
                }
                let mut temperatures = Vec::with_capacity(config.replicas);
                let mut temperature = config.base_temperature;
                for _ in 0..config.replicas {
                    temperatures.push(temperature);
                    temperature *= ratio;
                }
                if let (Some(hottest), true) = (hottest, config.replicas > 1) {
                    if let Some(last) = temperatures.last_mut() {
                        *last = *hottest;
                    }
                }
                Self::new(temperatures)
            }
            LadderPolicy::Manual { temperatures } => Self::new(temperatures.clone()),
        }
    }

    /// Temperatures by rank.
    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    /// Number of rungs.
    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    /// Always false for a validated ladder.
    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }
}

/// Log acceptance ratio for swapping the states held at two temperatures:
/// `(logL_a − logL_b)(1/T_b − 1/T_a)`.
pub fn exchange_log_ratio(log_l_a: f64, temp_a: f64, log_l_b: f64, temp_b: f64) -> f64 {
    let ratio = (log_l_a - log_l_b) * (1.0 / temp_b - 1.0 / temp_a);
    // Equal temperatures make the ratio exactly zero even for infinite logL.
    if ratio.is_nan() {
        0.0
    } else {
        ratio
    }
}

/// Metropolis acceptance probability `min(1, e^{log H})` of an exchange.
pub fn exchange_acceptance(log_l_a: f64, temp_a: f64, log_l_b: f64, temp_b: f64) -> f64 {
    exchange_log_ratio(log_l_a, temp_a, log_l_b, temp_b).exp().min(1.0)
}

/// Attempts an exchange, returning whether it was accepted and its
/// acceptance probability.
pub fn attempt_exchange(
    log_l_a: f64,
    temp_a: f64,
    log_l_b: f64,
    temp_b: f64,
    rng: &mut RngHandle,
) -> (bool, f64) {
    let acceptance = exchange_acceptance(log_l_a, temp_a, log_l_b, temp_b);
    (rng.uniform() < acceptance, acceptance)
}

/// Running exchange statistics per adjacent pair of ranks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeStats {
    /// Attempts per pair.
    pub attempted: Vec<u64>,
    /// Accepted swaps per pair.
    pub accepted: Vec<u64>,
}

impl ExchangeStats {
    /// Zeroed statistics for `pairs` adjacent pairs.
    pub fn new(pairs: usize) -> Self {
        Self {
            attempted: vec![0; pairs],
            accepted: vec![0; pairs],
        }
    }

    /// Fraction of accepted swaps per pair.
    pub fn acceptance_rates(&self) -> Vec<f64> {
        self.attempted
            .iter()
            .zip(&self.accepted)
            .map(|(attempted, accepted)| {
                if *attempted == 0 {
                    0.0
                } else {
                    *accepted as f64 / *attempted as f64
                }
            })
            .collect()
    }
}

/// One sequential pass over adjacent ranks `(i, i + 1)`, `i = 0..NC−2`.
///
/// `index[rank]` names the state slot currently at that rank and
/// `log_likelihoods` is indexed by slot. Accepted exchanges swap permutation
/// entries only; later pairs see the effect of earlier swaps. Returns the
/// number of accepted exchanges.
pub fn exchange_pass(
    temperatures: &[f64],
    index: &mut [usize],
    log_likelihoods: &[f64],
    master_seed: u64,
    iteration: usize,
    stats: &mut ExchangeStats,
) -> usize {
    let mut swaps = 0;
    for pair in 0..index.len().saturating_sub(1) {
        let mut rng = RngHandle::from_seed(determinism::exchange_seed(master_seed, iteration, pair));
        let (accepted, _) = attempt_exchange(
            log_likelihoods[index[pair]],
            temperatures[pair],
            log_likelihoods[index[pair + 1]],
            temperatures[pair + 1],
            &mut rng,
        );
        if let Some(count) = stats.attempted.get_mut(pair) {
            *count += 1;
        }
        if accepted {
            index.swap(pair, pair + 1);
            swaps += 1;
            if let Some(count) = stats.accepted.get_mut(pair) {
                *count += 1;
            }
        }
    }
    swaps
}
