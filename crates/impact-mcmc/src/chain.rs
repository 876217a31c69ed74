use std::collections::BTreeMap;

use impact_core::{ImpactError, RngHandle};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::likelihood::StateScorer;
use crate::proposal::{MoveKind, Proposal, ProposalEngine};
use crate::state::ImpactState;

/// Result of one propose/evaluate/accept cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Trial adopted as the current state.
    Accepted,
    /// Trial discarded by the Metropolis test or a zero prior.
    Rejected,
    /// Trial log-likelihood was not finite.
    RejectAlways,
}

/// Proposal and acceptance counts per move kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveCounters {
    /// Proposals per kind.
    pub proposed: BTreeMap<MoveKind, u64>,
    /// Acceptances per kind.
    pub accepted: BTreeMap<MoveKind, u64>,
    /// Trials rejected for a non-finite log-likelihood.
    pub reject_always: u64,
}

impl MoveCounters {
    fn record(&mut self, kind: MoveKind, outcome: StepOutcome) {
        *self.proposed.entry(kind).or_insert(0) += 1;
        match outcome {
            StepOutcome::Accepted => *self.accepted.entry(kind).or_insert(0) += 1,
            StepOutcome::RejectAlways => self.reject_always += 1,
            StepOutcome::Rejected => {}
        }
    }

    /// Adds another set of counters into this one.
    pub fn merge(&mut self, other: &MoveCounters) {
        for (kind, count) in &other.proposed {
            *self.proposed.entry(*kind).or_insert(0) += count;
        }
        for (kind, count) in &other.accepted {
            *self.accepted.entry(*kind).or_insert(0) += count;
        }
        self.reject_always += other.reject_always;
    }

    /// Acceptance fraction per move kind.
    pub fn acceptance_rates(&self) -> BTreeMap<String, f64> {
        self.proposed
            .iter()
            .map(|(kind, proposed)| {
                let accepted = self.accepted.get(kind).copied().unwrap_or(0);
                let rate = if *proposed == 0 {
                    0.0
                } else {
                    accepted as f64 / *proposed as f64
                };
                (kind.as_str().to_string(), rate)
            })
            .collect()
    }
}

/// Exclusively owned working set of one chain.
#[derive(Debug, Clone)]
pub struct ChainWorkspace {
    /// Current state with consistent cached scores.
    pub current: ImpactState,
    /// Scratch buffer for candidates; never aliases `current`.
    pub trial: ImpactState,
    /// Move statistics.
    pub counters: MoveCounters,
}

impl ChainWorkspace {
    /// Wraps a scored state, allocating a trial buffer of the same shape.
    pub fn new(current: ImpactState) -> Self {
        let trial = current.clone();
        Self {
            current,
            trial,
            counters: MoveCounters::default(),
        }
    }
}

/// `log H = (logL' − logL)/T + ΔlogPrior − logHastings`, where the prior
/// difference is taken as zero when the dimensions differ (the birth draw
/// cancels it).
pub fn acceptance_log_ratio(
    current: &ImpactState,
    trial: &ImpactState,
    temperature: f64,
    log_hastings: f64,
) -> f64 {
    let delta_prior = if current.dimension() == trial.dimension() {
        trial.log_prior() - current.log_prior()
    } else {
        0.0
    };
    (trial.log_likelihood() - current.log_likelihood()) / temperature + delta_prior - log_hastings
}

/// One propose/evaluate/accept cycle at `temperature`.
pub fn step(
    scorer: &dyn StateScorer,
    engine: &ProposalEngine<'_>,
    workspace: &mut ChainWorkspace,
    temperature: f64,
    rng: &mut RngHandle,
) -> Result<StepOutcome, ImpactError> {
    let Proposal {
        chosen,
        log_hastings,
    } = engine.propose(&workspace.current, &mut workspace.trial, rng);
    let kind = chosen.kind();

    let log_prior = scorer.log_prior(&workspace.trial);
    let outcome = if log_prior == f64::NEG_INFINITY || log_prior.is_nan() {
        StepOutcome::Rejected
    } else {
        let log_likelihood = scorer.log_likelihood(&mut workspace.trial)?;
        workspace.trial.set_scores(log_likelihood, log_prior);
        if !log_likelihood.is_finite() {
            warn!(?kind, log_likelihood, "rejecting trial with non-finite likelihood");
            StepOutcome::RejectAlways
        } else {
            let log_h =
                acceptance_log_ratio(&workspace.current, &workspace.trial, temperature, log_hastings);
            if rng.uniform().ln() < log_h {
                std::mem::swap(&mut workspace.current, &mut workspace.trial);
                StepOutcome::Accepted
            } else {
                StepOutcome::Rejected
            }
        }
    };
    trace!(?kind, ?outcome, temperature, "proposal evaluated");
    workspace.counters.record(kind, outcome);
    Ok(outcome)
}

/// Runs `steps` consecutive cycles on one chain.
pub fn burst(
    scorer: &dyn StateScorer,
    engine: &ProposalEngine<'_>,
    workspace: &mut ChainWorkspace,
    temperature: f64,
    steps: usize,
    rng: &mut RngHandle,
) -> Result<(), ImpactError> {
    for _ in 0..steps {
        step(scorer, engine, workspace, temperature, rng)?;
    }
    Ok(())
}
