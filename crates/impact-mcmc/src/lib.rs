#![deny(missing_docs)]

//! Trans-dimensional, parallel-tempered sampler for spacecraft micro-impacts.
//!
//! Chains at increasing temperatures each run a burst of birth, death and
//! parameter-update proposals, then adjacent ranks attempt to exchange their
//! states. All randomness is derived from a master seed per slot and
//! iteration, so sequential, parallel and resumed runs agree exactly.

/// Per-chain state machine: propose, evaluate, accept or reject.
pub mod chain;
/// Checkpoint payloads and retention.
pub mod checkpoint;
/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Replica-exchange scheduler and the public `run_sampler`/`resume_sampler`
/// entry points.
pub mod kernel;
/// Gaussian likelihood and the scoring seam.
pub mod likelihood;
/// Run manifest serialization helpers.
pub mod manifest;
/// Per-iteration diagnostics and sinks.
pub mod metrics;
pub mod prior;
/// Move kinds and the proposal engine.
pub mod proposal;
/// Chain state with cached scores.
pub mod state;
/// Temperature ladder and exchange rules.
pub mod tempering;

pub use chain::{ChainWorkspace, MoveCounters, StepOutcome};
pub use checkpoint::CheckpointPayload;
pub use config::{
    CheckpointConfig, LadderConfig, LadderPolicy, MoveWeights, NoisePrior, OutputConfig,
    PriorConfig, SamplerConfig, SeedPolicy, StepSizes,
};
pub use kernel::{
    prior_initial_states, resume_sampler, run_sampler, LineRefinement, OutputPlan, RunControl,
    SamplerContext, SamplerRun, Schedule,
};
pub use likelihood::{score, LikelihoodEvaluator, StateScorer};
pub use metrics::{DiagnosticsRecorder, DiscardRecords, IterationRecord, IterationSink};
pub use prior::ImpactPrior;
pub use proposal::{Move, MoveFamily, MoveKind, Proposal, ProposalEngine, UpdateTarget};
pub use state::{ImpactState, ParameterSet};
pub use tempering::{ExchangeStats, Ladder};
