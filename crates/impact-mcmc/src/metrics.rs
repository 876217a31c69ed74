use std::collections::BTreeMap;

use impact_core::ImpactError;
use serde::{Deserialize, Serialize};

use crate::state::ParameterSet;

/// Diagnostic record emitted after every outer iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Zero-based outer iteration.
    pub iteration: usize,
    /// `logL − reference` by rank.
    pub log_likelihoods: Vec<f64>,
    /// Number of impacts by rank.
    pub dimensions: Vec<usize>,
    /// Temperatures by rank.
    pub temperatures: Vec<f64>,
    /// Parameters of the rank-0 chain.
    pub cold_chain: ParameterSet,
    /// Exchanges accepted during this iteration.
    pub exchanges_accepted: usize,
}

/// Consumer of per-iteration diagnostics.
pub trait IterationSink {
    /// Receives one record; an error aborts the run.
    fn record(&mut self, record: &IterationRecord) -> Result<(), ImpactError>;
}

impl IterationSink for Vec<IterationRecord> {
    fn record(&mut self, record: &IterationRecord) -> Result<(), ImpactError> {
        self.push(record.clone());
        Ok(())
    }
}

/// Sink that drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardRecords;

impl IterationSink for DiscardRecords {
    fn record(&mut self, _record: &IterationRecord) -> Result<(), ImpactError> {
        Ok(())
    }
}

/// Aggregate view of the cold chain over a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColdChainSummary {
    /// Records observed.
    pub iterations: usize,
    /// Histogram of cold-chain dimensions.
    pub dimension_histogram: BTreeMap<usize, u64>,
    /// Mean cold-chain dimension.
    pub mean_dimension: f64,
    /// Largest relative cold-chain log-likelihood seen.
    pub max_log_likelihood: f64,
    /// Mean exchanges accepted per iteration.
    pub mean_exchanges: f64,
}

/// Collects cold-chain statistics while forwarding nothing.
#[derive(Debug, Default)]
pub struct DiagnosticsRecorder {
    iterations: usize,
    dimension_histogram: BTreeMap<usize, u64>,
    dimension_total: f64,
    running_max: Vec<f64>,
    exchanges: usize,
}

impl DiagnosticsRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Running maximum of the cold-chain log-likelihood after each record.
    pub fn running_max(&self) -> &[f64] {
        &self.running_max
    }

    /// Summary of everything recorded so far.
    pub fn summary(&self) -> ColdChainSummary {
        let iterations = self.iterations;
        let denominator = iterations.max(1) as f64;
        ColdChainSummary {
            iterations,
            dimension_histogram: self.dimension_histogram.clone(),
            mean_dimension: self.dimension_total / denominator,
            max_log_likelihood: self.running_max.last().copied().unwrap_or(f64::NEG_INFINITY),
            mean_exchanges: self.exchanges as f64 / denominator,
        }
    }
}

impl IterationSink for DiagnosticsRecorder {
    fn record(&mut self, record: &IterationRecord) -> Result<(), ImpactError> {
        let cold = record.log_likelihoods.first().copied().unwrap_or(f64::NEG_INFINITY);
        let dimension = record.dimensions.first().copied().unwrap_or(0);
        let previous = self.running_max.last().copied().unwrap_or(f64::NEG_INFINITY);
        self.running_max.push(previous.max(cold));
        *self.dimension_histogram.entry(dimension).or_insert(0) += 1;
        self.dimension_total += dimension as f64;
        self.exchanges += record.exchanges_accepted;
        self.iterations += 1;
        Ok(())
    }
}

/// Forwards each record to two sinks in turn.
pub struct Tee<'a, A: IterationSink, B: IterationSink>(pub &'a mut A, pub &'a mut B);

impl<A: IterationSink, B: IterationSink> IterationSink for Tee<'_, A, B> {
    fn record(&mut self, record: &IterationRecord) -> Result<(), ImpactError> {
        self.0.record(record)?;
        self.1.record(record)
    }
}
