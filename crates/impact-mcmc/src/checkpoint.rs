use std::fs;
use std::path::{Path, PathBuf};

use impact_core::ImpactError;
use serde::{Deserialize, Serialize};

use crate::chain::MoveCounters;
use crate::config::SamplerConfig;
use crate::state::ParameterSet;
use crate::tempering::ExchangeStats;

/// Serialised chain held in one state slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotCheckpoint {
    /// Sampled parameters.
    pub parameters: ParameterSet,
    /// Move statistics so far.
    pub counters: MoveCounters,
}

/// Everything needed to continue a run bit-for-bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointPayload {
    /// Outer iterations completed when the checkpoint was written.
    pub iteration: usize,
    /// Configuration snapshot.
    pub config: SamplerConfig,
    /// Master seed used to derive substreams.
    pub master_seed: u64,
    /// Frequency bins per channel.
    pub bins: usize,
    /// Reference log-likelihood subtracted in diagnostics.
    pub reference_log_likelihood: f64,
    /// Rank → slot permutation.
    pub index: Vec<usize>,
    /// Chains by slot.
    pub slots: Vec<SlotCheckpoint>,
    /// Exchange statistics per pair.
    pub exchanges: ExchangeStats,
}

impl CheckpointPayload {
    /// Restores the payload from disk.
    pub fn load(path: &Path) -> Result<Self, ImpactError> {
        let contents = fs::read_to_string(path)
            .map_err(|err| ImpactError::serde_at("checkpoint-read", err, path))?;
        serde_json::from_str(&contents)
            .map_err(|err| ImpactError::serde_at("checkpoint-parse", err, path))
    }

    /// Writes the payload to disk.
    pub fn store(&self, path: &Path) -> Result<(), ImpactError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| ImpactError::serde_at("checkpoint-mkdir", err, parent))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| ImpactError::serde_at("checkpoint-serialize", err, path))?;
        fs::write(path, json).map_err(|err| ImpactError::serde_at("checkpoint-write", err, path))
    }
}

/// Deterministic checkpoint file name for an iteration count.
pub fn checkpoint_path(root: &Path, iteration: usize) -> PathBuf {
    root.join(format!("ckpt_{iteration:06}.json"))
}

/// Deletes the oldest checkpoints beyond `max_to_keep`.
pub fn enforce_retention(paths: &mut Vec<PathBuf>, max_to_keep: usize) -> Result<(), ImpactError> {
    while paths.len() > max_to_keep.max(1) {
        let path = paths.remove(0);
        fs::remove_file(&path).map_err(|err| ImpactError::serde_at("checkpoint-remove", err, &path))?;
    }
    Ok(())
}
