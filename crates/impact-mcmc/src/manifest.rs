use std::fs;
use std::path::{Path, PathBuf};

use impact_core::ImpactError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::SamplerConfig;

/// Structured description of a completed (or stopped) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Configuration used for the run.
    pub config: SamplerConfig,
    /// SHA-256 of the canonical YAML rendering of `config`.
    pub config_hash: String,
    /// Master seed used to derive substreams.
    pub master_seed: u64,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// RFC 3339 timestamp of manifest creation.
    pub created_at: String,
    /// Outer iterations completed.
    pub iterations_completed: usize,
    /// Whether the run ended on a stop request.
    pub stop_requested: bool,
    /// Relative cold-chain log-likelihood at the end of the run.
    pub final_log_likelihood: f64,
    /// Cold-chain dimension at the end of the run.
    pub final_dimension: usize,
    /// Checkpoint files retained, relative to the run directory.
    pub checkpoints: Vec<PathBuf>,
}

impl RunManifest {
    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), ImpactError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| ImpactError::serde_at("manifest-mkdir", err, parent))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| ImpactError::serde_at("manifest-serialize", err, path))?;
        fs::write(path, json).map_err(|err| ImpactError::serde_at("manifest-write", err, path))
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, ImpactError> {
        let contents = fs::read_to_string(path)
            .map_err(|err| ImpactError::serde_at("manifest-read", err, path))?;
        serde_json::from_str(&contents)
            .map_err(|err| ImpactError::serde_at("manifest-parse", err, path))
    }
}

/// Hex SHA-256 of the YAML rendering of a configuration.
pub fn config_hash(config: &SamplerConfig) -> Result<String, ImpactError> {
    let yaml = serde_yaml::to_string(config).map_err(|err| {
        ImpactError::Serde(impact_core::ErrorInfo::new("config-serialize", err.to_string()))
    })?;
    let digest = Sha256::digest(yaml.as_bytes());
    Ok(hex::encode(digest))
}

/// Current time as RFC 3339.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
