use std::path::{Path, PathBuf};

use impact_core::{ErrorInfo, ImpactError};
use serde::{Deserialize, Serialize};

use crate::tempering::Ladder;

/// YAML-configurable parameters governing a sampler run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Number of outer iterations (burst + exchange) to execute.
    #[serde(default = "default_outer_iterations")]
    pub outer_iterations: usize,
    /// Proposal cycles per chain within one outer iteration.
    #[serde(default = "default_hidden_steps")]
    pub hidden_steps: usize,
    /// Maximum number of impacts a state may hold.
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Temperature ladder specification.
    #[serde(default)]
    pub ladder: LadderConfig,
    /// Move selection weights.
    #[serde(default)]
    pub moves: MoveWeights,
    /// Random-walk step sizes.
    #[serde(default)]
    pub steps: StepSizes,
    /// Prior hyper-parameters.
    #[serde(default)]
    pub prior: PriorConfig,
    /// Disables birth and death moves.
    #[serde(default)]
    pub fixed_dimension: bool,
    /// Fixes the log-likelihood at zero so the sampler draws from the prior.
    #[serde(default)]
    pub sample_prior: bool,
    /// Runs chain bursts concurrently on a rayon pool.
    #[serde(default)]
    pub parallel: bool,
    /// Worker threads for parallel bursts (defaults to the rayon global pool).
    #[serde(default)]
    pub threads: Option<usize>,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Checkpointing behaviour.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Output directory configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_outer_iterations() -> usize {
    1000
}

fn default_hidden_steps() -> usize {
    10
}

fn default_max_events() -> usize {
    16
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            outer_iterations: default_outer_iterations(),
            hidden_steps: default_hidden_steps(),
            max_events: default_max_events(),
            ladder: LadderConfig::default(),
            moves: MoveWeights::default(),
            steps: StepSizes::default(),
            prior: PriorConfig::default(),
            fixed_dimension: false,
            sample_prior: false,
            parallel: false,
            threads: None,
            seed_policy: SeedPolicy::default(),
            checkpoint: CheckpointConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl SamplerConfig {
    /// Parses a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ImpactError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| ImpactError::serde_at("config-read", err, path))?;
        serde_yaml::from_str(&contents)
            .map_err(|err| ImpactError::serde_at("config-parse", err, path))
    }

    /// Checks every constraint that must hold before sampling starts.
    pub fn validate(&self) -> Result<(), ImpactError> {
        if self.ladder.replicas == 0 {
            return Err(ImpactError::config("zero-chains", "ladder needs at least one replica"));
        }
        Ladder::from_config(&self.ladder)?;
        if self.hidden_steps == 0 {
            return Err(ImpactError::config(
                "hidden-steps",
                "hidden_steps must be at least one",
            ));
        }
        self.moves.validate(self.fixed_dimension)?;
        self.steps.validate()?;
        self.prior.validate()?;
        if let Some(0) = self.threads {
            return Err(ImpactError::config("threads", "thread count must be positive"));
        }
        Ok(())
    }
}

/// Temperature ladder construction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Number of replicas (ignored by the manual policy).
    #[serde(default = "default_replicas")]
    pub replicas: usize,
    /// Temperature of the coldest replica; must be exactly 1.
    #[serde(default = "default_base_temperature")]
    pub base_temperature: f64,
    /// Policy used to generate higher temperatures.
    #[serde(default)]
    pub policy: LadderPolicy,
}

fn default_replicas() -> usize {
    10
}

fn default_base_temperature() -> f64 {
    1.0
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            replicas: default_replicas(),
            base_temperature: default_base_temperature(),
            policy: LadderPolicy::default(),
        }
    }
}

/// Supported ladder construction strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LadderPolicy {
    /// Geometric progression with a fixed ratio between neighbouring rungs.
    Geometric {
        /// Multiplicative spacing between adjacent rungs.
        #[serde(default = "default_ratio")]
        ratio: f64,
        /// Optional override for the hottest rung.
        #[serde(default)]
        hottest: Option<f64>,
    },
    /// Explicit temperatures, coldest first (overrides `replicas`).
    Manual {
        /// Ordered temperatures.
        temperatures: Vec<f64>,
    },
}

fn default_ratio() -> f64 {
    1.5
}

impl Default for LadderPolicy {
    fn default() -> Self {
        LadderPolicy::Geometric {
            ratio: default_ratio(),
            hottest: None,
        }
    }
}

/// Move selection weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveWeights {
    /// Weight of fixed-dimension parameter updates.
    #[serde(default = "default_update_weight")]
    pub parameter_update: f64,
    /// Weight of birth moves.
    #[serde(default = "default_jump_weight")]
    pub birth: f64,
    /// Weight of death moves.
    #[serde(default = "default_jump_weight")]
    pub death: f64,
    /// Share of parameter updates that perturb a noise amplitude.
    #[serde(default = "default_noise_fraction")]
    pub noise_fraction: f64,
    /// Share of impact updates that redraw the location from the surface prior.
    #[serde(default = "default_relocate_fraction")]
    pub relocate_fraction: f64,
}

fn default_update_weight() -> f64 {
    0.8
}

fn default_jump_weight() -> f64 {
    0.1
}

fn default_noise_fraction() -> f64 {
    0.2
}

fn default_relocate_fraction() -> f64 {
    0.1
}

impl Default for MoveWeights {
    fn default() -> Self {
        Self {
            parameter_update: default_update_weight(),
            birth: default_jump_weight(),
            death: default_jump_weight(),
            noise_fraction: default_noise_fraction(),
            relocate_fraction: default_relocate_fraction(),
        }
    }
}

impl MoveWeights {
    fn validate(&self, fixed_dimension: bool) -> Result<(), ImpactError> {
        let weights = [
            ("parameter_update", self.parameter_update),
            ("birth", self.birth),
            ("death", self.death),
        ];
        for (name, weight) in weights {
            if !(weight >= 0.0 && weight.is_finite()) {
                return Err(ImpactError::Configuration(
                    ErrorInfo::new("move-weight", "move weights must be non-negative")
                        .with_context("move", name)
                        .with_context("weight", weight.to_string()),
                ));
            }
        }
        let total = self.parameter_update + self.birth + self.death;
        if (total - 1.0).abs() > 1e-9 {
            return Err(ImpactError::Configuration(
                ErrorInfo::new("move-weights-sum", "move weights must sum to 1")
                    .with_context("sum", total.to_string()),
            ));
        }
        if fixed_dimension && self.parameter_update <= 0.0 {
            return Err(ImpactError::config(
                "move-weights-fixed",
                "fixed-dimension runs need a positive parameter_update weight",
            ));
        }
        for (name, fraction) in [
            ("noise_fraction", self.noise_fraction),
            ("relocate_fraction", self.relocate_fraction),
        ] {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(ImpactError::Configuration(
                    ErrorInfo::new("move-fraction", "fractions must lie in [0, 1]")
                        .with_context("field", name)
                        .with_context("value", fraction.to_string()),
                ));
            }
        }
        Ok(())
    }
}

/// Standard deviations of the Gaussian random-walk updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSizes {
    /// Arrival time step in seconds.
    #[serde(default = "default_time_step")]
    pub time: f64,
    /// Momentum step in µN·s.
    #[serde(default = "default_momentum_step")]
    pub momentum: f64,
    /// Surface coordinate step in metres.
    #[serde(default = "default_surface_step")]
    pub surface: f64,
    /// Step applied to both `cos θ` and `φ`.
    #[serde(default = "default_incidence_step")]
    pub incidence: f64,
    /// Noise amplitude step as a fraction of the reference amplitude.
    #[serde(default = "default_noise_step")]
    pub noise: f64,
}

fn default_time_step() -> f64 {
    0.5
}

fn default_momentum_step() -> f64 {
    0.5
}

fn default_surface_step() -> f64 {
    0.05
}

fn default_incidence_step() -> f64 {
    0.1
}

fn default_noise_step() -> f64 {
    0.05
}

impl Default for StepSizes {
    fn default() -> Self {
        Self {
            time: default_time_step(),
            momentum: default_momentum_step(),
            surface: default_surface_step(),
            incidence: default_incidence_step(),
            noise: default_noise_step(),
        }
    }
}

impl StepSizes {
    fn validate(&self) -> Result<(), ImpactError> {
        let steps = [
            ("time", self.time),
            ("momentum", self.momentum),
            ("surface", self.surface),
            ("incidence", self.incidence),
            ("noise", self.noise),
        ];
        for (name, step) in steps {
            if !(step > 0.0 && step.is_finite()) {
                return Err(ImpactError::Configuration(
                    ErrorInfo::new("step-size", "step sizes must be positive and finite")
                        .with_context("step", name)
                        .with_context("value", step.to_string()),
                ));
            }
        }
        Ok(())
    }
}

/// Prior hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorConfig {
    /// Mean of the exponential momentum prior, µN·s.
    #[serde(default = "default_momentum_mean")]
    pub momentum_mean: f64,
    /// Prior on each noise amplitude, relative to its reference value.
    #[serde(default)]
    pub noise: NoisePrior,
}

fn default_momentum_mean() -> f64 {
    10.0
}

impl Default for PriorConfig {
    fn default() -> Self {
        Self {
            momentum_mean: default_momentum_mean(),
            noise: NoisePrior::default(),
        }
    }
}

impl PriorConfig {
    fn validate(&self) -> Result<(), ImpactError> {
        if !(self.momentum_mean > 0.0 && self.momentum_mean.is_finite()) {
            return Err(ImpactError::Configuration(
                ErrorInfo::new("momentum-mean", "momentum prior mean must be positive")
                    .with_context("value", self.momentum_mean.to_string()),
            ));
        }
        match self.noise {
            NoisePrior::LogNormal { width } if !(width > 0.0 && width.is_finite()) => {
                Err(ImpactError::Configuration(
                    ErrorInfo::new("noise-prior-width", "log-normal width must be positive")
                        .with_context("width", width.to_string()),
                ))
            }
            NoisePrior::Uniform { lower, upper } if !(lower > 0.0 && upper > lower) => {
                Err(ImpactError::Configuration(
                    ErrorInfo::new("noise-prior-bounds", "uniform bounds need 0 < lower < upper")
                        .with_context("lower", lower.to_string())
                        .with_context("upper", upper.to_string()),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Positive-support prior on a noise amplitude around its reference value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NoisePrior {
    /// `ln(A / A_ref) ~ N(0, width²)`.
    LogNormal {
        /// Standard deviation in natural-log units.
        #[serde(default = "default_noise_width")]
        width: f64,
    },
    /// `A ~ U[lower·A_ref, upper·A_ref]`.
    Uniform {
        /// Lower bound as a multiple of the reference.
        lower: f64,
        /// Upper bound as a multiple of the reference.
        upper: f64,
    },
}

fn default_noise_width() -> f64 {
    0.5
}

impl Default for NoisePrior {
    fn default() -> Self {
        NoisePrior::LogNormal {
            width: default_noise_width(),
        }
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x1A9F_0C0D_E5EE_D001
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Checkpointing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Outer iterations between checkpoint writes (0 disables checkpoints).
    #[serde(default)]
    pub interval: usize,
    /// Maximum number of checkpoints to retain.
    #[serde(default = "default_checkpoint_retention")]
    pub max_to_keep: usize,
}

fn default_checkpoint_retention() -> usize {
    4
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval: 0,
            max_to_keep: default_checkpoint_retention(),
        }
    }
}

/// Output directory layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts. Created if it does not exist.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Manifest filename relative to `run_directory`.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
    /// Subdirectory used for checkpoint files.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            manifest_file: default_manifest_filename(),
            checkpoint_dir: default_checkpoint_dir(),
        }
    }
}
