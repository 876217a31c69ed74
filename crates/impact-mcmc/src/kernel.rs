use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use impact_core::{
    ErrorInfo, ImpactError, Observation, RngHandle, SpectralLineModel, SurfaceGeometry,
};
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::chain::{self, ChainWorkspace, MoveCounters};
use crate::checkpoint::{self, CheckpointPayload, SlotCheckpoint};
use crate::config::SamplerConfig;
use crate::determinism;
use crate::likelihood::{self, StateScorer};
use crate::manifest::{self, RunManifest};
use crate::metrics::{IterationRecord, IterationSink};
use crate::prior::ImpactPrior;
use crate::proposal::ProposalEngine;
use crate::state::ImpactState;
use crate::tempering::{self, ExchangeStats, Ladder};

/// Spectral-line provider together with the data its residuals refer to.
#[derive(Clone, Copy)]
pub struct LineRefinement<'a> {
    /// Provider consulted between outer iterations.
    pub provider: &'a dyn SpectralLineModel,
    /// Observation the residuals are formed against.
    pub observation: &'a Observation,
}

/// Shared, read-only collaborators of a run.
#[derive(Clone, Copy)]
pub struct SamplerContext<'a> {
    /// Likelihood and prior.
    pub scorer: &'a dyn StateScorer,
    /// Proposal generator shared by all chains.
    pub engine: &'a ProposalEngine<'a>,
    /// Optional spectral-line refinement.
    pub lines: Option<LineRefinement<'a>>,
    /// Subtracted from every reported log-likelihood.
    pub reference_log_likelihood: f64,
}

/// Iteration budget and execution policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    /// Total outer iterations of the run.
    pub outer_iterations: usize,
    /// Proposal cycles per chain per outer iteration.
    pub hidden_steps: usize,
    /// Master seed for every derived stream.
    pub master_seed: u64,
    /// Run bursts on a rayon pool.
    pub parallel: bool,
    /// Dedicated pool size; `None` uses the global pool.
    pub threads: Option<usize>,
}

impl Schedule {
    /// Extracts the schedule from a configuration.
    pub fn from_config(config: &SamplerConfig) -> Self {
        Self {
            outer_iterations: config.outer_iterations,
            hidden_steps: config.hidden_steps,
            master_seed: config.seed_policy.master_seed,
            parallel: config.parallel,
            threads: config.threads,
        }
    }
}

/// Where checkpoints and the manifest go.
#[derive(Debug, Clone)]
pub struct OutputPlan {
    /// Root of the run's artefacts.
    pub run_directory: PathBuf,
    /// Configuration recorded in checkpoints and the manifest.
    pub config: SamplerConfig,
}

impl OutputPlan {
    /// `None` when the configuration names no run directory.
    pub fn from_config(config: &SamplerConfig) -> Option<Self> {
        config.output.run_directory.as_ref().map(|dir| Self {
            run_directory: dir.clone(),
            config: config.clone(),
        })
    }
}

/// External control over a run.
#[derive(Debug, Clone, Default)]
pub struct RunControl<'a> {
    /// Cooperative stop flag, checked between outer iterations.
    pub stop: Option<&'a AtomicBool>,
    /// Artefact output; nothing is written when absent.
    pub output: Option<OutputPlan>,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerRun {
    /// Final states by rank.
    pub final_states: Vec<ImpactState>,
    /// Temperatures by rank.
    pub temperatures: Vec<f64>,
    /// Acceptance fraction per move kind over all chains.
    pub acceptance_rates: std::collections::BTreeMap<String, f64>,
    /// Raw move counters over all chains.
    pub counters: MoveCounters,
    /// Exchange acceptance fraction per adjacent pair.
    pub exchange_acceptance: Vec<f64>,
    /// Outer iterations completed, including any resumed prefix.
    pub iterations_completed: usize,
    /// Whether the run ended on a stop request.
    pub stop_requested: bool,
    /// Checkpoints still on disk.
    pub checkpoints: Vec<PathBuf>,
    /// Manifest path, if written.
    pub manifest_path: Option<PathBuf>,
}

struct Progress {
    iteration: usize,
    index: Vec<usize>,
    exchanges: ExchangeStats,
}

/// Draws one starting state per rung: `dimension` impacts from the prior and
/// the reference noise amplitudes.
pub fn prior_initial_states(
    prior: &ImpactPrior,
    geometry: &dyn SurfaceGeometry,
    chains: usize,
    capacity: usize,
    bins: usize,
    dimension: usize,
    master_seed: u64,
) -> Result<Vec<ImpactState>, ImpactError> {
    (0..chains)
        .map(|slot| {
            let mut rng = RngHandle::from_seed(determinism::initial_seed(master_seed, slot));
            let events = (0..dimension)
                .map(|_| prior.draw_event(geometry, &mut rng))
                .collect();
            ImpactState::new(capacity, events, prior.reference().clone(), bins)
        })
        .collect()
}

/// Runs the replica-exchange sampler from fresh states (one per rung,
/// slot `i` starting at rank `i`).
pub fn run_sampler(
    context: SamplerContext<'_>,
    initial_states: Vec<ImpactState>,
    ladder: &Ladder,
    schedule: &Schedule,
    control: RunControl<'_>,
    sink: &mut dyn IterationSink,
) -> Result<SamplerRun, ImpactError> {
    if initial_states.len() != ladder.len() {
        return Err(ImpactError::Configuration(
            ErrorInfo::new("state-count", "one initial state is needed per temperature")
                .with_context("states", initial_states.len().to_string())
                .with_context("temperatures", ladder.len().to_string()),
        ));
    }
    if schedule.hidden_steps == 0 {
        return Err(ImpactError::config(
            "hidden-steps",
            "hidden_steps must be at least one",
        ));
    }
    let mut workspaces = Vec::with_capacity(initial_states.len());
    for mut state in initial_states {
        likelihood::score(context.scorer, &mut state)?;
        workspaces.push(ChainWorkspace::new(state));
    }
    let progress = Progress {
        iteration: 0,
        index: (0..ladder.len()).collect(),
        exchanges: ExchangeStats::new(ladder.len().saturating_sub(1)),
    };
    execute(context, workspaces, progress, ladder, schedule, control, sink)
}

/// Continues a run from a checkpoint. States are re-scored, so cached values
/// match an uninterrupted run exactly.
pub fn resume_sampler(
    context: SamplerContext<'_>,
    payload: &CheckpointPayload,
    control: RunControl<'_>,
    sink: &mut dyn IterationSink,
) -> Result<SamplerRun, ImpactError> {
    let ladder = Ladder::from_config(&payload.config.ladder)?;
    if payload.slots.len() != ladder.len() || payload.index.len() != ladder.len() {
        return Err(ImpactError::Serde(
            ErrorInfo::new("checkpoint-shape", "checkpoint does not match its ladder")
                .with_context("slots", payload.slots.len().to_string())
                .with_context("temperatures", ladder.len().to_string()),
        ));
    }
    let mut workspaces = Vec::with_capacity(payload.slots.len());
    for slot in &payload.slots {
        let mut state =
            ImpactState::from_parameters(&slot.parameters, payload.config.max_events, payload.bins)?;
        likelihood::score(context.scorer, &mut state)?;
        let mut workspace = ChainWorkspace::new(state);
        workspace.counters = slot.counters.clone();
        workspaces.push(workspace);
    }
    let mut schedule = Schedule::from_config(&payload.config);
    schedule.master_seed = payload.master_seed;
    let progress = Progress {
        iteration: payload.iteration,
        index: payload.index.clone(),
        exchanges: payload.exchanges.clone(),
    };
    let context = SamplerContext {
        reference_log_likelihood: payload.reference_log_likelihood,
        ..context
    };
    info!(iteration = payload.iteration, "resuming from checkpoint");
    execute(context, workspaces, progress, &ladder, &schedule, control, sink)
}

fn execute(
    context: SamplerContext<'_>,
    mut workspaces: Vec<ChainWorkspace>,
    mut progress: Progress,
    ladder: &Ladder,
    schedule: &Schedule,
    control: RunControl<'_>,
    sink: &mut dyn IterationSink,
) -> Result<SamplerRun, ImpactError> {
    let pool = match (schedule.parallel, schedule.threads) {
        (true, Some(threads)) => Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads.max(1))
                .build()
                .map_err(|err| ImpactError::config("thread-pool", err.to_string()))?,
        ),
        _ => None,
    };
    let temperatures = ladder.temperatures();
    let mut checkpoints = Vec::new();
    let mut stop_requested = false;

    info!(
        chains = temperatures.len(),
        start = progress.iteration,
        outer_iterations = schedule.outer_iterations,
        parallel = schedule.parallel,
        "starting sampler"
    );

    while progress.iteration < schedule.outer_iterations {
        if control.stop.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            stop_requested = true;
            info!(iteration = progress.iteration, "stop requested");
            break;
        }
        let iteration = progress.iteration;

        let mut slot_temperature = vec![1.0; workspaces.len()];
        for (rank, &slot) in progress.index.iter().enumerate() {
            slot_temperature[slot] = temperatures[rank];
        }
        let burst_one = |(slot, workspace): (usize, &mut ChainWorkspace)| {
            let mut rng =
                RngHandle::from_seed(determinism::chain_seed(schedule.master_seed, slot, iteration));
            chain::burst(
                context.scorer,
                context.engine,
                workspace,
                slot_temperature[slot],
                schedule.hidden_steps,
                &mut rng,
            )
        };
        if schedule.parallel {
            let mut run_all = || -> Result<(), ImpactError> {
                workspaces.par_iter_mut().enumerate().try_for_each(burst_one)
            };
            match &pool {
                Some(pool) => pool.install(run_all)?,
                None => run_all()?,
            }
        } else {
            for &slot in &progress.index {
                burst_one((slot, &mut workspaces[slot]))?;
            }
        }

        if let Some(lines) = context.lines {
            refine_spectra(context.scorer, lines, &mut workspaces, schedule.master_seed, iteration)?;
        }

        let log_likelihoods: Vec<f64> = workspaces
            .iter()
            .map(|workspace| workspace.current.log_likelihood())
            .collect();
        let exchanges_accepted = tempering::exchange_pass(
            temperatures,
            &mut progress.index,
            &log_likelihoods,
            schedule.master_seed,
            iteration,
            &mut progress.exchanges,
        );

        let record = build_record(
            iteration,
            &workspaces,
            &progress.index,
            temperatures,
            context.reference_log_likelihood,
            exchanges_accepted,
        );
        debug!(
            iteration,
            cold_log_likelihood = record.log_likelihoods.first().copied().unwrap_or(f64::NAN),
            cold_dimension = record.dimensions.first().copied().unwrap_or(0),
            exchanges_accepted,
            "outer iteration complete"
        );
        sink.record(&record)?;
        progress.iteration += 1;

        if let Some(plan) = &control.output {
            let interval = plan.config.checkpoint.interval;
            if interval > 0 && progress.iteration % interval == 0 {
                let path = write_checkpoint(
                    plan,
                    &workspaces,
                    &progress,
                    schedule.master_seed,
                    context.reference_log_likelihood,
                )?;
                info!(path = %path.display(), iteration = progress.iteration, "checkpoint written");
                checkpoints.push(path);
                checkpoint::enforce_retention(&mut checkpoints, plan.config.checkpoint.max_to_keep)?;
            }
        }
    }

    let mut counters = MoveCounters::default();
    for workspace in &workspaces {
        counters.merge(&workspace.counters);
    }
    let final_states: Vec<ImpactState> = progress
        .index
        .iter()
        .map(|&slot| workspaces[slot].current.clone())
        .collect();

    let manifest_path = match &control.output {
        Some(plan) => Some(write_manifest(
            plan,
            schedule.master_seed,
            &progress,
            stop_requested,
            &final_states,
            context.reference_log_likelihood,
            &checkpoints,
        )?),
        None => None,
    };

    info!(
        iterations = progress.iteration,
        stop_requested,
        reject_always = counters.reject_always,
        "sampler finished"
    );

    Ok(SamplerRun {
        final_states,
        temperatures: temperatures.to_vec(),
        acceptance_rates: counters.acceptance_rates(),
        counters,
        exchange_acceptance: progress.exchanges.acceptance_rates(),
        iterations_completed: progress.iteration,
        stop_requested,
        checkpoints,
        manifest_path,
    })
}

fn refine_spectra(
    scorer: &dyn StateScorer,
    lines: LineRefinement<'_>,
    workspaces: &mut [ChainWorkspace],
    master_seed: u64,
    iteration: usize,
) -> Result<(), ImpactError> {
    for (slot, workspace) in workspaces.iter_mut().enumerate() {
        let residual: Vec<Vec<Complex64>> = lines
            .observation
            .channels()
            .iter()
            .zip(workspace.current.signal())
            .map(|(data, signal)| data.iter().zip(signal).map(|(d, s)| d - s).collect())
            .collect();
        let mut rng =
            RngHandle::from_seed(determinism::refinement_seed(master_seed, slot, iteration));
        let Some(psd) = lines.provider.refine(
            lines.observation,
            &residual,
            workspace.current.spectrum(),
            &mut rng,
        ) else {
            continue;
        };
        workspace.current.spectrum_mut().install_external(&psd)?;
        likelihood::score(scorer, &mut workspace.current)?;
        debug!(slot, iteration, "spectrum refined");
    }
    Ok(())
}

fn build_record(
    iteration: usize,
    workspaces: &[ChainWorkspace],
    index: &[usize],
    temperatures: &[f64],
    reference: f64,
    exchanges_accepted: usize,
) -> IterationRecord {
    let by_rank = || index.iter().map(|&slot| &workspaces[slot].current);
    IterationRecord {
        iteration,
        log_likelihoods: by_rank().map(|state| state.log_likelihood() - reference).collect(),
        dimensions: by_rank().map(ImpactState::dimension).collect(),
        temperatures: temperatures.to_vec(),
        cold_chain: workspaces[index[0]].current.parameters(),
        exchanges_accepted,
    }
}

fn write_checkpoint(
    plan: &OutputPlan,
    workspaces: &[ChainWorkspace],
    progress: &Progress,
    master_seed: u64,
    reference_log_likelihood: f64,
) -> Result<PathBuf, ImpactError> {
    let bins = workspaces
        .first()
        .and_then(|workspace| workspace.current.signal().first())
        .map_or(0, Vec::len);
    let payload = CheckpointPayload {
        iteration: progress.iteration,
        config: plan.config.clone(),
        master_seed,
        bins,
        reference_log_likelihood,
        index: progress.index.clone(),
        slots: workspaces
            .iter()
            .map(|workspace| SlotCheckpoint {
                parameters: workspace.current.parameters(),
                counters: workspace.counters.clone(),
            })
            .collect(),
        exchanges: progress.exchanges.clone(),
    };
    let root = plan.run_directory.join(&plan.config.output.checkpoint_dir);
    let path = checkpoint::checkpoint_path(&root, progress.iteration);
    payload.store(&path)?;
    Ok(path)
}

fn write_manifest(
    plan: &OutputPlan,
    master_seed: u64,
    progress: &Progress,
    stop_requested: bool,
    final_states: &[ImpactState],
    reference_log_likelihood: f64,
    checkpoints: &[PathBuf],
) -> Result<PathBuf, ImpactError> {
    let run_dir = &plan.run_directory;
    let cold = final_states.first();
    let manifest = RunManifest {
        config: plan.config.clone(),
        config_hash: manifest::config_hash(&plan.config)?,
        master_seed,
        seed_label: plan.config.seed_policy.label.clone(),
        created_at: manifest::timestamp(),
        iterations_completed: progress.iteration,
        stop_requested,
        final_log_likelihood: cold
            .map_or(f64::NEG_INFINITY, |state| state.log_likelihood() - reference_log_likelihood),
        final_dimension: cold.map_or(0, ImpactState::dimension),
        checkpoints: checkpoints
            .iter()
            .filter_map(|path| path.strip_prefix(run_dir).ok().map(|rel| rel.to_path_buf()))
            .collect(),
    };
    let path = run_dir.join(&plan.config.output.manifest_file);
    manifest.write(&path)?;
    Ok(path)
}
