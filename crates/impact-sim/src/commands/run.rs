use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use impact_core::{ImpactEvent, RngHandle};
use impact_mcmc::metrics::{ColdChainSummary, Tee};
use impact_mcmc::{
    prior_initial_states, resume_sampler, run_sampler, score, CheckpointPayload,
    DiagnosticsRecorder, ImpactPrior, ImpactState, Ladder, LikelihoodEvaluator, LineRefinement,
    OutputPlan, ProposalEngine, RunControl, SamplerContext, SamplerRun, Schedule,
};
use impact_model::{simulate_observation, StaticSpectrum};
use serde::Serialize;
use tracing::info;

use crate::chains::ChainWriter;
use crate::config::CliConfig;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML configuration describing the observation and the sampler.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for chain files, checkpoints and the manifest.
    #[arg(long)]
    pub out: PathBuf,
    /// Continue from a checkpoint written by an earlier run with this config.
    #[arg(long)]
    pub resume: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    injected_events: Vec<ImpactEvent>,
    injection_snr: f64,
    reference_log_likelihood: f64,
    iterations_completed: usize,
    stop_requested: bool,
    temperatures: Vec<f64>,
    acceptance_rates: std::collections::BTreeMap<String, f64>,
    exchange_acceptance: Vec<f64>,
    reject_always: u64,
    cold_chain: ColdChainSummary,
    final_log_likelihood: f64,
    final_events: Vec<ImpactEvent>,
    manifest: Option<PathBuf>,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let mut config = CliConfig::load(&args.config)?;
    let payload = match &args.resume {
        Some(path) => {
            let payload = CheckpointPayload::load(path)?;
            config.sampler = payload.config.clone();
            Some(payload)
        }
        None => None,
    };
    config.sampler.output.run_directory = Some(args.out.clone());
    config.sampler.validate()?;

    let physics = config.physics()?;
    let injection = config.injection(&physics)?;
    let data = simulate_observation(
        &physics.grid,
        &physics.response,
        &physics.craft,
        &physics.noise_model,
        &injection,
        &mut RngHandle::from_seed(config.injection.noise_seed),
    )?;

    let prior = || {
        ImpactPrior::new(
            &config.sampler.prior,
            physics.grid.duration,
            physics.reference.clone(),
        )
    };
    let evaluator = LikelihoodEvaluator::new(
        &data.observation,
        &physics.response,
        &physics.craft,
        &physics.noise_model,
        prior()?,
    )?
    .with_sample_prior(config.sampler.sample_prior);
    let engine = ProposalEngine::new(&config.sampler, &physics.craft, prior()?);
    let ladder = Ladder::from_config(&config.sampler.ladder)?;

    let (reference_log_likelihood, injection_snr) =
        score_injection(&evaluator, &config, &injection.events, physics.grid.bins, &injection.noise)?;
    info!(
        events = injection.events.len(),
        snr = injection_snr,
        reference_log_likelihood,
        "simulated observation"
    );

    let static_spectrum = StaticSpectrum::new(data.spectrum.psd().to_vec());
    let lines = config.static_spectrum.then_some(LineRefinement {
        provider: &static_spectrum,
        observation: &data.observation,
    });
    let context = SamplerContext {
        scorer: &evaluator,
        engine: &engine,
        lines,
        reference_log_likelihood,
    };
    let control = RunControl {
        stop: None,
        output: OutputPlan::from_config(&config.sampler),
    };

    let resume_from = payload.as_ref().map(|payload| payload.iteration);
    let mut chains = ChainWriter::create(&args.out, injection.noise.clone(), resume_from)?;
    let mut diagnostics = DiagnosticsRecorder::new();
    let result = {
        let mut sink = Tee(&mut chains, &mut diagnostics);
        match &payload {
            Some(payload) => resume_sampler(context, payload, control, &mut sink)?,
            None => {
                let states = prior_initial_states(
                    evaluator.prior(),
                    &physics.craft,
                    ladder.len(),
                    config.sampler.max_events,
                    physics.grid.bins,
                    0,
                    config.sampler.seed_policy.master_seed,
                )?;
                run_sampler(
                    context,
                    states,
                    &ladder,
                    &Schedule::from_config(&config.sampler),
                    control,
                    &mut sink,
                )?
            }
        }
    };
    chains.flush()?;

    let summary = summarize(
        &result,
        &diagnostics,
        injection.events,
        injection_snr,
        reference_log_likelihood,
    );
    write_json(args.out.join("summary.json"), &summary)?;
    fs::write(args.out.join("config.yaml"), serde_yaml::to_string(&config)?)?;
    Ok(())
}

fn score_injection(
    evaluator: &LikelihoodEvaluator<'_>,
    config: &CliConfig,
    events: &[ImpactEvent],
    bins: usize,
    noise: &impact_core::NoiseParameters,
) -> Result<(f64, f64), Box<dyn Error>> {
    let capacity = config.sampler.max_events.max(events.len());
    let mut state = ImpactState::new(capacity, events.to_vec(), noise.clone(), bins)?;
    score(evaluator, &mut state)?;
    Ok((state.log_likelihood(), evaluator.snr(&state)))
}

fn summarize(
    result: &SamplerRun,
    diagnostics: &DiagnosticsRecorder,
    injected_events: Vec<ImpactEvent>,
    injection_snr: f64,
    reference_log_likelihood: f64,
) -> RunSummary {
    let cold = result.final_states.first();
    RunSummary {
        injected_events,
        injection_snr,
        reference_log_likelihood,
        iterations_completed: result.iterations_completed,
        stop_requested: result.stop_requested,
        temperatures: result.temperatures.clone(),
        acceptance_rates: result.acceptance_rates.clone(),
        exchange_acceptance: result.exchange_acceptance.clone(),
        reject_always: result.counters.reject_always,
        cold_chain: diagnostics.summary(),
        final_log_likelihood: cold.map_or(f64::NEG_INFINITY, |state| {
            state.log_likelihood() - reference_log_likelihood
        }),
        final_events: cold.map(|state| state.events().to_vec()).unwrap_or_default(),
        manifest: result.manifest_path.clone(),
    }
}

fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{IMPACT_CHAIN, LOGL_CHAIN, NOISE_CHAIN};

    const CONFIG: &str = "\
observation:
  duration: 256.0
  cadence: 1.0
  fmin: 0.015625
  fmax: 0.5
injection:
  events:
    - { face: 1, map: [0.2, -0.1], time: 100.0, momentum: 25.0, cos_incidence: 0.7, azimuth: 2.1 }
sampler:
  outer_iterations: 20
  hidden_steps: 5
  max_events: 3
  ladder:
    replicas: 3
  parallel: false
  checkpoint:
    interval: 5
    max_to_keep: 4
";

    fn chain_files(dir: &Path) -> Vec<String> {
        [NOISE_CHAIN, IMPACT_CHAIN, LOGL_CHAIN]
            .iter()
            .map(|name| fs::read_to_string(dir.join(name)).unwrap())
            .collect()
    }

    #[test]
    fn resumed_run_rewrites_chains_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("run.yaml");
        fs::write(&config, CONFIG).unwrap();
        let out = dir.path().join("out");

        let mut args = RunArgs {
            config,
            out: out.clone(),
            resume: None,
        };
        run(&args).unwrap();
        let uninterrupted = chain_files(&out);
        assert_eq!(uninterrupted[2].lines().count(), 20);
        assert_eq!(uninterrupted[0].lines().count(), 20);

        args.resume = Some(out.join("checkpoints").join("ckpt_000010.json"));
        run(&args).unwrap();
        let resumed = chain_files(&out);
        assert_eq!(resumed[2].lines().count(), 20);
        assert_eq!(resumed[0].lines().count(), 20);
        let last_iteration = resumed[1]
            .lines()
            .filter_map(|row| row.split_whitespace().next()?.parse::<usize>().ok())
            .max();
        assert!(last_iteration.map_or(true, |iteration| iteration < 20));
        assert_eq!(resumed, uninterrupted);
    }
}
