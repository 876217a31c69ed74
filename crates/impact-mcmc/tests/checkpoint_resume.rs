mod common;

use impact_mcmc::checkpoint::checkpoint_path;
use impact_mcmc::manifest::RunManifest;
use impact_mcmc::{
    resume_sampler, run_sampler, CheckpointPayload, DiscardRecords, IterationRecord, OutputPlan,
    RunControl, SamplerContext, Schedule,
};

#[test]
fn resumed_run_matches_uninterrupted_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut fx = common::fixture(4242);
    fx.config.outer_iterations = 20;
    fx.config.checkpoint.interval = 5;
    fx.config.output.run_directory = Some(dir.path().to_path_buf());

    let evaluator = fx.evaluator();
    let engine = fx.engine();
    let ladder = fx.ladder();
    let context = SamplerContext {
        scorer: &evaluator,
        engine: &engine,
        lines: None,
        reference_log_likelihood: -12.5,
    };
    let mut full_records: Vec<IterationRecord> = Vec::new();
    let full = run_sampler(
        context,
        vec![fx.injected_state(); ladder.len()],
        &ladder,
        &Schedule::from_config(&fx.config),
        RunControl {
            stop: None,
            output: OutputPlan::from_config(&fx.config),
        },
        &mut full_records,
    )
    .unwrap();
    assert_eq!(full.checkpoints.len(), 4);
    assert!(full.checkpoints.iter().all(|path| path.exists()));

    let root = dir.path().join(&fx.config.output.checkpoint_dir);
    let payload = CheckpointPayload::load(&checkpoint_path(&root, 10)).unwrap();
    assert_eq!(payload.iteration, 10);
    assert_eq!(payload.config, fx.config);
    assert_eq!(payload.reference_log_likelihood, -12.5);

    let mut resumed_records: Vec<IterationRecord> = Vec::new();
    let resumed = resume_sampler(
        SamplerContext {
            reference_log_likelihood: 0.0,
            ..context
        },
        &payload,
        RunControl::default(),
        &mut resumed_records,
    )
    .unwrap();

    assert_eq!(resumed.iterations_completed, 20);
    assert_eq!(resumed.final_states, full.final_states);
    assert_eq!(resumed.counters, full.counters);
    assert_eq!(resumed.acceptance_rates, full.acceptance_rates);
    assert_eq!(resumed.exchange_acceptance, full.exchange_acceptance);
    assert_eq!(resumed_records.as_slice(), &full_records[10..]);
}

#[test]
fn manifest_records_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut fx = common::fixture(8);
    fx.config.outer_iterations = 12;
    fx.config.checkpoint.interval = 2;
    fx.config.checkpoint.max_to_keep = 2;
    fx.config.seed_policy.label = Some("manifest-check".into());
    fx.config.output.run_directory = Some(dir.path().to_path_buf());

    let evaluator = fx.evaluator();
    let engine = fx.engine();
    let ladder = fx.ladder();
    let result = run_sampler(
        SamplerContext {
            scorer: &evaluator,
            engine: &engine,
            lines: None,
            reference_log_likelihood: 0.0,
        },
        vec![fx.empty_state(); ladder.len()],
        &ladder,
        &Schedule::from_config(&fx.config),
        RunControl {
            stop: None,
            output: OutputPlan::from_config(&fx.config),
        },
        &mut DiscardRecords,
    )
    .unwrap();

    assert_eq!(result.checkpoints.len(), 2);
    let root = dir.path().join("checkpoints");
    assert!(!checkpoint_path(&root, 8).exists());
    assert!(checkpoint_path(&root, 10).exists());
    assert!(checkpoint_path(&root, 12).exists());

    let manifest_path = result.manifest_path.clone().unwrap();
    assert_eq!(manifest_path, dir.path().join("manifest.json"));
    let manifest = RunManifest::load(&manifest_path).unwrap();
    assert_eq!(manifest.iterations_completed, 12);
    assert!(!manifest.stop_requested);
    assert_eq!(manifest.master_seed, 8);
    assert_eq!(manifest.seed_label.as_deref(), Some("manifest-check"));
    assert_eq!(manifest.config_hash.len(), 64);
    assert_eq!(manifest.final_dimension, result.final_states[0].dimension());
    assert_eq!(
        manifest.final_log_likelihood,
        result.final_states[0].log_likelihood()
    );
    assert_eq!(manifest.checkpoints.len(), 2);
    assert!(manifest.checkpoints.iter().all(|path| path.is_relative()));
}

#[test]
fn truncated_checkpoint_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut fx = common::fixture(3);
    fx.config.outer_iterations = 2;
    fx.config.checkpoint.interval = 1;
    fx.config.output.run_directory = Some(dir.path().to_path_buf());

    let evaluator = fx.evaluator();
    let engine = fx.engine();
    let ladder = fx.ladder();
    let context = SamplerContext {
        scorer: &evaluator,
        engine: &engine,
        lines: None,
        reference_log_likelihood: 0.0,
    };
    run_sampler(
        context,
        vec![fx.empty_state(); ladder.len()],
        &ladder,
        &Schedule::from_config(&fx.config),
        RunControl {
            stop: None,
            output: OutputPlan::from_config(&fx.config),
        },
        &mut DiscardRecords,
    )
    .unwrap();

    let path = checkpoint_path(&dir.path().join("checkpoints"), 1);
    let mut payload = CheckpointPayload::load(&path).unwrap();
    payload.slots.pop();
    let err = resume_sampler(context, &payload, RunControl::default(), &mut DiscardRecords)
        .unwrap_err();
    assert_eq!(err.info().code, "checkpoint-shape");

    std::fs::write(&path, "{ not json").unwrap();
    let err = CheckpointPayload::load(&path).unwrap_err();
    assert_eq!(err.info().code, "checkpoint-parse");
}
