use impact_mcmc::{LadderPolicy, NoisePrior, SamplerConfig};

fn code(config: &SamplerConfig) -> String {
    config.validate().unwrap_err().info().code.clone()
}

#[test]
fn defaults_validate() {
    let config = SamplerConfig::default();
    config.validate().unwrap();
    assert_eq!(config.ladder.replicas, 10);
    assert_eq!(config.outer_iterations, 1000);
    assert!(config.output.run_directory.is_none());
}

#[test]
fn invalid_settings_report_stable_codes() {
    let mut config = SamplerConfig::default();
    config.ladder.replicas = 0;
    assert_eq!(code(&config), "zero-chains");

    let mut config = SamplerConfig::default();
    config.ladder.base_temperature = 2.0;
    assert_eq!(code(&config), "ladder-base");

    let mut config = SamplerConfig::default();
    config.ladder.policy = LadderPolicy::Manual {
        temperatures: vec![1.0, 3.0, 2.0],
    };
    assert_eq!(code(&config), "ladder-order");

    let mut config = SamplerConfig::default();
    config.hidden_steps = 0;
    assert_eq!(code(&config), "hidden-steps");

    let mut config = SamplerConfig::default();
    config.moves.birth = -0.1;
    assert_eq!(code(&config), "move-weight");

    let mut config = SamplerConfig::default();
    config.moves.parameter_update = 0.5;
    assert_eq!(code(&config), "move-weights-sum");

    let mut config = SamplerConfig::default();
    config.fixed_dimension = true;
    config.moves.parameter_update = 0.0;
    config.moves.birth = 0.5;
    config.moves.death = 0.5;
    assert_eq!(code(&config), "move-weights-fixed");

    let mut config = SamplerConfig::default();
    config.moves.noise_fraction = 1.5;
    assert_eq!(code(&config), "move-fraction");

    let mut config = SamplerConfig::default();
    config.steps.time = 0.0;
    assert_eq!(code(&config), "step-size");

    let mut config = SamplerConfig::default();
    config.prior.momentum_mean = f64::NAN;
    assert_eq!(code(&config), "momentum-mean");

    let mut config = SamplerConfig::default();
    config.prior.noise = NoisePrior::LogNormal { width: 0.0 };
    assert_eq!(code(&config), "noise-prior-width");

    let mut config = SamplerConfig::default();
    config.prior.noise = NoisePrior::Uniform {
        lower: 2.0,
        upper: 1.0,
    };
    assert_eq!(code(&config), "noise-prior-bounds");

    let mut config = SamplerConfig::default();
    config.threads = Some(0);
    assert_eq!(code(&config), "threads");
}

#[test]
fn partial_yaml_fills_defaults() {
    let yaml = r#"
outer_iterations: 50
ladder:
  replicas: 4
  policy:
    type: geometric
    ratio: 2.0
    hottest: 100.0
prior:
  noise:
    type: uniform
    lower: 0.5
    upper: 2.0
seed_policy:
  master_seed: 99
  label: smoke
"#;
    let config: SamplerConfig = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();
    assert_eq!(config.outer_iterations, 50);
    assert_eq!(config.hidden_steps, 10);
    assert_eq!(config.ladder.replicas, 4);
    assert_eq!(
        config.ladder.policy,
        LadderPolicy::Geometric {
            ratio: 2.0,
            hottest: Some(100.0)
        }
    );
    assert_eq!(
        config.prior.noise,
        NoisePrior::Uniform {
            lower: 0.5,
            upper: 2.0
        }
    );
    assert_eq!(config.prior.momentum_mean, 10.0);
    assert_eq!(config.seed_policy.master_seed, 99);
    assert_eq!(config.seed_policy.label.as_deref(), Some("smoke"));

    let ladder = impact_mcmc::Ladder::from_config(&config.ladder).unwrap();
    assert_eq!(ladder.temperatures(), &[1.0, 2.0, 4.0, 100.0]);
}

#[test]
fn load_reads_yaml_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sampler.yaml");
    std::fs::write(&path, "max_events: 3\nfixed_dimension: true\n").unwrap();
    let config = SamplerConfig::load(&path).unwrap();
    assert_eq!(config.max_events, 3);
    assert!(config.fixed_dimension);

    std::fs::write(&path, "ladder: [1, 2").unwrap();
    assert_eq!(SamplerConfig::load(&path).unwrap_err().info().code, "config-parse");

    let missing = dir.path().join("absent.yaml");
    assert_eq!(SamplerConfig::load(&missing).unwrap_err().info().code, "config-read");
}
