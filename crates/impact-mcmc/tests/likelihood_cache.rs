mod common;

use impact_core::{ImpactError, RngHandle};
use impact_mcmc::{score, Move, ProposalEngine, StateScorer};
use impact_model::optimal_snr;

#[test]
fn recomputed_score_matches_cache() {
    let fx = common::fixture(7);
    let evaluator = fx.evaluator();
    let mut state = fx.injected_state();
    score(&evaluator, &mut state).unwrap();
    let cached = state.log_likelihood();
    assert!(cached.is_finite());

    let mut copy = fx.empty_state();
    copy.copy_from(&state);
    let recomputed = evaluator.log_likelihood(&mut copy).unwrap();
    assert_eq!(cached, recomputed);
    assert_eq!(state.log_prior(), evaluator.log_prior(&copy));
}

#[test]
fn injection_outscores_empty_model() {
    let fx = common::fixture(7);
    let evaluator = fx.evaluator();
    let mut injected = fx.injected_state();
    let mut empty = fx.empty_state();
    score(&evaluator, &mut injected).unwrap();
    score(&evaluator, &mut empty).unwrap();
    assert!(injected.log_likelihood() > empty.log_likelihood());
}

fn forced_engine(fx: &common::Fixture, birth: f64, death: f64) -> ProposalEngine<'_> {
    let mut config = fx.config.clone();
    config.moves.parameter_update = 0.0;
    config.moves.birth = birth;
    config.moves.death = death;
    ProposalEngine::new(&config, &fx.craft, fx.prior())
}

#[test]
fn birth_then_death_restores_state_exactly() {
    let fx = common::fixture(11);
    let evaluator = fx.evaluator();
    let births = forced_engine(&fx, 1.0, 0.0);
    let deaths = forced_engine(&fx, 0.0, 1.0);
    let mut rng = RngHandle::from_seed(5);

    let mut start = fx.injected_state();
    score(&evaluator, &mut start).unwrap();

    let mut born = fx.empty_state();
    let proposal = births.propose(&start, &mut born, &mut rng);
    assert_eq!(proposal.chosen, Move::Birth);
    assert_eq!(proposal.log_hastings, 0.0);
    assert_eq!(born.dimension(), start.dimension() + 1);
    assert_eq!(&born.events()[..start.dimension()], start.events());
    score(&evaluator, &mut born).unwrap();
    assert_ne!(born.log_likelihood(), start.log_likelihood());

    let newest = born.dimension() - 1;
    let mut restored = fx.empty_state();
    let mut attempts = 0;
    loop {
        let proposal = deaths.propose(&born, &mut restored, &mut rng);
        assert_eq!(proposal.log_hastings, 0.0);
        let Move::Death { index } = proposal.chosen else {
            panic!("expected a death move, got {:?}", proposal.chosen);
        };
        assert!(index < born.dimension());
        assert_eq!(restored.dimension(), start.dimension());
        if index == newest {
            break;
        }
        attempts += 1;
        assert!(attempts < 1000, "death never chose the newest impact");
    }
    score(&evaluator, &mut restored).unwrap();

    assert_eq!(restored.events(), start.events());
    assert_eq!(restored.noise(), start.noise());
    assert_eq!(restored.spectrum(), start.spectrum());
    assert_eq!(restored.signal(), start.signal());
    assert_eq!(restored.log_likelihood(), start.log_likelihood());
    assert_eq!(restored.log_prior(), start.log_prior());
    assert_eq!(restored, start);
}

#[test]
fn zero_noise_amplitude_surfaces_invalid_noise_model() {
    let fx = common::fixture(3);
    let evaluator = fx.evaluator();
    let mut state = fx.empty_state();
    state.noise_mut().channels[1].thruster = 0.0;
    let err = score(&evaluator, &mut state).unwrap_err();
    assert!(matches!(err, ImpactError::InvalidNoiseModel(_)), "{err}");
    assert_eq!(err.info().context.get("channel").map(String::as_str), Some("1"));
    assert_eq!(err.info().context.get("bin").map(String::as_str), Some("0"));
}

#[test]
fn out_of_support_impacts_have_zero_prior() {
    let fx = common::fixture(3);
    let evaluator = fx.evaluator();
    let mut state = fx.injected_state();
    state.event_mut(0).unwrap().time = fx.grid.duration;
    assert_eq!(evaluator.log_prior(&state), f64::NEG_INFINITY);

    let mut state = fx.injected_state();
    state.event_mut(0).unwrap().cos_incidence = 0.0;
    assert_eq!(evaluator.log_prior(&state), f64::NEG_INFINITY);

    let mut state = fx.injected_state();
    state.event_mut(0).unwrap().point.z += 5.0;
    assert_eq!(evaluator.log_prior(&state), f64::NEG_INFINITY);
}

#[test]
fn sample_prior_mode_fixes_likelihood() {
    let mut fx = common::fixture(3);
    fx.config.sample_prior = true;
    let evaluator = fx.evaluator();
    let mut state = fx.injected_state();
    score(&evaluator, &mut state).unwrap();
    assert_eq!(state.log_likelihood(), 0.0);
    assert!(state.log_prior().is_finite());
}

#[test]
fn snr_agrees_with_simulation() {
    let fx = common::fixture(5);
    let evaluator = fx.evaluator();
    let mut state = fx.injected_state();
    score(&evaluator, &mut state).unwrap();
    let expected = optimal_snr(&fx.data.signal, &fx.data.spectrum, &fx.grid);
    let snr = evaluator.snr(&state);
    assert!(snr > 0.0);
    assert!((snr - expected).abs() < 1e-9 * expected);
}
