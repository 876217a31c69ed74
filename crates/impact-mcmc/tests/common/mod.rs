#![allow(dead_code)]

use impact_core::{FaceId, FrequencyGrid, ImpactEvent, NoiseParameters, RngHandle, SurfaceGeometry};
use impact_mcmc::{
    ImpactPrior, ImpactState, Ladder, LadderConfig, LadderPolicy, LikelihoodEvaluator,
    ProposalEngine, SamplerConfig,
};
use impact_model::{
    nominal_channel_noise, simulate_observation, DegreesOfFreedom, Injection, MassProperties,
    NoiseCoupling, ParametricNoise, PrismSpacecraft, RigidBodyResponse, SimulatedData,
};

pub const CHANNELS: usize = 3;

pub struct Fixture {
    pub grid: FrequencyGrid,
    pub craft: PrismSpacecraft,
    pub response: RigidBodyResponse,
    pub noise_model: ParametricNoise,
    pub reference: NoiseParameters,
    pub injection: Injection,
    pub data: SimulatedData,
    pub config: SamplerConfig,
}

pub fn fixture(seed: u64) -> Fixture {
    let grid = FrequencyGrid::new(256.0, 1.0, 1.0 / 64.0, 0.5).unwrap();
    let craft = PrismSpacecraft::octagon(1.0, 0.8).unwrap();
    let response = RigidBodyResponse::new(MassProperties::default(), DegreesOfFreedom::Three).unwrap();
    let noise_model = ParametricNoise::new(
        MassProperties::default(),
        NoiseCoupling::default(),
        DegreesOfFreedom::Three,
    );
    let reference = NoiseParameters::uniform(CHANNELS, nominal_channel_noise());

    let surface = craft.sample_surface_point(&mut RngHandle::from_seed(seed));
    let injection = Injection {
        events: vec![ImpactEvent::at(surface, 100.0, 20.0, 0.8, 1.0)],
        noise: reference.clone(),
    };
    let data = simulate_observation(
        &grid,
        &response,
        &craft,
        &noise_model,
        &injection,
        &mut RngHandle::from_seed(seed ^ 0xDA7A),
    )
    .unwrap();

    let mut config = SamplerConfig::default();
    config.outer_iterations = 100;
    config.hidden_steps = 10;
    config.max_events = 4;
    config.ladder = LadderConfig {
        replicas: 10,
        base_temperature: 1.0,
        policy: LadderPolicy::Geometric {
            ratio: 1.5,
            hottest: None,
        },
    };
    config.seed_policy.master_seed = seed;

    Fixture {
        grid,
        craft,
        response,
        noise_model,
        reference,
        injection,
        data,
        config,
    }
}

impl Fixture {
    pub fn prior(&self) -> ImpactPrior {
        ImpactPrior::new(&self.config.prior, self.grid.duration, self.reference.clone()).unwrap()
    }

    pub fn evaluator(&self) -> LikelihoodEvaluator<'_> {
        LikelihoodEvaluator::new(
            &self.data.observation,
            &self.response,
            &self.craft,
            &self.noise_model,
            self.prior(),
        )
        .unwrap()
        .with_sample_prior(self.config.sample_prior)
    }

    pub fn engine(&self) -> ProposalEngine<'_> {
        ProposalEngine::new(&self.config, &self.craft, self.prior())
    }

    pub fn ladder(&self) -> Ladder {
        Ladder::from_config(&self.config.ladder).unwrap()
    }

    pub fn empty_state(&self) -> ImpactState {
        ImpactState::new(
            self.config.max_events,
            Vec::new(),
            self.reference.clone(),
            self.grid.bins,
        )
        .unwrap()
    }

    pub fn injected_state(&self) -> ImpactState {
        ImpactState::new(
            self.config.max_events,
            self.injection.events.clone(),
            self.reference.clone(),
            self.grid.bins,
        )
        .unwrap()
    }

    pub fn face_count(&self) -> usize {
        self.craft.face_count()
    }
}

pub fn first_face() -> FaceId {
    FaceId::from_raw(0)
}
