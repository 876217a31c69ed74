#![deny(missing_docs)]
#![doc = "Reference collaborators for the impact sampler: spacecraft surface, rigid-body response, parametric noise and data simulation."]

pub mod geometry;
pub mod lines;
pub mod noise;
pub mod simulate;
pub mod waveform;

pub use geometry::PrismSpacecraft;
pub use lines::StaticSpectrum;
pub use noise::{nominal_channel_noise, NoiseCoupling, ParametricNoise};
pub use simulate::{
    draw_injection, optimal_snr, simulate_observation, synthesize_signal, Injection, SimulatedData,
};
pub use waveform::{DegreesOfFreedom, MassProperties, RigidBodyResponse, MOMENTUM_UNIT};
