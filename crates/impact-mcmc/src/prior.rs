//! Prior densities and prior draws for impacts and noise amplitudes.

use std::f64::consts::PI;

use impact_core::{
    ErrorInfo, ImpactError, ImpactEvent, NoiseComponent, NoiseParameters, RngHandle,
    SurfaceGeometry,
};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::config::{NoisePrior, PriorConfig};
use crate::state::ImpactState;

const LN_TWO_PI: f64 = 1.837_877_066_409_345_5;

/// Priors on every sampled quantity.
///
/// Impacts: `t0 ~ U[0, T)`, `P ~ Exp(mean μ)`, location uniform over the
/// surface and incidence uniform in `(cos θ, φ) ∈ (0, 1] × [0, 2π)`. Noise
/// amplitudes follow [`NoisePrior`] around per-channel reference values.
#[derive(Debug, Clone)]
pub struct ImpactPrior {
    duration: f64,
    momentum_mean: f64,
    noise: NoisePrior,
    reference: NoiseParameters,
}

impl ImpactPrior {
    /// Builds the prior for an observation of length `duration`.
    pub fn new(
        config: &PriorConfig,
        duration: f64,
        reference: NoiseParameters,
    ) -> Result<Self, ImpactError> {
        for (channel, amplitudes) in reference.channels.iter().enumerate() {
            for component in NoiseComponent::ALL {
                let value = amplitudes.get(component);
                if !(value > 0.0 && value.is_finite()) {
                    return Err(ImpactError::Configuration(
                        ErrorInfo::new("reference-noise", "reference amplitudes must be positive")
                            .with_context("channel", channel.to_string())
                            .with_context("component", format!("{component:?}"))
                            .with_context("value", value.to_string()),
                    ));
                }
            }
        }
        Ok(Self {
            duration,
            momentum_mean: config.momentum_mean,
            noise: config.noise,
            reference,
        })
    }

    /// Reference amplitudes the noise prior is centred on.
    pub fn reference(&self) -> &NoiseParameters {
        &self.reference
    }

    /// Log density of one impact; `−∞` outside the support.
    pub fn event_log_density(&self, event: &ImpactEvent, geometry: &dyn SurfaceGeometry) -> f64 {
        if !(0.0..self.duration).contains(&event.time) {
            return f64::NEG_INFINITY;
        }
        if !(event.momentum > 0.0 && event.momentum.is_finite()) {
            return f64::NEG_INFINITY;
        }
        if !(event.cos_incidence > 0.0 && event.cos_incidence <= 1.0)
            || !(0.0..2.0 * PI).contains(&event.azimuth)
        {
            return f64::NEG_INFINITY;
        }
        let density = geometry.face_area_density(event.face, &event.point);
        if density <= 0.0 {
            return f64::NEG_INFINITY;
        }
        -self.duration.ln() - self.momentum_mean.ln() - event.momentum / self.momentum_mean
            + density.ln()
            - (2.0 * PI).ln()
    }

    /// Log density of the noise amplitudes; `−∞` for non-positive values.
    pub fn noise_log_density(&self, noise: &NoiseParameters) -> f64 {
        let mut total = 0.0;
        for (amplitudes, reference) in noise.channels.iter().zip(&self.reference.channels) {
            for component in NoiseComponent::ALL {
                let value = amplitudes.get(component);
                let centre = reference.get(component);
                if !(value > 0.0 && value.is_finite()) {
                    return f64::NEG_INFINITY;
                }
                total += match self.noise {
                    NoisePrior::LogNormal { width } => {
                        let z = (value / centre).ln() / width;
                        -value.ln() - width.ln() - 0.5 * LN_TWO_PI - 0.5 * z * z
                    }
                    NoisePrior::Uniform { lower, upper } => {
                        if value < lower * centre || value > upper * centre {
                            return f64::NEG_INFINITY;
                        }
                        -((upper - lower) * centre).ln()
                    }
                };
            }
        }
        total
    }

    /// Log prior of a whole state.
    pub fn log_prior(&self, state: &ImpactState, geometry: &dyn SurfaceGeometry) -> f64 {
        let mut total = self.noise_log_density(state.noise());
        for event in state.events() {
            if total == f64::NEG_INFINITY {
                break;
            }
            total += self.event_log_density(event, geometry);
        }
        total
    }

    /// Draws one impact from the prior.
    pub fn draw_event(&self, geometry: &dyn SurfaceGeometry, rng: &mut RngHandle) -> ImpactEvent {
        impact_core::draw_impact(geometry, self.duration, self.momentum_mean, rng)
    }

    /// Draws noise amplitudes for every channel from the prior.
    pub fn draw_noise(&self, rng: &mut RngHandle) -> NoiseParameters {
        let mut noise = self.reference.clone();
        for amplitudes in noise.channels.iter_mut() {
            for component in NoiseComponent::ALL {
                let value = amplitudes.get_mut(component);
                *value *= match self.noise {
                    NoisePrior::LogNormal { width } => {
                        let z: f64 = rng.inner_mut().sample(StandardNormal);
                        (width * z).exp()
                    }
                    NoisePrior::Uniform { lower, upper } => lower + (upper - lower) * rng.uniform(),
                };
            }
        }
        noise
    }
}
