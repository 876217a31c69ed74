//! The impact prior draw shared by the sampler and the data simulator.

use std::f64::consts::PI;

use rand::Rng;
use rand_distr::Exp1;

use crate::{ImpactEvent, RngHandle, SurfaceGeometry};

/// Draws one impact from the prior: `t0 ~ U[0, window)`, momentum
/// exponential with mean `momentum_mean` (µN·s), an area-weighted surface
/// point and incidence uniform in `(cos θ, φ) ∈ (0, 1] × [0, 2π)`.
///
/// `momentum_mean` is not validated here.
pub fn draw_impact(
    geometry: &dyn SurfaceGeometry,
    window: f64,
    momentum_mean: f64,
    rng: &mut RngHandle,
) -> ImpactEvent {
    let time = window * rng.uniform();
    let exponential: f64 = rng.inner_mut().sample(Exp1);
    let surface = geometry.sample_surface_point(rng);
    let cos_incidence = 1.0 - rng.uniform();
    let azimuth = 2.0 * PI * rng.uniform();
    ImpactEvent::at(surface, time, momentum_mean * exponential, cos_incidence, azimuth)
}
