#![deny(missing_docs)]
#![doc = "Core types, collaborator traits and error taxonomy for the impact sampler."]

use nalgebra::Vector3;
use num_complex::Complex64;

mod draw;
pub mod errors;
pub mod observation;
pub mod rng;
pub mod spectrum;
mod types;

pub use draw::draw_impact;
pub use errors::{ErrorInfo, ImpactError};
pub use observation::{FrequencyGrid, Observation};
pub use rng::{derive_substream_seed, RngHandle};
pub use spectrum::NoiseSpectrum;
pub use types::{
    ChannelNoise, FaceFrame, FaceId, ImpactEvent, NoiseComponent, NoiseParameters, SurfacePoint,
};

/// Physical impulse-response model mapping an impact to a sensor signal.
///
/// Implementations must be pure: the same inputs always produce the same
/// contribution.
pub trait WaveformModel: Send + Sync {
    /// Number of sensing channels the model produces.
    fn num_channels(&self) -> usize;

    /// Adds the frequency-domain contribution of `event` on `channel` into
    /// `out`, which spans every bin of `grid`.
    fn respond(
        &self,
        channel: usize,
        frame: &FaceFrame,
        event: &ImpactEvent,
        grid: &FrequencyGrid,
        out: &mut [Complex64],
    );
}

/// Spacecraft surface description used for the location prior.
pub trait SurfaceGeometry: Send + Sync {
    /// Number of faces.
    fn face_count(&self) -> usize;

    /// Total exposed area in square metres.
    fn total_area(&self) -> f64;

    /// Frame of a face, or `None` for an unknown identifier.
    fn face_frame(&self, face: FaceId) -> Option<FaceFrame>;

    /// Draws a point uniformly over the surface: the face with probability
    /// proportional to its area, then a uniform point within it.
    fn sample_surface_point(&self, rng: &mut RngHandle) -> SurfacePoint;

    /// Maps a face coordinate into the body frame. The result lies in the
    /// face plane but may fall outside the face boundary.
    fn surface_point(&self, face: FaceId, map: [f64; 2]) -> Option<Vector3<f64>>;

    /// Prior density of `point` on `face`; exactly the inverse of
    /// [`SurfaceGeometry::sample_surface_point`], zero off the face.
    fn face_area_density(&self, face: FaceId, point: &Vector3<f64>) -> f64;
}

/// Builds the parametric noise spectral density from noise parameters.
pub trait NoiseModel: Send + Sync {
    /// Writes one PSD row per channel, covering every bin of `grid`.
    fn build_psd(&self, noise: &NoiseParameters, grid: &FrequencyGrid, psd: &mut [Vec<f64>]);
}

/// Pluggable provider of refined noise spectra (spectral-line modelling).
///
/// Invoked between outer iterations; returning `Some` replaces the chain's
/// parametric spectrum with the supplied rows.
pub trait SpectralLineModel: Send + Sync {
    /// Proposes a refined PSD from the current residual `data − signal`.
    fn refine(
        &self,
        observation: &Observation,
        residual: &[Vec<Complex64>],
        current: &NoiseSpectrum,
        rng: &mut RngHandle,
    ) -> Option<Vec<Vec<f64>>>;
}
