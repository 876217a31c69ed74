//! Externally characterised spectra installed in place of the parametric PSD.

use impact_core::{NoiseSpectrum, Observation, RngHandle, SpectralLineModel};
use num_complex::Complex64;

/// A spectrum characterised ahead of sampling (for instance by a separate
/// spectral-line fit), installed on every chain the first time it is offered.
#[derive(Debug, Clone)]
pub struct StaticSpectrum {
    psd: Vec<Vec<f64>>,
}

impl StaticSpectrum {
    /// Wraps one PSD row per channel.
    pub fn new(psd: Vec<Vec<f64>>) -> Self {
        Self { psd }
    }

    /// Rows that will be installed.
    pub fn psd(&self) -> &[Vec<f64>] {
        &self.psd
    }
}

impl SpectralLineModel for StaticSpectrum {
    fn refine(
        &self,
        _observation: &Observation,
        _residual: &[Vec<Complex64>],
        current: &NoiseSpectrum,
        _rng: &mut RngHandle,
    ) -> Option<Vec<Vec<f64>>> {
        if current.is_external() {
            None
        } else {
            Some(self.psd.clone())
        }
    }
}
