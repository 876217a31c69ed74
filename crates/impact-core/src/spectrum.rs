//! Cached per-channel noise spectral density.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, ImpactError};

/// Noise power spectral density per channel together with its inverse.
///
/// Each PSD entry is the variance `E|n_i|²` of the discrete frequency sample
/// in that bin. `external` records that the values were supplied by a
/// spectral-line model rather than built from noise parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseSpectrum {
    psd: Vec<Vec<f64>>,
    inverse: Vec<Vec<f64>>,
    external: bool,
}

impl NoiseSpectrum {
    /// Allocates a spectrum of `channels × bins`, initialised to unity.
    pub fn unit(channels: usize, bins: usize) -> Self {
        Self {
            psd: vec![vec![1.0; bins]; channels],
            inverse: vec![vec![1.0; bins]; channels],
            external: false,
        }
    }

    /// Builds a validated spectrum from explicit PSD arrays.
    pub fn from_psd(psd: Vec<Vec<f64>>) -> Result<Self, ImpactError> {
        let inverse = psd.iter().map(|row| vec![0.0; row.len()]).collect();
        let mut spectrum = Self {
            psd,
            inverse,
            external: false,
        };
        spectrum.refresh_inverse()?;
        Ok(spectrum)
    }

    /// PSD rows, one per channel.
    pub fn psd(&self) -> &[Vec<f64>] {
        &self.psd
    }

    /// Mutable PSD rows; call [`NoiseSpectrum::refresh_inverse`] afterwards.
    pub fn psd_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.psd
    }

    /// Inverse PSD rows, one per channel.
    pub fn inverse(&self) -> &[Vec<f64>] {
        &self.inverse
    }

    /// Whether the spectrum was supplied externally.
    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Deep copy that reuses this spectrum's buffers.
    pub fn copy_from(&mut self, other: &NoiseSpectrum) {
        self.psd.clone_from(&other.psd);
        self.inverse.clone_from(&other.inverse);
        self.external = other.external;
    }

    /// Replaces the PSD with externally characterised values. The rows must
    /// match the current shape; nothing changes when they do not.
    pub fn install_external(&mut self, psd: &[Vec<f64>]) -> Result<(), ImpactError> {
        if psd.len() != self.psd.len() {
            return Err(ImpactError::InvalidNoiseModel(
                ErrorInfo::new("psd-shape", "external spectrum has the wrong channel count")
                    .with_context("expected", self.psd.len().to_string())
                    .with_context("found", psd.len().to_string()),
            ));
        }
        for (channel, (row, source)) in self.psd.iter().zip(psd).enumerate() {
            if row.len() != source.len() {
                return Err(ImpactError::InvalidNoiseModel(
                    ErrorInfo::new("psd-shape", "external spectrum has the wrong bin count")
                        .with_context("channel", channel.to_string())
                        .with_context("expected", row.len().to_string())
                        .with_context("found", source.len().to_string()),
                ));
            }
        }
        for (row, source) in self.psd.iter_mut().zip(psd) {
            row.clone_from(source);
        }
        self.external = true;
        self.refresh_inverse()
    }

    /// Recomputes the inverse, rejecting non-positive or non-finite entries.
    pub fn refresh_inverse(&mut self) -> Result<(), ImpactError> {
        for (channel, (row, inverse)) in self.psd.iter().zip(self.inverse.iter_mut()).enumerate() {
            if inverse.len() != row.len() {
                inverse.resize(row.len(), 0.0);
            }
            for (bin, (&value, slot)) in row.iter().zip(inverse.iter_mut()).enumerate() {
                if !(value > 0.0 && value.is_finite()) {
                    return Err(ImpactError::InvalidNoiseModel(
                        ErrorInfo::new("psd-non-positive", "noise spectral density must be positive")
                            .with_context("channel", channel.to_string())
                            .with_context("bin", bin.to_string())
                            .with_context("value", value.to_string()),
                    ));
                }
                *slot = 1.0 / value;
            }
        }
        Ok(())
    }
}
