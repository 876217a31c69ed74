//! Immutable frequency-domain observation shared by every chain.

use std::ops::Range;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, ImpactError};

/// Frequency bins of an observation and the analysed band `[imin, imax)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyGrid {
    /// Observation duration in seconds.
    pub duration: f64,
    /// Sampling cadence in seconds.
    pub cadence: f64,
    /// Number of frequency bins stored per channel.
    pub bins: usize,
    /// First analysed bin.
    pub imin: usize,
    /// One past the last analysed bin.
    pub imax: usize,
}

impl FrequencyGrid {
    /// Builds the grid for a segment of `duration` seconds sampled every
    /// `cadence` seconds, analysed between `fmin` and `fmax` Hz.
    pub fn new(duration: f64, cadence: f64, fmin: f64, fmax: f64) -> Result<Self, ImpactError> {
        if !(duration > 0.0 && cadence > 0.0 && duration.is_finite() && cadence.is_finite()) {
            return Err(ImpactError::Configuration(
                ErrorInfo::new("grid-timing", "duration and cadence must be positive")
                    .with_context("duration", duration.to_string())
                    .with_context("cadence", cadence.to_string()),
            ));
        }
        let bins = ((duration / cadence) as usize) / 2;
        let imin = (fmin * duration).floor().max(0.0) as usize;
        let imax = ((fmax * duration).floor().max(0.0) as usize).min(bins);
        if imin >= imax {
            return Err(ImpactError::Configuration(
                ErrorInfo::new("grid-band", "analysed band is empty")
                    .with_context("imin", imin.to_string())
                    .with_context("imax", imax.to_string())
                    .with_hint("check fmin < fmax <= Nyquist"),
            ));
        }
        Ok(Self {
            duration,
            cadence,
            bins,
            imin,
            imax,
        })
    }

    /// Frequency resolution `1/T`.
    pub fn df(&self) -> f64 {
        1.0 / self.duration
    }

    /// Frequency of bin `i` in Hz.
    pub fn frequency(&self, i: usize) -> f64 {
        i as f64 / self.duration
    }

    /// Analysed bin range.
    pub fn band(&self) -> Range<usize> {
        self.imin..self.imax
    }
}

/// Per-channel complex frequency samples. Never mutated by the sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    grid: FrequencyGrid,
    channels: Vec<Vec<Complex64>>,
}

impl Observation {
    /// Wraps channel data, checking every channel covers the grid.
    pub fn new(grid: FrequencyGrid, channels: Vec<Vec<Complex64>>) -> Result<Self, ImpactError> {
        if channels.is_empty() {
            return Err(ImpactError::config(
                "observation-empty",
                "observation has no channels",
            ));
        }
        for (index, channel) in channels.iter().enumerate() {
            if channel.len() != grid.bins {
                return Err(ImpactError::Configuration(
                    ErrorInfo::new("observation-length", "channel length does not match grid")
                        .with_context("channel", index.to_string())
                        .with_context("expected", grid.bins.to_string())
                        .with_context("actual", channel.len().to_string()),
                ));
            }
        }
        Ok(Self { grid, channels })
    }

    /// Frequency grid of the observation.
    pub fn grid(&self) -> &FrequencyGrid {
        &self.grid
    }

    /// Number of sensing channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples for one channel.
    pub fn channel(&self, index: usize) -> &[Complex64] {
        &self.channels[index]
    }

    /// Samples for every channel.
    pub fn channels(&self) -> &[Vec<Complex64>] {
        &self.channels
    }
}
