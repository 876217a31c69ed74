//! Injection drawing and synthetic data generation.

use impact_core::{
    draw_impact, ErrorInfo, FrequencyGrid, ImpactError, ImpactEvent, NoiseModel,
    NoiseParameters, NoiseSpectrum, Observation, RngHandle, SurfaceGeometry, WaveformModel,
};
use num_complex::Complex64;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Ground truth used to synthesise an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Injection {
    /// Injected impacts.
    pub events: Vec<ImpactEvent>,
    /// Noise parameters the data were drawn with.
    pub noise: NoiseParameters,
}

/// Synthetic observation together with the quantities it was built from.
#[derive(Debug, Clone)]
pub struct SimulatedData {
    /// Signal plus noise.
    pub observation: Observation,
    /// Spectrum of the injected noise.
    pub spectrum: NoiseSpectrum,
    /// Noise-free signal per channel.
    pub signal: Vec<Vec<Complex64>>,
}

/// Draws `count` impacts from the sampler's impact prior
/// ([`impact_core::draw_impact`]) over `[0, window)` with the given
/// momentum mean (µN·s).
pub fn draw_injection(
    geometry: &dyn SurfaceGeometry,
    count: usize,
    window: f64,
    momentum_mean: f64,
    rng: &mut RngHandle,
) -> Result<Vec<ImpactEvent>, ImpactError> {
    if !(momentum_mean > 0.0 && momentum_mean.is_finite()) {
        return Err(ImpactError::Configuration(
            ErrorInfo::new("momentum-mean", "injection momentum mean must be positive")
                .with_context("value", momentum_mean.to_string()),
        ));
    }
    Ok((0..count)
        .map(|_| draw_impact(geometry, window, momentum_mean, rng))
        .collect())
}

/// Coherent sum of every event's response, one row per channel spanning all
/// bins of `grid`. Events on unknown faces contribute nothing.
pub fn synthesize_signal(
    waveform: &dyn WaveformModel,
    geometry: &dyn SurfaceGeometry,
    events: &[ImpactEvent],
    grid: &FrequencyGrid,
) -> Vec<Vec<Complex64>> {
    let mut signal = vec![vec![Complex64::new(0.0, 0.0); grid.bins]; waveform.num_channels()];
    for event in events {
        let Some(frame) = geometry.face_frame(event.face) else {
            continue;
        };
        for (channel, row) in signal.iter_mut().enumerate() {
            waveform.respond(channel, &frame, event, grid, row);
        }
    }
    signal
}

/// Builds an observation of the injection: complex Gaussian noise whose real
/// and imaginary parts each carry half the PSD variance, plus the signal.
pub fn simulate_observation(
    grid: &FrequencyGrid,
    waveform: &dyn WaveformModel,
    geometry: &dyn SurfaceGeometry,
    noise_model: &dyn NoiseModel,
    injection: &Injection,
    rng: &mut RngHandle,
) -> Result<SimulatedData, ImpactError> {
    let channels = waveform.num_channels();
    if injection.noise.len() != channels {
        return Err(ImpactError::config(
            "injection-channels",
            format!(
                "injection has noise parameters for {} channels, waveform produces {channels}",
                injection.noise.len()
            ),
        ));
    }
    let mut psd = vec![vec![0.0; grid.bins]; channels];
    noise_model.build_psd(&injection.noise, grid, &mut psd);
    let spectrum = NoiseSpectrum::from_psd(psd)?;

    let signal = synthesize_signal(waveform, geometry, &injection.events, grid);
    let mut data = signal.clone();
    for (row, variance) in data.iter_mut().zip(spectrum.psd()) {
        for (value, s) in row.iter_mut().zip(variance) {
            let normal = Normal::new(0.0, (0.5 * s).sqrt()).map_err(|err| {
                ImpactError::config("noise-variance", format!("invalid noise variance: {err}"))
            })?;
            let re = normal.sample(rng.inner_mut());
            let im = normal.sample(rng.inner_mut());
            *value += Complex64::new(re, im);
        }
    }

    Ok(SimulatedData {
        observation: Observation::new(grid.clone(), data)?,
        spectrum,
        signal,
    })
}

/// Optimal signal-to-noise ratio `√⟨s|s⟩` summed over channels, restricted to
/// the analysed band.
pub fn optimal_snr(signal: &[Vec<Complex64>], spectrum: &NoiseSpectrum, grid: &FrequencyGrid) -> f64 {
    let band = grid.band();
    signal
        .iter()
        .zip(spectrum.inverse())
        .map(|(row, inverse)| {
            row[band.clone()]
                .iter()
                .zip(&inverse[band.clone()])
                .map(|(s, w)| 2.0 * s.norm_sqr() * w)
                .sum::<f64>()
        })
        .sum::<f64>()
        .sqrt()
}
