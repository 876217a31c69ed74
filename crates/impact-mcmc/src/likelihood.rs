use impact_core::{
    ImpactError, NoiseModel, NoiseSpectrum, Observation, SurfaceGeometry, WaveformModel,
};
use num_complex::Complex64;

use crate::prior::ImpactPrior;
use crate::state::ImpactState;

/// Scoring seam between the samplers and the physics.
///
/// `log_prior` is checked first; a `−∞` prior rejects a proposal without
/// touching the likelihood.
pub trait StateScorer: Sync {
    /// Log prior of the state's parameters.
    fn log_prior(&self, state: &ImpactState) -> f64;

    /// Log-likelihood of the state; may refresh the state's cached spectrum
    /// and signal but nothing else.
    fn log_likelihood(&self, state: &mut ImpactState) -> Result<f64, ImpactError>;
}

/// Scores `state` and stores the result in its cache.
pub fn score(scorer: &dyn StateScorer, state: &mut ImpactState) -> Result<(), ImpactError> {
    let log_prior = scorer.log_prior(state);
    let log_likelihood = scorer.log_likelihood(state)?;
    state.set_scores(log_likelihood, log_prior);
    Ok(())
}

/// Gaussian frequency-domain likelihood with the priors of [`ImpactPrior`].
///
/// `logL = −½ Σ_k ⟨r_k|r_k⟩ − Σ_k Σ_i ln S_k,i` over the analysed band, with
/// `⟨a|b⟩ = 2 Σ Re(a b*) / S` and `r = d − s`.
pub struct LikelihoodEvaluator<'a> {
    observation: &'a Observation,
    waveform: &'a dyn WaveformModel,
    geometry: &'a dyn SurfaceGeometry,
    noise_model: &'a dyn NoiseModel,
    prior: ImpactPrior,
    sample_prior: bool,
}

impl<'a> LikelihoodEvaluator<'a> {
    /// Wires the evaluator to its collaborators.
    pub fn new(
        observation: &'a Observation,
        waveform: &'a dyn WaveformModel,
        geometry: &'a dyn SurfaceGeometry,
        noise_model: &'a dyn NoiseModel,
        prior: ImpactPrior,
    ) -> Result<Self, ImpactError> {
        let channels = observation.num_channels();
        if waveform.num_channels() != channels || prior.reference().len() != channels {
            return Err(ImpactError::Configuration(
                impact_core::ErrorInfo::new(
                    "channel-mismatch",
                    "observation, waveform and noise reference disagree on channel count",
                )
                .with_context("observation", channels.to_string())
                .with_context("waveform", waveform.num_channels().to_string())
                .with_context("noise", prior.reference().len().to_string()),
            ));
        }
        Ok(Self {
            observation,
            waveform,
            geometry,
            noise_model,
            prior,
            sample_prior: false,
        })
    }

    /// Fixes the log-likelihood at zero so sampling explores the prior.
    pub fn with_sample_prior(mut self, sample_prior: bool) -> Self {
        self.sample_prior = sample_prior;
        self
    }

    /// Observation the evaluator scores against.
    pub fn observation(&self) -> &Observation {
        self.observation
    }

    /// Surface geometry used by the location prior.
    pub fn geometry(&self) -> &'a dyn SurfaceGeometry {
        self.geometry
    }

    /// Prior densities.
    pub fn prior(&self) -> &ImpactPrior {
        &self.prior
    }

    /// Rebuilds the parametric spectrum unless an external one is installed.
    pub fn refresh_spectrum(&self, state: &mut ImpactState) -> Result<(), ImpactError> {
        if state.spectrum().is_external() {
            return Ok(());
        }
        let grid = self.observation.grid();
        let (noise, spectrum) = state.noise_workspace();
        self.noise_model.build_psd(noise, grid, spectrum.psd_mut());
        spectrum.refresh_inverse()
    }

    /// Recomputes the predicted signal from scratch. Returns false if an
    /// impact sits on an unknown face.
    pub fn refresh_signal(&self, state: &mut ImpactState) -> bool {
        let grid = self.observation.grid();
        let (events, signal) = state.signal_workspace();
        for row in signal.iter_mut() {
            row.fill(Complex64::new(0.0, 0.0));
        }
        for event in events {
            let Some(frame) = self.geometry.face_frame(event.face) else {
                return false;
            };
            for (channel, row) in signal.iter_mut().enumerate() {
                self.waveform.respond(channel, &frame, event, grid, row);
            }
        }
        true
    }

    /// Residual `d − s` per channel from the cached signal.
    pub fn residual(&self, state: &ImpactState) -> Vec<Vec<Complex64>> {
        self.observation
            .channels()
            .iter()
            .zip(state.signal())
            .map(|(data, signal)| data.iter().zip(signal).map(|(d, s)| d - s).collect())
            .collect()
    }

    /// Optimal signal-to-noise ratio `√⟨s|s⟩` of the cached signal.
    pub fn snr(&self, state: &ImpactState) -> f64 {
        let band = self.observation.grid().band();
        state
            .signal()
            .iter()
            .zip(state.spectrum().inverse())
            .map(|(signal, inverse)| {
                let signal = &signal[band.clone()];
                inner_product(signal, signal, &inverse[band.clone()])
            })
            .sum::<f64>()
            .sqrt()
    }

    fn gaussian_log_likelihood(&self, signal: &[Vec<Complex64>], spectrum: &NoiseSpectrum) -> f64 {
        let band = self.observation.grid().band();
        let mut log_likelihood = 0.0;
        for ((data, signal), (psd, inverse)) in self
            .observation
            .channels()
            .iter()
            .zip(signal)
            .zip(spectrum.psd().iter().zip(spectrum.inverse()))
        {
            for i in band.clone() {
                let residual = data[i] - signal[i];
                log_likelihood -= residual.norm_sqr() * inverse[i] + psd[i].ln();
            }
        }
        log_likelihood
    }
}

impl StateScorer for LikelihoodEvaluator<'_> {
    fn log_prior(&self, state: &ImpactState) -> f64 {
        self.prior.log_prior(state, self.geometry)
    }

    fn log_likelihood(&self, state: &mut ImpactState) -> Result<f64, ImpactError> {
        self.refresh_spectrum(state)?;
        if !self.refresh_signal(state) {
            return Ok(f64::NEG_INFINITY);
        }
        if self.sample_prior {
            return Ok(0.0);
        }
        Ok(self.gaussian_log_likelihood(state.signal(), state.spectrum()))
    }
}

/// Noise-weighted inner product `2 Σ Re(a b*) / S` given the inverse PSD.
pub fn inner_product(a: &[Complex64], b: &[Complex64], inverse: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .zip(inverse)
        .map(|((a, b), w)| 2.0 * (a * b.conj()).re * w)
        .sum()
}
