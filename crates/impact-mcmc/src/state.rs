use impact_core::{ErrorInfo, ImpactError, ImpactEvent, NoiseParameters, NoiseSpectrum};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Serialisable snapshot of the sampled parameters of a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Impacts in storage order.
    pub events: Vec<ImpactEvent>,
    /// Per-channel noise amplitudes.
    pub noise: NoiseParameters,
    /// Externally supplied PSD rows, when the spectrum is locked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_spectrum: Option<Vec<Vec<f64>>>,
}

impl ParameterSet {
    /// Number of impacts.
    pub fn dimension(&self) -> usize {
        self.events.len()
    }
}

/// Full candidate universe of one chain: impacts, noise parameters and the
/// cached quantities derived from them.
///
/// Storage for impacts is reserved once at the capacity; births and deaths
/// work in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactState {
    events: Vec<ImpactEvent>,
    capacity: usize,
    noise: NoiseParameters,
    spectrum: NoiseSpectrum,
    signal: Vec<Vec<Complex64>>,
    log_likelihood: f64,
    log_prior: f64,
}

impl ImpactState {
    /// Creates a state holding `events`, with caches sized for
    /// `channels × bins`. Scores start unset (`−∞`).
    pub fn new(
        capacity: usize,
        events: Vec<ImpactEvent>,
        noise: NoiseParameters,
        bins: usize,
    ) -> Result<Self, ImpactError> {
        if events.len() > capacity {
            return Err(ImpactError::Configuration(
                ErrorInfo::new("state-capacity", "initial state exceeds the impact capacity")
                    .with_context("events", events.len().to_string())
                    .with_context("capacity", capacity.to_string()),
            ));
        }
        let channels = noise.len();
        let mut storage = Vec::with_capacity(capacity);
        storage.extend(events);
        Ok(Self {
            events: storage,
            capacity,
            noise,
            spectrum: NoiseSpectrum::unit(channels, bins),
            signal: vec![vec![Complex64::new(0.0, 0.0); bins]; channels],
            log_likelihood: f64::NEG_INFINITY,
            log_prior: f64::NEG_INFINITY,
        })
    }

    /// Rebuilds a state from a snapshot; a locked spectrum is reinstalled.
    pub fn from_parameters(
        parameters: &ParameterSet,
        capacity: usize,
        bins: usize,
    ) -> Result<Self, ImpactError> {
        let mut state = Self::new(
            capacity,
            parameters.events.clone(),
            parameters.noise.clone(),
            bins,
        )?;
        if let Some(psd) = &parameters.locked_spectrum {
            state.spectrum.install_external(psd)?;
        }
        Ok(state)
    }

    /// Snapshot of the sampled parameters.
    pub fn parameters(&self) -> ParameterSet {
        ParameterSet {
            events: self.events.clone(),
            noise: self.noise.clone(),
            locked_spectrum: self
                .spectrum
                .is_external()
                .then(|| self.spectrum.psd().to_vec()),
        }
    }

    /// Deep copy of `other` into `self`, reusing this state's buffers.
    pub fn copy_from(&mut self, other: &ImpactState) {
        self.events.clone_from(&other.events);
        self.capacity = other.capacity;
        self.noise.channels.clone_from(&other.noise.channels);
        self.spectrum.copy_from(&other.spectrum);
        self.signal.clone_from(&other.signal);
        self.log_likelihood = other.log_likelihood;
        self.log_prior = other.log_prior;
    }

    /// Impacts in storage order.
    pub fn events(&self) -> &[ImpactEvent] {
        &self.events
    }

    /// Mutable access to one impact.
    pub fn event_mut(&mut self, index: usize) -> Option<&mut ImpactEvent> {
        self.events.get_mut(index)
    }

    /// Number of impacts.
    pub fn dimension(&self) -> usize {
        self.events.len()
    }

    /// Maximum number of impacts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an impact; returns false when the state is full.
    pub fn push_event(&mut self, event: ImpactEvent) -> bool {
        if self.events.len() >= self.capacity {
            return false;
        }
        self.events.push(event);
        true
    }

    /// Removes the impact at `index`, preserving the order of the rest.
    pub fn remove_event(&mut self, index: usize) -> Option<ImpactEvent> {
        (index < self.events.len()).then(|| self.events.remove(index))
    }

    /// Noise parameters.
    pub fn noise(&self) -> &NoiseParameters {
        &self.noise
    }

    /// Mutable noise parameters.
    pub fn noise_mut(&mut self) -> &mut NoiseParameters {
        &mut self.noise
    }

    /// Cached noise spectrum.
    pub fn spectrum(&self) -> &NoiseSpectrum {
        &self.spectrum
    }

    /// Mutable cached noise spectrum.
    pub fn spectrum_mut(&mut self) -> &mut NoiseSpectrum {
        &mut self.spectrum
    }

    /// Cached predicted signal per channel.
    pub fn signal(&self) -> &[Vec<Complex64>] {
        &self.signal
    }

    pub(crate) fn noise_workspace(&mut self) -> (&NoiseParameters, &mut NoiseSpectrum) {
        (&self.noise, &mut self.spectrum)
    }

    pub(crate) fn signal_workspace(&mut self) -> (&[ImpactEvent], &mut [Vec<Complex64>]) {
        (&self.events, &mut self.signal)
    }

    /// Cached log-likelihood.
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Cached log-prior.
    pub fn log_prior(&self) -> f64 {
        self.log_prior
    }

    /// Stores freshly computed scores.
    pub fn set_scores(&mut self, log_likelihood: f64, log_prior: f64) {
        self.log_likelihood = log_likelihood;
        self.log_prior = log_prior;
    }
}

#[cfg(test)]
mod tests {
    use impact_core::{ChannelNoise, FaceId, SurfacePoint};
    use nalgebra::Vector3;

    use super::*;

    fn event(time: f64) -> ImpactEvent {
        let surface = SurfacePoint {
            face: FaceId::from_raw(1),
            point: Vector3::new(0.1, 0.2, 0.4),
            map: [0.1, 0.2],
        };
        ImpactEvent::at(surface, time, 3.0, 0.5, 1.0)
    }

    fn noise() -> NoiseParameters {
        NoiseParameters::uniform(
            3,
            ChannelNoise {
                inertial: 1.0,
                thruster: 2.0,
                angular: 3.0,
            },
        )
    }

    #[test]
    fn capacity_is_enforced() {
        let err = ImpactState::new(1, vec![event(0.0), event(1.0)], noise(), 8).unwrap_err();
        assert_eq!(err.info().code, "state-capacity");

        let mut state = ImpactState::new(2, vec![event(0.0)], noise(), 8).unwrap();
        assert!(state.push_event(event(1.0)));
        assert!(!state.push_event(event(2.0)));
        assert_eq!(state.dimension(), 2);
    }

    #[test]
    fn removal_preserves_order() {
        let mut state =
            ImpactState::new(4, vec![event(0.0), event(1.0), event(2.0)], noise(), 8).unwrap();
        let removed = state.remove_event(1).unwrap();
        assert_eq!(removed.time, 1.0);
        let times: Vec<f64> = state.events().iter().map(|event| event.time).collect();
        assert_eq!(times, vec![0.0, 2.0]);
        assert!(state.remove_event(5).is_none());
    }

    #[test]
    fn copy_is_deep_and_keeps_storage() {
        let source = ImpactState::new(4, vec![event(0.5)], noise(), 8).unwrap();
        let mut target = ImpactState::new(4, Vec::new(), noise(), 8).unwrap();
        let storage = target.events.as_ptr();
        target.copy_from(&source);
        assert_eq!(target, source);
        assert_eq!(target.events.as_ptr(), storage);

        target.event_mut(0).unwrap().time = 7.0;
        assert_eq!(source.events()[0].time, 0.5);
    }

    #[test]
    fn snapshot_round_trips_locked_spectrum() {
        let mut state = ImpactState::new(4, vec![event(0.5)], noise(), 4).unwrap();
        state.spectrum_mut().install_external(&vec![vec![2.0; 4]; 3]).unwrap();
        let snapshot = state.parameters();
        assert!(snapshot.locked_spectrum.is_some());
        let restored = ImpactState::from_parameters(&snapshot, 4, 4).unwrap();
        assert!(restored.spectrum().is_external());
        assert_eq!(restored.spectrum().psd()[2][3], 2.0);
    }
}
