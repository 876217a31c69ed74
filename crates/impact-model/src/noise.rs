//! Parametric three-term acceleration noise model.

use std::f64::consts::PI;

use impact_core::{ChannelNoise, FrequencyGrid, NoiseModel, NoiseParameters};
use serde::{Deserialize, Serialize};

use crate::waveform::{DegreesOfFreedom, MassProperties};

/// Nominal inertial sensing noise, m/√Hz.
pub const NOMINAL_INERTIAL: f64 = 1.8e-9;
/// Nominal cold-gas thruster noise, N/√Hz.
pub const NOMINAL_THRUSTER: f64 = 1.0e-7;
/// Nominal angular sensing noise, rad/√Hz.
pub const NOMINAL_ANGULAR: f64 = 2.0e-7;

/// Reference amplitudes used for injections and as prior centres.
pub fn nominal_channel_noise() -> ChannelNoise {
    ChannelNoise {
        inertial: NOMINAL_INERTIAL,
        thruster: NOMINAL_THRUSTER,
        angular: NOMINAL_ANGULAR,
    }
}

/// Coupling geometry of the noise model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseCoupling {
    /// Lever arm turning thruster force into torque, and angular readout
    /// noise into linear readout noise, in metres.
    pub lever_arm: f64,
    /// Sensor baseline turning linear readout noise into angular noise, m.
    pub baseline: f64,
}

impl Default for NoiseCoupling {
    fn default() -> Self {
        Self {
            lever_arm: 0.1,
            baseline: 0.376,
        }
    }
}

/// One-sided acceleration PSD per channel:
///
/// `S(f) = (A_th·g/m)² + (2πf)⁴ (c_is A_is² + c_as A_as²)`
///
/// where linear channels use `g = 1`, `m = M`, `c_is = 1`, `c_as = L²`, and
/// angular channels use `g = L`, `m = I_kk`, `c_is = 1/B²`, `c_as = 1`. The
/// stored value is `T/2 · S(f)`, the variance of one discrete frequency
/// sample.
#[derive(Debug, Clone)]
pub struct ParametricNoise {
    properties: MassProperties,
    coupling: NoiseCoupling,
    dof: DegreesOfFreedom,
}

impl ParametricNoise {
    /// Creates the model for the given spacecraft.
    pub fn new(properties: MassProperties, coupling: NoiseCoupling, dof: DegreesOfFreedom) -> Self {
        Self {
            properties,
            coupling,
            dof,
        }
    }

    /// One-sided PSD of `channel` at frequency `f`.
    pub fn one_sided(&self, channel: usize, noise: &ChannelNoise, f: f64) -> f64 {
        let omega4 = (2.0 * PI * f).powi(4);
        let lever2 = self.coupling.lever_arm * self.coupling.lever_arm;
        if channel < 3 {
            let thruster = noise.thruster / self.properties.mass;
            thruster * thruster
                + omega4 * (noise.inertial * noise.inertial + lever2 * noise.angular * noise.angular)
        } else {
            let inertia = self.properties.inertia[(channel - 3, channel - 3)];
            let thruster = noise.thruster * self.coupling.lever_arm / inertia;
            let baseline2 = self.coupling.baseline * self.coupling.baseline;
            thruster * thruster
                + omega4 * (noise.inertial * noise.inertial / baseline2 + noise.angular * noise.angular)
        }
    }
}

impl NoiseModel for ParametricNoise {
    fn build_psd(&self, noise: &NoiseParameters, grid: &FrequencyGrid, psd: &mut [Vec<f64>]) {
        let scale = 0.5 * grid.duration;
        for (channel, (row, amplitudes)) in psd
            .iter_mut()
            .zip(&noise.channels)
            .take(self.dof.channels())
            .enumerate()
        {
            row.resize(grid.bins, 0.0);
            for (bin, value) in row.iter_mut().enumerate() {
                *value = scale * self.one_sided(channel, amplitudes, grid.frequency(bin));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ParametricNoise {
        ParametricNoise::new(
            MassProperties::default(),
            NoiseCoupling::default(),
            DegreesOfFreedom::Six,
        )
    }

    #[test]
    fn low_frequencies_are_thruster_dominated() {
        let noise = nominal_channel_noise();
        let model = model();
        let mass = MassProperties::default().mass;
        let expected = (NOMINAL_THRUSTER / mass).powi(2);
        let value = model.one_sided(0, &noise, 0.0);
        assert!((value - expected).abs() < 1e-12 * expected);
    }

    #[test]
    fn sensing_noise_rises_as_f4() {
        let mut noise = nominal_channel_noise();
        noise.thruster = 0.0;
        let model = model();
        let ratio = model.one_sided(1, &noise, 0.2) / model.one_sided(1, &noise, 0.1);
        assert!((ratio - 16.0).abs() < 1e-9);
    }

    #[test]
    fn psd_rows_cover_the_grid() {
        let grid = FrequencyGrid::new(128.0, 1.0, 1.0 / 128.0, 0.5).unwrap();
        let noise = NoiseParameters::uniform(6, nominal_channel_noise());
        let mut psd = vec![Vec::new(); 6];
        model().build_psd(&noise, &grid, &mut psd);
        for row in &psd {
            assert_eq!(row.len(), grid.bins);
            assert!(row.iter().all(|value| *value > 0.0));
        }
        let direct = 64.0 * model().one_sided(4, &noise.channels[4], grid.frequency(10));
        assert!((psd[4][10] - direct).abs() < 1e-12 * direct);
    }
}
