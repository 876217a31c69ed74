//! Rigid-body impulse response of the spacecraft to a momentum kick.

use std::f64::consts::PI;

use impact_core::{ErrorInfo, FaceFrame, FrequencyGrid, ImpactError, ImpactEvent, WaveformModel};
use nalgebra::{Matrix3, Vector3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Conversion from the sampler's momentum unit (µN·s) to N·s.
pub const MOMENTUM_UNIT: f64 = 1e-6;

/// Number of sensed degrees of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DegreesOfFreedom {
    /// Linear acceleration along x, y, z.
    Three,
    /// Linear plus angular acceleration about x, y, z.
    Six,
}

impl DegreesOfFreedom {
    /// Number of channels produced.
    pub fn channels(&self) -> usize {
        match self {
            DegreesOfFreedom::Three => 3,
            DegreesOfFreedom::Six => 6,
        }
    }

    /// Parses the channel count used on the command line.
    pub fn from_count(count: usize) -> Result<Self, ImpactError> {
        match count {
            3 => Ok(DegreesOfFreedom::Three),
            6 => Ok(DegreesOfFreedom::Six),
            other => Err(ImpactError::Configuration(
                ErrorInfo::new("dof", "degrees of freedom must be 3 or 6")
                    .with_context("dof", other.to_string()),
            )),
        }
    }
}

/// Mass properties of the spacecraft in the body frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    /// Total mass in kg.
    pub mass: f64,
    /// Moment of inertia tensor about the centre of mass, kg·m².
    pub inertia: Matrix3<f64>,
    /// Centre of mass in the body frame, m.
    pub center_of_mass: Vector3<f64>,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: 422.7,
            inertia: Matrix3::new(
                202.5, -2.2, 1.4, //
                -2.2, 206.4, -0.9, //
                1.4, -0.9, 334.8,
            ),
            center_of_mass: Vector3::new(-0.0018, 0.0015, 0.0012),
        }
    }
}

/// Channel `k < 3` carries linear acceleration `p_k / M`; channel `k ≥ 3`
/// carries angular acceleration `[I⁻¹ ((r − r_com) × p)]_{k−3}`. Each impact
/// is an impulse, so its spectrum is `amplitude · e^{−2πi f t0}`.
#[derive(Debug, Clone)]
pub struct RigidBodyResponse {
    properties: MassProperties,
    inverse_inertia: Matrix3<f64>,
    dof: DegreesOfFreedom,
}

impl RigidBodyResponse {
    /// Builds the response, inverting the inertia tensor once.
    pub fn new(properties: MassProperties, dof: DegreesOfFreedom) -> Result<Self, ImpactError> {
        if !(properties.mass > 0.0) {
            return Err(ImpactError::Configuration(
                ErrorInfo::new("mass", "spacecraft mass must be positive")
                    .with_context("mass", properties.mass.to_string()),
            ));
        }
        let inverse_inertia = properties.inertia.try_inverse().ok_or_else(|| {
            ImpactError::Configuration(ErrorInfo::new(
                "inertia-singular",
                "moment of inertia tensor is not invertible",
            ))
        })?;
        Ok(Self {
            properties,
            inverse_inertia,
            dof,
        })
    }

    /// Mass properties used by the response.
    pub fn properties(&self) -> &MassProperties {
        &self.properties
    }

    /// Sensed degrees of freedom.
    pub fn dof(&self) -> DegreesOfFreedom {
        self.dof
    }

    /// Time-domain amplitude of the impulse on `channel`.
    pub fn amplitude(&self, channel: usize, frame: &FaceFrame, event: &ImpactEvent) -> f64 {
        let momentum = event.momentum_vector(frame) * MOMENTUM_UNIT;
        if channel < 3 {
            momentum[channel] / self.properties.mass
        } else {
            let arm = event.point - self.properties.center_of_mass;
            let angular = self.inverse_inertia * arm.cross(&momentum);
            angular[channel - 3]
        }
    }
}

impl WaveformModel for RigidBodyResponse {
    fn num_channels(&self) -> usize {
        self.dof.channels()
    }

    fn respond(
        &self,
        channel: usize,
        frame: &FaceFrame,
        event: &ImpactEvent,
        grid: &FrequencyGrid,
        out: &mut [Complex64],
    ) {
        let amplitude = self.amplitude(channel, frame, event);
        if amplitude == 0.0 {
            return;
        }
        let band = grid.band();
        let step = Complex64::from_polar(1.0, -2.0 * PI * grid.df() * event.time);
        let mut phase = Complex64::from_polar(amplitude, -2.0 * PI * grid.frequency(band.start) * event.time);
        for slot in &mut out[band] {
            *slot += phase;
            phase *= step;
        }
    }
}
