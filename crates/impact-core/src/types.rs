//! Impact events, surface coordinates and noise parameters.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Identifier for a spacecraft surface face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FaceId(usize);

impl FaceId {
    /// Creates a new identifier from its raw index.
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Returns the raw index of the face.
    pub fn as_raw(&self) -> usize {
        self.0
    }
}

/// Orthonormal frame attached to a face: outward normal plus two tangents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceFrame {
    /// Outward unit normal.
    pub normal: Vector3<f64>,
    /// First in-plane unit tangent.
    pub u: Vector3<f64>,
    /// Second in-plane unit tangent, `normal × u`.
    pub v: Vector3<f64>,
}

/// A point on the spacecraft surface in both 3-D and face coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    /// Face containing the point.
    pub face: FaceId,
    /// Body-frame position in metres.
    pub point: Vector3<f64>,
    /// 2-D coordinate within the face, in metres.
    pub map: [f64; 2],
}

/// One candidate impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactEvent {
    /// Time of arrival in seconds from the start of the observation.
    pub time: f64,
    /// Momentum magnitude in µN·s.
    pub momentum: f64,
    /// Face that was hit.
    pub face: FaceId,
    /// Body-frame impact point.
    pub point: Vector3<f64>,
    /// Face coordinate of the impact point.
    pub map: [f64; 2],
    /// Cosine of the angle between the incoming direction and the face normal.
    pub cos_incidence: f64,
    /// Azimuth of the incoming direction about the face normal, in radians.
    pub azimuth: f64,
}

impl ImpactEvent {
    /// Builds an event at a surface point with the given timing and incidence.
    pub fn at(
        surface: SurfacePoint,
        time: f64,
        momentum: f64,
        cos_incidence: f64,
        azimuth: f64,
    ) -> Self {
        Self {
            time,
            momentum,
            face: surface.face,
            point: surface.point,
            map: surface.map,
            cos_incidence,
            azimuth,
        }
    }

    /// Unit vector pointing from the face towards the incoming impactor.
    pub fn incidence_direction(&self, frame: &FaceFrame) -> Vector3<f64> {
        let sin_incidence = (1.0 - self.cos_incidence * self.cos_incidence)
            .max(0.0)
            .sqrt();
        frame.normal * self.cos_incidence
            + (frame.u * self.azimuth.cos() + frame.v * self.azimuth.sin()) * sin_incidence
    }

    /// Momentum transferred to the spacecraft, in µN·s.
    pub fn momentum_vector(&self, frame: &FaceFrame) -> Vector3<f64> {
        -self.incidence_direction(frame) * self.momentum
    }
}

/// Amplitude components of a single channel's parametric noise model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoiseComponent {
    /// Inertial (position) sensing noise.
    Inertial,
    /// Thruster force noise.
    Thruster,
    /// Angular sensing noise.
    Angular,
}

impl NoiseComponent {
    /// All components in storage order.
    pub const ALL: [NoiseComponent; 3] = [
        NoiseComponent::Inertial,
        NoiseComponent::Thruster,
        NoiseComponent::Angular,
    ];
}

/// Noise amplitudes for one sensing channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelNoise {
    /// Inertial sensing noise amplitude (m/√Hz).
    pub inertial: f64,
    /// Thruster noise amplitude (N/√Hz).
    pub thruster: f64,
    /// Angular sensing noise amplitude (rad/√Hz).
    pub angular: f64,
}

impl ChannelNoise {
    /// Returns the amplitude of the requested component.
    pub fn get(&self, component: NoiseComponent) -> f64 {
        match component {
            NoiseComponent::Inertial => self.inertial,
            NoiseComponent::Thruster => self.thruster,
            NoiseComponent::Angular => self.angular,
        }
    }

    /// Mutable access to the requested component.
    pub fn get_mut(&mut self, component: NoiseComponent) -> &mut f64 {
        match component {
            NoiseComponent::Inertial => &mut self.inertial,
            NoiseComponent::Thruster => &mut self.thruster,
            NoiseComponent::Angular => &mut self.angular,
        }
    }
}

/// Per-channel noise parameters of a sampler state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseParameters {
    /// One entry per sensing channel.
    pub channels: Vec<ChannelNoise>,
}

impl NoiseParameters {
    /// Uses the same amplitudes on every channel.
    pub fn uniform(channels: usize, noise: ChannelNoise) -> Self {
        Self {
            channels: vec![noise; channels],
        }
    }

    /// Number of channels described.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true when no channel is described.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
