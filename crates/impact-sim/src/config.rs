//! YAML layout of a CLI run: what to simulate plus the sampler block.

use std::error::Error;
use std::fs;
use std::path::Path;

use impact_core::{
    ErrorInfo, FaceId, FrequencyGrid, ImpactError, ImpactEvent, NoiseParameters, RngHandle,
    SurfaceGeometry,
};
use impact_mcmc::SamplerConfig;
use impact_model::{
    draw_injection, nominal_channel_noise, DegreesOfFreedom, Injection, MassProperties,
    NoiseCoupling, ParametricNoise, PrismSpacecraft, RigidBodyResponse,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub observation: ObservationConfig,
    #[serde(default)]
    pub spacecraft: SpacecraftConfig,
    #[serde(default)]
    pub noise: NoiseConfig,
    #[serde(default)]
    pub injection: InjectionConfig,
    /// Install the injected spectrum as a fixed external spectrum on every chain.
    #[serde(default)]
    pub static_spectrum: bool,
    #[serde(default)]
    pub sampler: SamplerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationConfig {
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default = "default_cadence")]
    pub cadence: f64,
    #[serde(default = "default_fmin")]
    pub fmin: f64,
    #[serde(default = "default_fmax")]
    pub fmax: f64,
    #[serde(default = "default_channels")]
    pub channels: usize,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            cadence: default_cadence(),
            fmin: default_fmin(),
            fmax: default_fmax(),
            channels: default_channels(),
        }
    }
}

fn default_duration() -> f64 {
    1024.0
}

fn default_cadence() -> f64 {
    1.0
}

fn default_fmin() -> f64 {
    1.0 / 64.0
}

fn default_fmax() -> f64 {
    0.5
}

fn default_channels() -> usize {
    3
}

/// Prism geometry and mass properties. Without a footprint the default
/// octagonal bus is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacecraftConfig {
    #[serde(default)]
    pub footprint: Option<Vec<[f64; 2]>>,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default)]
    pub mass: MassProperties,
}

impl Default for SpacecraftConfig {
    fn default() -> Self {
        Self {
            footprint: None,
            radius: default_radius(),
            height: default_height(),
            mass: MassProperties::default(),
        }
    }
}

fn default_radius() -> f64 {
    1.0
}

fn default_height() -> f64 {
    0.8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseConfig {
    #[serde(default)]
    pub coupling: NoiseCoupling,
    /// Reference amplitudes, shared by every channel; also the injected noise.
    #[serde(default = "impact_model::nominal_channel_noise")]
    pub reference: impact_core::ChannelNoise,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            coupling: NoiseCoupling::default(),
            reference: nominal_channel_noise(),
        }
    }
}

/// Impacts placed in the simulated data. Explicit `events` win; otherwise
/// `count` impacts are drawn from the prior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionConfig {
    #[serde(default)]
    pub events: Vec<InjectedImpact>,
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default = "default_injection_momentum")]
    pub momentum_mean: f64,
    #[serde(default = "default_noise_seed")]
    pub noise_seed: u64,
    #[serde(default = "default_injection_seed")]
    pub injection_seed: u64,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            count: default_count(),
            momentum_mean: default_injection_momentum(),
            noise_seed: default_noise_seed(),
            injection_seed: default_injection_seed(),
        }
    }
}

fn default_count() -> usize {
    1
}

fn default_injection_momentum() -> f64 {
    20.0
}

fn default_noise_seed() -> u64 {
    1
}

fn default_injection_seed() -> u64 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectedImpact {
    pub face: usize,
    pub map: [f64; 2],
    pub time: f64,
    pub momentum: f64,
    pub cos_incidence: f64,
    pub azimuth: f64,
}

/// Collaborators built from the configuration.
pub struct Physics {
    pub grid: FrequencyGrid,
    pub craft: PrismSpacecraft,
    pub response: RigidBodyResponse,
    pub noise_model: ParametricNoise,
    pub reference: NoiseParameters,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    pub fn physics(&self) -> Result<Physics, ImpactError> {
        let obs = &self.observation;
        let grid = FrequencyGrid::new(obs.duration, obs.cadence, obs.fmin, obs.fmax)?;
        let dof = DegreesOfFreedom::from_count(obs.channels)?;
        let craft = match &self.spacecraft.footprint {
            Some(footprint) => PrismSpacecraft::new(
                footprint.clone(),
                -0.5 * self.spacecraft.height,
                self.spacecraft.height,
            )?,
            None => PrismSpacecraft::octagon(self.spacecraft.radius, self.spacecraft.height)?,
        };
        let response = RigidBodyResponse::new(self.spacecraft.mass.clone(), dof)?;
        let noise_model =
            ParametricNoise::new(self.spacecraft.mass.clone(), self.noise.coupling.clone(), dof);
        let reference = NoiseParameters::uniform(dof.channels(), self.noise.reference);
        Ok(Physics {
            grid,
            craft,
            response,
            noise_model,
            reference,
        })
    }

    pub fn injection(&self, physics: &Physics) -> Result<Injection, ImpactError> {
        let events = if self.injection.events.is_empty() {
            let mut rng = RngHandle::from_seed(self.injection.injection_seed);
            draw_injection(
                &physics.craft,
                self.injection.count,
                physics.grid.duration,
                self.injection.momentum_mean,
                &mut rng,
            )?
        } else {
            self.injection
                .events
                .iter()
                .map(|impact| impact.place(&physics.craft))
                .collect::<Result<_, _>>()?
        };
        Ok(Injection {
            events,
            noise: physics.reference.clone(),
        })
    }
}

impl InjectedImpact {
    fn place(&self, craft: &PrismSpacecraft) -> Result<ImpactEvent, ImpactError> {
        let face = FaceId::from_raw(self.face);
        let point = craft
            .surface_point(face, self.map)
            .filter(|point| craft.face_area_density(face, point) > 0.0)
            .ok_or_else(|| {
                ImpactError::Geometry(
                    ErrorInfo::new("injection-location", "injected impact is not on the surface")
                        .with_context("face", self.face.to_string())
                        .with_context("map", format!("{:?}", self.map)),
                )
            })?;
        Ok(ImpactEvent {
            time: self.time,
            momentum: self.momentum,
            face,
            point,
            map: self.map,
            cos_incidence: self.cos_incidence,
            azimuth: self.azimuth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_uses_defaults() {
        let config: CliConfig = serde_yaml::from_str("sampler:\n  outer_iterations: 5\n").unwrap();
        assert_eq!(config.sampler.outer_iterations, 5);
        assert_eq!(config.observation.channels, 3);
        let physics = config.physics().unwrap();
        assert_eq!(physics.reference.len(), 3);
        let injection = config.injection(&physics).unwrap();
        assert_eq!(injection.events.len(), 1);
    }

    #[test]
    fn explicit_impacts_are_placed_on_their_face() {
        let yaml = r#"
observation:
  channels: 6
injection:
  events:
    - { face: 1, map: [0.1, -0.2], time: 300.0, momentum: 15.0, cos_incidence: 0.5, azimuth: 1.0 }
"#;
        let config: CliConfig = serde_yaml::from_str(yaml).unwrap();
        let physics = config.physics().unwrap();
        assert_eq!(physics.reference.len(), 6);
        let injection = config.injection(&physics).unwrap();
        let event = &injection.events[0];
        assert_eq!(event.face, FaceId::from_raw(1));
        assert!(physics.craft.face_area_density(event.face, &event.point) > 0.0);
    }

    #[test]
    fn off_surface_impact_is_rejected() {
        let yaml = r#"
injection:
  events:
    - { face: 0, map: [50.0, 50.0], time: 1.0, momentum: 1.0, cos_incidence: 0.5, azimuth: 0.0 }
"#;
        let config: CliConfig = serde_yaml::from_str(yaml).unwrap();
        let physics = config.physics().unwrap();
        let err = config.injection(&physics).unwrap_err();
        assert_eq!(err.info().code, "injection-location");
    }
}
