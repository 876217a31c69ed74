use std::f64::consts::PI;

use impact_core::{NoiseComponent, RngHandle, SurfaceGeometry};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::config::{MoveWeights, SamplerConfig, StepSizes};
use crate::prior::ImpactPrior;
use crate::state::ImpactState;

/// Fine-grained move label used for acceptance bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveKind {
    /// Arrival time random walk.
    Time,
    /// Momentum random walk.
    Momentum,
    /// Surface coordinate random walk on the same face.
    Surface,
    /// Incidence angle random walk.
    Incidence,
    /// Location redrawn from the surface prior.
    Relocate,
    /// Noise amplitude random walk.
    Noise,
    /// Impact drawn from the prior and appended.
    Birth,
    /// Impact removed.
    Death,
}

impl MoveKind {
    /// Stable label for reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveKind::Time => "time",
            MoveKind::Momentum => "momentum",
            MoveKind::Surface => "surface",
            MoveKind::Incidence => "incidence",
            MoveKind::Relocate => "relocate",
            MoveKind::Noise => "noise",
            MoveKind::Birth => "birth",
            MoveKind::Death => "death",
        }
    }
}

/// Quantity touched by a fixed-dimension update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateTarget {
    /// Arrival time of one impact.
    Time {
        /// Impact index.
        event: usize,
    },
    /// Momentum of one impact.
    Momentum {
        /// Impact index.
        event: usize,
    },
    /// Surface coordinate of one impact.
    Surface {
        /// Impact index.
        event: usize,
    },
    /// Incidence angles of one impact.
    Incidence {
        /// Impact index.
        event: usize,
    },
    /// Location of one impact, redrawn from the surface prior.
    Relocate {
        /// Impact index.
        event: usize,
    },
    /// One noise amplitude.
    Noise {
        /// Channel index.
        channel: usize,
        /// Amplitude component.
        component: NoiseComponent,
    },
}

/// A proposed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    /// Fixed-dimension update.
    ParameterUpdate(UpdateTarget),
    /// Append one impact drawn from the prior.
    Birth,
    /// Remove the impact at `index`.
    Death {
        /// Removed impact.
        index: usize,
    },
}

impl Move {
    /// Bookkeeping label.
    pub fn kind(&self) -> MoveKind {
        match self {
            Move::ParameterUpdate(UpdateTarget::Time { .. }) => MoveKind::Time,
            Move::ParameterUpdate(UpdateTarget::Momentum { .. }) => MoveKind::Momentum,
            Move::ParameterUpdate(UpdateTarget::Surface { .. }) => MoveKind::Surface,
            Move::ParameterUpdate(UpdateTarget::Incidence { .. }) => MoveKind::Incidence,
            Move::ParameterUpdate(UpdateTarget::Relocate { .. }) => MoveKind::Relocate,
            Move::ParameterUpdate(UpdateTarget::Noise { .. }) => MoveKind::Noise,
            Move::Birth => MoveKind::Birth,
            Move::Death { .. } => MoveKind::Death,
        }
    }
}

/// Coarse move families selected by weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MoveFamily {
    /// Fixed-dimension update.
    ParameterUpdate,
    /// Dimension-increasing move.
    Birth,
    /// Dimension-decreasing move.
    Death,
}

/// Result of a proposal: the move and its log Hastings correction
/// `ln q(x'→x) − ln q(x→x')` net of prior terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposed move.
    pub chosen: Move,
    /// Log Hastings correction.
    pub log_hastings: f64,
}

/// Generates trial states. Holds no mutable state; all randomness comes from
/// the caller's stream, so one engine serves every chain.
pub struct ProposalEngine<'a> {
    geometry: &'a dyn SurfaceGeometry,
    prior: ImpactPrior,
    weights: MoveWeights,
    steps: StepSizes,
    fixed_dimension: bool,
}

impl<'a> ProposalEngine<'a> {
    /// Builds an engine from the sampler configuration.
    pub fn new(config: &SamplerConfig, geometry: &'a dyn SurfaceGeometry, prior: ImpactPrior) -> Self {
        Self {
            geometry,
            prior,
            weights: config.moves.clone(),
            steps: config.steps.clone(),
            fixed_dimension: config.fixed_dimension,
        }
    }

    /// Move families available at `dimension` with their renormalised
    /// selection probabilities. Birth is never offered at capacity and
    /// death never at zero impacts.
    pub fn offered_moves(&self, dimension: usize, capacity: usize) -> Vec<(MoveFamily, f64)> {
        let mut offered = vec![(MoveFamily::ParameterUpdate, self.weights.parameter_update)];
        if !self.fixed_dimension {
            if dimension < capacity {
                offered.push((MoveFamily::Birth, self.weights.birth));
            }
            if dimension > 0 {
                offered.push((MoveFamily::Death, self.weights.death));
            }
        }
        offered.retain(|(_, weight)| *weight > 0.0);
        let total: f64 = offered.iter().map(|(_, weight)| weight).sum();
        if offered.is_empty() || total <= 0.0 {
            return vec![(MoveFamily::ParameterUpdate, 1.0)];
        }
        for (_, weight) in offered.iter_mut() {
            *weight /= total;
        }
        offered
    }

    /// Writes a candidate derived from `current` into `trial`.
    pub fn propose(
        &self,
        current: &ImpactState,
        trial: &mut ImpactState,
        rng: &mut RngHandle,
    ) -> Proposal {
        trial.copy_from(current);
        let dimension = current.dimension();
        let offered = self.offered_moves(dimension, current.capacity());
        let mut draw = rng.uniform();
        let mut family = MoveFamily::ParameterUpdate;
        for (candidate, weight) in &offered {
            family = *candidate;
            if draw < *weight {
                break;
            }
            draw -= weight;
        }

        match family {
            MoveFamily::ParameterUpdate => {
                let target = self.choose_target(current, rng);
                self.apply_update(trial, target, rng);
                Proposal {
                    chosen: Move::ParameterUpdate(target),
                    log_hastings: 0.0,
                }
            }
            MoveFamily::Birth => {
                let event = self.prior.draw_event(self.geometry, rng);
                trial.push_event(event);
                // The new impact is drawn from its prior, so the proposal
                // density cancels the prior ratio exactly; this only holds
                // while births sample the full prior.
                Proposal {
                    chosen: Move::Birth,
                    log_hastings: 0.0,
                }
            }
            MoveFamily::Death => {
                let index = rng.index(dimension);
                trial.remove_event(index);
                // Reverse of a prior-drawn birth; same cancellation as above.
                Proposal {
                    chosen: Move::Death { index },
                    log_hastings: 0.0,
                }
            }
        }
    }

    fn choose_target(&self, current: &ImpactState, rng: &mut RngHandle) -> UpdateTarget {
        let dimension = current.dimension();
        if dimension == 0 || rng.uniform() < self.weights.noise_fraction {
            return UpdateTarget::Noise {
                channel: rng.index(current.noise().len()),
                component: NoiseComponent::ALL[rng.index(NoiseComponent::ALL.len())],
            };
        }
        let event = rng.index(dimension);
        if rng.uniform() < self.weights.relocate_fraction {
            return UpdateTarget::Relocate { event };
        }
        match rng.index(4) {
            0 => UpdateTarget::Time { event },
            1 => UpdateTarget::Momentum { event },
            2 => UpdateTarget::Surface { event },
            _ => UpdateTarget::Incidence { event },
        }
    }

    fn apply_update(&self, trial: &mut ImpactState, target: UpdateTarget, rng: &mut RngHandle) {
        match target {
            UpdateTarget::Noise { channel, component } => {
                let scale = self.prior.reference().channels[channel].get(component);
                let step = self.steps.noise * scale * gaussian(rng);
                if let Some(amplitudes) = trial.noise_mut().channels.get_mut(channel) {
                    *amplitudes.get_mut(component) += step;
                }
            }
            UpdateTarget::Relocate { event } => {
                let surface = self.geometry.sample_surface_point(rng);
                if let Some(event) = trial.event_mut(event) {
                    event.face = surface.face;
                    event.point = surface.point;
                    event.map = surface.map;
                }
            }
            UpdateTarget::Time { event } => {
                let step = self.steps.time * gaussian(rng);
                if let Some(event) = trial.event_mut(event) {
                    event.time += step;
                }
            }
            UpdateTarget::Momentum { event } => {
                let step = self.steps.momentum * gaussian(rng);
                if let Some(event) = trial.event_mut(event) {
                    event.momentum += step;
                }
            }
            UpdateTarget::Surface { event } => {
                let du = self.steps.surface * gaussian(rng);
                let dv = self.steps.surface * gaussian(rng);
                if let Some(event) = trial.event_mut(event) {
                    event.map[0] += du;
                    event.map[1] += dv;
                    if let Some(point) = self.geometry.surface_point(event.face, event.map) {
                        event.point = point;
                    }
                }
            }
            UpdateTarget::Incidence { event } => {
                let dc = self.steps.incidence * gaussian(rng);
                let dphi = self.steps.incidence * gaussian(rng);
                if let Some(event) = trial.event_mut(event) {
                    event.cos_incidence += dc;
                    event.azimuth = (event.azimuth + dphi).rem_euclid(2.0 * PI);
                }
            }
        }
    }
}

fn gaussian(rng: &mut RngHandle) -> f64 {
    rng.inner_mut().sample(StandardNormal)
}
