//! Motion actions and the discretized candidate action space.
//!
//! Actions are an explicit tagged union: a velocity vector under holonomic
//! kinematics, or a rotation plus forward speed under unicycle kinematics.
//! The variant is never inferred from which fields happen to be populated.

use std::f64::consts::{E, FRAC_PI_4, TAU};

use crate::error::PolicyError;

/// Kinematic constraint mode of the navigating agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Kinematics {
    /// Any instantaneous velocity vector is reachable.
    Holonomic,
    /// Motion restricted to forward speed plus rotation rate.
    Unicycle,
}

/// How candidate speeds are spaced between zero and the preferred speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sampling {
    /// Denser sampling near zero: `(e^(i/n) - 1) / (e - 1) * v_pref`.
    Exponential,
    /// Evenly spaced: `i/n * v_pref`.
    Linear,
}

/// One candidate motion action.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    /// Velocity command for a holonomic agent.
    Holonomic { vx: f64, vy: f64 },
    /// Rotation and forward speed for a unicycle agent.
    Unicycle { rotation: f64, speed: f64 },
}

impl Action {
    /// The designated stop action for the given kinematics.
    pub fn stop(kinematics: Kinematics) -> Self {
        match kinematics {
            Kinematics::Holonomic => Action::Holonomic { vx: 0.0, vy: 0.0 },
            Kinematics::Unicycle => Action::Unicycle {
                rotation: 0.0,
                speed: 0.0,
            },
        }
    }

    /// Returns true if this action commands no motion.
    pub fn is_stop(&self) -> bool {
        match *self {
            Action::Holonomic { vx, vy } => vx == 0.0 && vy == 0.0,
            Action::Unicycle { rotation, speed } => rotation == 0.0 && speed == 0.0,
        }
    }
}

/// Finite ordered set of candidate actions.
///
/// Built deterministically from the preferred speed: the stop action first,
/// then `speed_samples × rotation_samples` combinations in rotation-major
/// order, for a total of `speed_samples × rotation_samples + 1` actions.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpace {
    actions: Vec<Action>,
    kinematics: Kinematics,
}

impl ActionSpace {
    /// Builds the candidate action space for the given preferred speed.
    ///
    /// Speeds span `(0, v_pref]` per the sampling mode. Rotations cover
    /// `[0, 2π)` for holonomic agents and `[-π/4, π/4]` for unicycle agents.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Collaborator`] if the preferred speed is not
    /// positive or either sample count is zero.
    pub fn build(
        v_pref: f64,
        kinematics: Kinematics,
        sampling: Sampling,
        speed_samples: usize,
        rotation_samples: usize,
    ) -> Result<Self, PolicyError> {
        if !v_pref.is_finite() || v_pref <= 0.0 {
            return Err(PolicyError::Collaborator(format!(
                "preferred speed must be positive, got {v_pref}"
            )));
        }
        if speed_samples == 0 || rotation_samples == 0 {
            return Err(PolicyError::Collaborator(
                "speed_samples and rotation_samples must be at least 1".to_string(),
            ));
        }

        let speeds: Vec<f64> = (1..=speed_samples)
            .map(|i| {
                let fraction = i as f64 / speed_samples as f64;
                match sampling {
                    Sampling::Exponential => (fraction.exp() - 1.0) / (E - 1.0) * v_pref,
                    Sampling::Linear => fraction * v_pref,
                }
            })
            .collect();

        let rotations: Vec<f64> = match kinematics {
            Kinematics::Holonomic => (0..rotation_samples)
                .map(|j| j as f64 * TAU / rotation_samples as f64)
                .collect(),
            Kinematics::Unicycle => {
                if rotation_samples == 1 {
                    vec![-FRAC_PI_4]
                } else {
                    let step = 2.0 * FRAC_PI_4 / (rotation_samples - 1) as f64;
                    (0..rotation_samples)
                        .map(|j| -FRAC_PI_4 + j as f64 * step)
                        .collect()
                }
            }
        };

        let mut actions = vec![Action::stop(kinematics)];
        for &rotation in &rotations {
            for &speed in &speeds {
                actions.push(match kinematics {
                    Kinematics::Holonomic => Action::Holonomic {
                        vx: speed * rotation.cos(),
                        vy: speed * rotation.sin(),
                    },
                    Kinematics::Unicycle => Action::Unicycle { rotation, speed },
                });
            }
        }

        Ok(Self {
            actions,
            kinematics,
        })
    }

    /// The designated stop action (always the first entry).
    pub fn stop(&self) -> Action {
        self.actions[0]
    }

    /// The kinematics mode this space was built for.
    pub fn kinematics(&self) -> Kinematics {
        self.kinematics
    }

    /// Number of candidate actions, including stop.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if the space holds no actions (never the case after
    /// a successful build).
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterates over the candidates in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    /// Returns the candidate at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    /// Returns true if `action` is a member of this space.
    pub fn contains(&self, action: &Action) -> bool {
        self.actions.contains(action)
    }
}
