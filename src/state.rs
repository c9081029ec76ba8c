//! Joint state representation for the navigating agent.
//!
//! A [`JointState`] pairs the agent's own full kinematic state with the
//! observable states of every nearby agent. It is transient: built once per
//! decision step, consumed, and discarded.

use tch::{Device, Tensor};

/// Number of features encoding the navigating agent's own state.
pub const SELF_STATE_DIM: usize = 9; // px, py, vx, vy, radius, gx, gy, v_pref, theta

/// Number of features encoding one observed agent.
pub const OBSERVED_STATE_DIM: usize = 5; // px, py, vx, vy, radius

/// Width of one joint-state row: own features followed by one agent's features.
pub const JOINT_STATE_DIM: usize = SELF_STATE_DIM + OBSERVED_STATE_DIM;

/// Full kinematic state of the navigating agent.
///
/// The heading `theta` only carries meaning under unicycle kinematics;
/// holonomic agents ignore it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelfState {
    pub px: f64,
    pub py: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
    pub gx: f64,
    pub gy: f64,
    pub v_pref: f64,
    pub theta: f64,
}

impl SelfState {
    /// Euclidean distance from the current position to the goal.
    pub fn distance_to_goal(&self) -> f64 {
        let dx = self.gx - self.px;
        let dy = self.gy - self.py;
        (dx * dx + dy * dy).sqrt()
    }

    /// Returns true once the agent's position is within its own radius
    /// of the goal.
    pub fn reached_goal(&self) -> bool {
        self.distance_to_goal() < self.radius
    }

    /// Encodes this state as a feature slice of length [`SELF_STATE_DIM`].
    pub fn features(&self) -> [f64; SELF_STATE_DIM] {
        [
            self.px,
            self.py,
            self.vx,
            self.vy,
            self.radius,
            self.gx,
            self.gy,
            self.v_pref,
            self.theta,
        ]
    }
}

/// Observable state of one other dynamic agent.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObservedState {
    pub px: f64,
    pub py: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
}

impl ObservedState {
    /// Encodes this state as a feature slice of length [`OBSERVED_STATE_DIM`].
    pub fn features(&self) -> [f64; OBSERVED_STATE_DIM] {
        [self.px, self.py, self.vx, self.vy, self.radius]
    }
}

/// The navigating agent's view of the world at one decision step.
///
/// Holds the agent's own state plus an ordered collection of observed
/// agents. The ordering carries no semantic meaning but stays positionally
/// fixed for the duration of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct JointState {
    pub self_state: SelfState,
    pub agent_states: Vec<ObservedState>,
}

impl JointState {
    /// Creates a new joint state.
    pub fn new(self_state: SelfState, agent_states: Vec<ObservedState>) -> Self {
        Self {
            self_state,
            agent_states,
        }
    }

    /// Number of observed agents.
    pub fn agent_count(&self) -> usize {
        self.agent_states.len()
    }

    /// Flattens this state into N rows of width [`JOINT_STATE_DIM`].
    ///
    /// Every row shares the same self-state prefix and carries one distinct
    /// agent's suffix.
    pub fn rows(&self) -> Vec<[f64; JOINT_STATE_DIM]> {
        let prefix = self.self_state.features();
        self.agent_states
            .iter()
            .map(|agent| {
                let mut row = [0.0; JOINT_STATE_DIM];
                row[..SELF_STATE_DIM].copy_from_slice(&prefix);
                row[SELF_STATE_DIM..].copy_from_slice(&agent.features());
                row
            })
            .collect()
    }

    /// Encodes this state as a `(N, JOINT_STATE_DIM)` float tensor on the
    /// given device.
    pub fn to_tensor(&self, device: Device) -> Tensor {
        let flat: Vec<f32> = self
            .rows()
            .iter()
            .flat_map(|row| row.iter().map(|&v| v as f32))
            .collect();
        Tensor::from_slice(&flat)
            .reshape([self.agent_count() as i64, JOINT_STATE_DIM as i64])
            .to_device(device)
    }
}
