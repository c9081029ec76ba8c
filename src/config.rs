//! Configuration for the attention-based navigation policy.
//!
//! Configuration-file parsing lives outside this crate; callers hand over
//! already-typed values.

use crate::action::{Kinematics, Sampling};
use crate::error::PolicyError;

/// Typed configuration for the policy and its value network.
///
/// Field groups correspond to the external configuration surface: the
/// discount factor, the action-space discretization, and the network
/// architecture.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolicyConfig {
    /// Discount factor in (0, 1].
    pub gamma: f64,
    /// Kinematic constraint mode.
    pub kinematics: Kinematics,
    /// Speed discretization mode.
    pub sampling: Sampling,
    /// Number of candidate speeds.
    pub speed_samples: usize,
    /// Number of candidate rotations.
    pub rotation_samples: usize,
    /// Width of one ego-centric network input row.
    pub input_dim: usize,
    /// Hidden layer widths of the per-agent encoder.
    pub mlp1_dims: [usize; 3],
    /// Embedding width (encoder projection / value head input).
    pub mlp2_dims: usize,
    /// Whether the external trainer runs multi-agent episodes.
    pub multiagent_training: bool,
}

impl PolicyConfig {
    /// Checks that all fields are in range.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Precondition`] naming the offending field.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.gamma.is_nan() || self.gamma <= 0.0 || self.gamma > 1.0 {
            return Err(PolicyError::Precondition(format!(
                "gamma must be in (0, 1], got {}",
                self.gamma
            )));
        }
        if self.speed_samples == 0 {
            return Err(PolicyError::Precondition(
                "speed_samples must be at least 1".to_string(),
            ));
        }
        if self.rotation_samples == 0 {
            return Err(PolicyError::Precondition(
                "rotation_samples must be at least 1".to_string(),
            ));
        }
        if self.mlp1_dims.iter().any(|&d| d == 0) || self.mlp2_dims == 0 {
            return Err(PolicyError::Precondition(
                "network layer widths must be nonzero".to_string(),
            ));
        }
        Ok(())
    }

    /// Total number of candidate actions, including the stop action.
    pub fn action_count(&self) -> usize {
        self.speed_samples * self.rotation_samples + 1
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            kinematics: Kinematics::Holonomic,
            sampling: Sampling::Exponential,
            speed_samples: 5,
            rotation_samples: 16,
            input_dim: 13,
            mlp1_dims: [150, 100, 100],
            mlp2_dims: 100,
            multiagent_training: true,
        }
    }
}
