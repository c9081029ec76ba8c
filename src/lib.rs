//! crowdnav - attention-based decision core for crowd navigation.
//!
//! Given the navigating agent's own kinematic state and the observed states
//! of nearby dynamic agents, the policy chooses a motion action balancing
//! goal progress against collision risk. A permutation-commutative
//! attention-pooled value network scores joint states of any agent count;
//! [`AttentionPolicy::predict`] enumerates a discretized action space,
//! simulates one timestep per candidate, and maximizes immediate reward
//! plus the discounted learned value of the resulting state.
//!
//! Training, checkpoint persistence, and the simulation of other agents'
//! ground truth live outside this crate; the network's variable store is
//! exposed for an external trainer.

pub mod action;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod network;
pub mod policy;
pub mod reward;
pub mod state;

pub use action::{Action, ActionSpace, Kinematics, Sampling};
pub use config::PolicyConfig;
pub use error::PolicyError;
pub use network::{AttentionWeights, ValueNetwork, ROTATED_STATE_DIM};
pub use policy::{AttentionPolicy, Phase, PolicyBuilder};
pub use state::{JointState, ObservedState, SelfState, JOINT_STATE_DIM};
