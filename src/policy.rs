//! One-step-lookahead decision procedure over the attention value network.
//!
//! [`AttentionPolicy`] enumerates a discretized candidate action set,
//! simulates one timestep of dynamics per candidate, and combines the
//! immediate reward with the discounted learned value of the resulting
//! state. A policy is built through [`PolicyBuilder`], which refuses to
//! construct one until phase and device are set — there are no runtime
//! presence checks inside `predict`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tch::{Device, Tensor};
use tracing::{debug, info};

use crate::action::{Action, ActionSpace};
use crate::config::PolicyConfig;
use crate::dynamics::{propagate, propagate_observed};
use crate::error::PolicyError;
use crate::network::{AttentionWeights, ValueNetwork};
use crate::reward::immediate_reward;
use crate::state::{JointState, JOINT_STATE_DIM};

/// Execution phase of the policy.
///
/// The exploration rate only exists in the training phase, so it can never
/// be unset when it is needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Greedy action selection; fully deterministic given the model.
    Eval,
    /// Epsilon-greedy: with probability `epsilon` a uniformly random
    /// candidate is returned instead of the lookahead maximizer.
    Train { epsilon: f64 },
}

impl Phase {
    /// Returns true in the training phase.
    pub fn is_train(&self) -> bool {
        matches!(self, Phase::Train { .. })
    }
}

/// Builder enforcing that a predict-capable policy cannot exist until all
/// required fields are set.
pub struct PolicyBuilder {
    config: PolicyConfig,
    phase: Option<Phase>,
    device: Option<Device>,
    time_step: f64,
    seed: Option<u64>,
}

impl PolicyBuilder {
    /// Starts a builder from a typed configuration.
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            phase: None,
            device: None,
            time_step: 0.25,
            seed: None,
        }
    }

    /// Sets the execution phase (required).
    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Sets the compute device (required).
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Sets the simulated timestep duration (default 0.25 s).
    pub fn time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Seeds the exploration RNG for reproducible training runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Precondition`] if phase or device is unset,
    /// the exploration rate lies outside `[0, 1]`, the timestep is not
    /// positive, or the configuration is invalid.
    pub fn build(self) -> Result<AttentionPolicy, PolicyError> {
        let phase = self
            .phase
            .ok_or_else(|| PolicyError::Precondition("phase must be set".to_string()))?;
        let device = self
            .device
            .ok_or_else(|| PolicyError::Precondition("device must be set".to_string()))?;
        check_exploration_rate(phase)?;
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(PolicyError::Precondition(format!(
                "time step must be positive, got {}",
                self.time_step
            )));
        }
        self.config.validate()?;

        let model = ValueNetwork::new(&self.config, device)?;
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            "attention policy: {} training, {} candidate actions",
            if self.config.multiagent_training {
                "multi-agent"
            } else {
                "single-agent"
            },
            self.config.action_count()
        );

        Ok(AttentionPolicy {
            config: self.config,
            phase,
            device,
            time_step: self.time_step,
            model,
            rng,
            attention_weights: None,
            last_state: None,
        })
    }
}

/// Crowd-navigation policy with an attention-pooled value network.
pub struct AttentionPolicy {
    config: PolicyConfig,
    phase: Phase,
    device: Device,
    time_step: f64,
    model: ValueNetwork,
    rng: StdRng,
    attention_weights: Option<AttentionWeights>,
    last_state: Option<Tensor>,
}

impl AttentionPolicy {
    /// Selects a motion action for the given joint state.
    ///
    /// Returns the stop action immediately once the goal is reached.
    /// Otherwise every candidate action is scored by
    /// `R(s, a) + γ^v_pref · V(s')`, where `s'` is the joint state after one
    /// simulated timestep; the maximizer wins, ties resolved by first-seen
    /// enumeration order. In the training phase an epsilon draw may replace
    /// the lookahead with a uniformly random candidate, and the flattened
    /// current state is cached for the external replay mechanism.
    ///
    /// # Errors
    ///
    /// [`PolicyError::EmptyAgentSet`] if no agents are observed (and the
    /// goal is not yet reached); collaborator and dimension errors
    /// propagate unmodified.
    pub fn predict(&mut self, state: &JointState) -> Result<Action, PolicyError> {
        if state.self_state.reached_goal() {
            return Ok(Action::stop(self.config.kinematics));
        }
        if state.agent_states.is_empty() {
            return Err(PolicyError::EmptyAgentSet);
        }

        let space = self.build_action_space(state.self_state.v_pref)?;

        let explore = match self.phase {
            Phase::Train { epsilon } => self.rng.gen::<f64>() < epsilon,
            Phase::Eval => false,
        };

        let action = if explore {
            let index = self.rng.gen_range(0..space.len());
            debug!(index, "exploration pick");
            *space.get(index).ok_or_else(|| {
                PolicyError::Collaborator("candidate index out of range".to_string())
            })?
        } else {
            let values = self.evaluate_candidates(state, &space)?;
            let mut best = 0;
            for (i, &value) in values.iter().enumerate() {
                if value > values[best] {
                    best = i;
                }
            }
            *space.get(best).ok_or_else(|| {
                PolicyError::Collaborator("candidate index out of range".to_string())
            })?
        };

        if self.phase.is_train() {
            self.last_state = Some(self.transform(state)?);
        }

        Ok(action)
    }

    /// Scores every candidate action by one-step lookahead.
    ///
    /// Returns `(action, score)` pairs in enumeration order; `predict`
    /// selects the first maximum of exactly these scores.
    pub fn action_values(
        &mut self,
        state: &JointState,
    ) -> Result<Vec<(Action, f64)>, PolicyError> {
        if state.agent_states.is_empty() {
            return Err(PolicyError::EmptyAgentSet);
        }
        let space = self.build_action_space(state.self_state.v_pref)?;
        let values = self.evaluate_candidates(state, &space)?;
        Ok(space.iter().copied().zip(values).collect())
    }

    /// Converts a joint state into one row per agent for the external
    /// trainer: identical self-state prefix, one distinct agent suffix.
    ///
    /// # Errors
    ///
    /// [`PolicyError::EmptyAgentSet`] if no agents are observed.
    pub fn transform(&self, state: &JointState) -> Result<Tensor, PolicyError> {
        if state.agent_states.is_empty() {
            return Err(PolicyError::EmptyAgentSet);
        }
        Ok(state.to_tensor(self.device))
    }

    /// Attention weights from the most recent network forward pass, if one
    /// has occurred. Overwritten on every lookahead evaluation.
    pub fn attention_weights(&self) -> Option<&AttentionWeights> {
        self.attention_weights.as_ref()
    }

    /// The flattened state cached by the last training-phase `predict`.
    pub fn last_state(&self) -> Option<&Tensor> {
        self.last_state.as_ref()
    }

    /// The execution phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Switches the execution phase, e.g. to anneal the exploration rate
    /// between training episodes. The model is untouched.
    ///
    /// # Errors
    ///
    /// [`PolicyError::Precondition`] if a training exploration rate lies
    /// outside `[0, 1]`.
    pub fn set_phase(&mut self, phase: Phase) -> Result<(), PolicyError> {
        check_exploration_rate(phase)?;
        self.phase = phase;
        Ok(())
    }

    /// The compute device all evaluation tensors live on.
    pub fn device(&self) -> Device {
        self.device
    }

    /// The simulated timestep duration.
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// The policy configuration.
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// The underlying value network (for an external trainer).
    pub fn model(&self) -> &ValueNetwork {
        &self.model
    }

    /// Mutable access to the value network (for an external trainer).
    pub fn model_mut(&mut self) -> &mut ValueNetwork {
        &mut self.model
    }

    fn build_action_space(&self, v_pref: f64) -> Result<ActionSpace, PolicyError> {
        ActionSpace::build(
            v_pref,
            self.config.kinematics,
            self.config.sampling,
            self.config.speed_samples,
            self.config.rotation_samples,
        )
    }

    /// One lookahead score per candidate, in enumeration order.
    fn evaluate_candidates(
        &mut self,
        state: &JointState,
        space: &ActionSpace,
    ) -> Result<Vec<f64>, PolicyError> {
        let discount = self.config.gamma.powf(state.self_state.v_pref);
        let agent_count = state.agent_states.len();
        let mut values = Vec::with_capacity(space.len());

        for action in space.iter() {
            let next_self = propagate(&state.self_state, action, self.time_step);
            let prefix = next_self.features();

            let mut flat = Vec::with_capacity(agent_count * JOINT_STATE_DIM);
            for agent in &state.agent_states {
                let next_agent = propagate_observed(agent, self.time_step);
                flat.extend(prefix.iter().map(|&v| v as f32));
                flat.extend(next_agent.features().iter().map(|&v| v as f32));
            }
            let batch = Tensor::from_slice(&flat)
                .reshape([1, agent_count as i64, JOINT_STATE_DIM as i64])
                .to_device(self.device);

            let (value, weights) = self.model.forward(&batch)?;
            self.attention_weights = Some(weights);

            let score =
                immediate_reward(state, action, self.time_step) + discount * value.double_value(&[0, 0]);
            values.push(score);
        }

        Ok(values)
    }
}

fn check_exploration_rate(phase: Phase) -> Result<(), PolicyError> {
    if let Phase::Train { epsilon } = phase {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(PolicyError::Precondition(format!(
                "exploration rate must be in [0, 1], got {epsilon}"
            )));
        }
    }
    Ok(())
}
