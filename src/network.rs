//! Attention-pooled value network.
//!
//! Maps a batch of joint states — each a variable-count set of
//! `(self, other-agent)` rows — to one scalar value per batch element.
//! Rows are first rotated into the ego-centric frame, encoded independently
//! by a shared MLP, then pooled with softmax attention over the agent axis
//! so the joint representation width is independent of the agent count.

use tch::{nn, nn::Module, Device, Kind, Tensor};

use crate::action::Kinematics;
use crate::config::PolicyConfig;
use crate::error::PolicyError;
use crate::state::JOINT_STATE_DIM;

/// Width of one row after ego-centric rotation.
pub const ROTATED_STATE_DIM: usize = 13;

/// Attention weights over the observed agents of one joint state.
///
/// Nonnegative and summing to 1; diagnostic only.
#[derive(Debug, Clone, PartialEq)]
pub struct AttentionWeights(Vec<f64>);

impl AttentionWeights {
    /// The weights in agent order.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of agents the weights cover.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the weights cover no agents.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rotates world-frame joint-state rows into the ego-centric frame.
///
/// Input is a `(rows, JOINT_STATE_DIM)` tensor; output is
/// `(rows, ROTATED_STATE_DIM)`. The frame is centred on the self position
/// and rotated so the goal lies along the positive x axis. The heading
/// feature is remapped into the rotated frame under unicycle kinematics and
/// zeroed under holonomic kinematics, where it carries no meaning.
pub fn rotate(state: &Tensor, kinematics: Kinematics) -> Tensor {
    // Columns: px py vx vy radius gx gy v_pref theta | px1 py1 vx1 vy1 radius1
    let px = state.select(1, 0);
    let py = state.select(1, 1);
    let vx = state.select(1, 2);
    let vy = state.select(1, 3);
    let radius = state.select(1, 4);
    let gx = state.select(1, 5);
    let gy = state.select(1, 6);
    let v_pref = state.select(1, 7);
    let theta = state.select(1, 8);
    let px1 = state.select(1, 9);
    let py1 = state.select(1, 10);
    let vx1 = state.select(1, 11);
    let vy1 = state.select(1, 12);
    let radius1 = state.select(1, 13);

    let gdx = &gx - &px;
    let gdy = &gy - &py;
    let rot = gdy.atan2(&gdx);
    let cos_rot = rot.cos();
    let sin_rot = rot.sin();

    let dg = (&gdx * &gdx + &gdy * &gdy).sqrt();
    let theta_r = match kinematics {
        Kinematics::Unicycle => &theta - &rot,
        Kinematics::Holonomic => theta.zeros_like(),
    };
    let vx_r = &vx * &cos_rot + &vy * &sin_rot;
    let vy_r = &vy * &cos_rot - &vx * &sin_rot;

    let adx = &px1 - &px;
    let ady = &py1 - &py;
    let px1_r = &adx * &cos_rot + &ady * &sin_rot;
    let py1_r = &ady * &cos_rot - &adx * &sin_rot;
    let vx1_r = &vx1 * &cos_rot + &vy1 * &sin_rot;
    let vy1_r = &vy1 * &cos_rot - &vx1 * &sin_rot;
    let da = (&adx * &adx + &ady * &ady).sqrt();
    let radius_sum = &radius + &radius1;

    Tensor::stack(
        &[
            dg, v_pref, theta_r, radius, vx_r, vy_r, px1_r, py1_r, vx1_r, vy1_r, radius1, da,
            radius_sum,
        ],
        1,
    )
}

/// Value network with softmax attention pooling over the agent axis.
///
/// Per row: rotate → shared encoder (three hidden layers with ReLU plus a
/// linear projection to the embedding width) → scalar attention score.
/// Scores are softmaxed across each sample's agents; the weighted sum of
/// embeddings feeds a linear value head.
pub struct ValueNetwork {
    vs: nn::VarStore,
    kinematics: Kinematics,
    mlp1: nn::Sequential,
    attention: nn::Linear,
    value_head: nn::Linear,
    embedding_dim: i64,
}

impl ValueNetwork {
    /// Creates a new value network from the policy configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Precondition`] if `config.input_dim` does not
    /// match the rotated row width.
    pub fn new(config: &PolicyConfig, device: Device) -> Result<Self, PolicyError> {
        if config.input_dim != ROTATED_STATE_DIM {
            return Err(PolicyError::Precondition(format!(
                "input_dim must equal the rotated row width {ROTATED_STATE_DIM}, got {}",
                config.input_dim
            )));
        }
        config.validate()?;

        let vs = nn::VarStore::new(device);
        let p = &vs.root();
        let [h0, h1, h2] = config.mlp1_dims.map(|d| d as i64);
        let embedding_dim = config.mlp2_dims as i64;

        let mlp1 = nn::seq()
            .add(nn::linear(
                p / "mlp1_l1",
                config.input_dim as i64,
                h0,
                Default::default(),
            ))
            .add_fn(|x| x.relu())
            .add(nn::linear(p / "mlp1_l2", h0, h1, Default::default()))
            .add_fn(|x| x.relu())
            .add(nn::linear(p / "mlp1_l3", h1, h2, Default::default()))
            .add_fn(|x| x.relu())
            .add(nn::linear(
                p / "mlp1_proj",
                h2,
                embedding_dim,
                Default::default(),
            ));
        let attention = nn::linear(p / "attention", embedding_dim, 1, Default::default());
        let value_head = nn::linear(p / "value", embedding_dim, 1, Default::default());

        Ok(Self {
            vs,
            kinematics: config.kinematics,
            mlp1,
            attention,
            value_head,
            embedding_dim,
        })
    }

    /// Forward pass over a `(batch, agents, JOINT_STATE_DIM)` tensor.
    ///
    /// Returns one scalar value per batch element as a `(batch, 1)` tensor,
    /// paired with the attention weights of the first sample in the batch.
    ///
    /// Reordering a sample's agents permutes the weights identically and
    /// leaves the value unchanged up to floating-point tolerance. Not safe
    /// for concurrent calls on one instance.
    ///
    /// # Errors
    ///
    /// [`PolicyError::DimensionMismatch`] if rows are not
    /// [`JOINT_STATE_DIM`] wide, [`PolicyError::EmptyAgentSet`] if the
    /// agent axis is empty.
    pub fn forward(&self, state: &Tensor) -> Result<(Tensor, AttentionWeights), PolicyError> {
        let size = state.size();
        let [batch, agents, width] = size[..] else {
            return Err(PolicyError::Precondition(format!(
                "expected a (batch, agents, row) tensor, got {} dimensions",
                size.len()
            )));
        };
        if width != JOINT_STATE_DIM as i64 {
            return Err(PolicyError::DimensionMismatch {
                expected: JOINT_STATE_DIM,
                actual: width as usize,
            });
        }
        if agents == 0 {
            return Err(PolicyError::EmptyAgentSet);
        }

        let rotated = rotate(&state.reshape([-1, width]), self.kinematics);
        let embeddings = self.mlp1.forward(&rotated);
        let scores = self
            .attention
            .forward(&embeddings)
            .reshape([batch, agents]);
        let weights = scores.softmax(1, Kind::Float);

        let first: Vec<f64> = Vec::<f64>::try_from(&weights.get(0).to_kind(Kind::Double))
            .map_err(|e| PolicyError::Collaborator(e.to_string()))?;

        let features = embeddings.reshape([batch, agents, self.embedding_dim]);
        let pooled =
            (weights.unsqueeze(-1) * features).sum_dim_intlist([1].as_slice(), false, Kind::Float);
        let value = self.value_head.forward(&pooled);

        Ok((value, AttentionWeights(first)))
    }

    /// The kinematics mode the rotation uses.
    pub fn kinematics(&self) -> Kinematics {
        self.kinematics
    }

    /// Returns a reference to the variable store (for an external trainer
    /// or checkpointing).
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Returns a mutable reference to the variable store.
    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{JointState, ObservedState, SelfState};

    fn network(kinematics: Kinematics) -> ValueNetwork {
        let config = PolicyConfig {
            kinematics,
            ..PolicyConfig::default()
        };
        ValueNetwork::new(&config, Device::Cpu).expect("valid config")
    }

    fn joint_state(agents: Vec<ObservedState>) -> JointState {
        JointState::new(
            SelfState {
                px: 0.0,
                py: 0.0,
                vx: 0.3,
                vy: -0.1,
                radius: 0.3,
                gx: 4.0,
                gy: 3.0,
                v_pref: 1.0,
                theta: 0.5,
            },
            agents,
        )
    }

    fn agent(px: f64, py: f64, vx: f64, vy: f64) -> ObservedState {
        ObservedState {
            px,
            py,
            vx,
            vy,
            radius: 0.3,
        }
    }

    #[test]
    fn rotate_puts_goal_straight_ahead() {
        let state = joint_state(vec![agent(1.0, 1.0, 0.0, 0.0)]);
        let rotated = rotate(&state.to_tensor(Device::Cpu), Kinematics::Holonomic);
        assert_eq!(rotated.size(), &[1, ROTATED_STATE_DIM as i64]);
        // dg is the goal distance, 5 for a (4, 3) offset.
        assert!((rotated.double_value(&[0, 0]) - 5.0).abs() < 1e-5);
        // Holonomic heading is zeroed.
        assert_eq!(rotated.double_value(&[0, 2]), 0.0);
    }

    #[test]
    fn rotate_is_translation_invariant() {
        let base = joint_state(vec![agent(1.0, 0.5, 0.2, 0.0)]);
        let mut shifted = base.clone();
        shifted.self_state.px += 7.0;
        shifted.self_state.py -= 2.0;
        shifted.self_state.gx += 7.0;
        shifted.self_state.gy -= 2.0;
        shifted.agent_states[0].px += 7.0;
        shifted.agent_states[0].py -= 2.0;

        let a = rotate(&base.to_tensor(Device::Cpu), Kinematics::Unicycle);
        let b = rotate(&shifted.to_tensor(Device::Cpu), Kinematics::Unicycle);
        let diff: f64 = (&a - &b).abs().max().double_value(&[]);
        assert!(diff < 1e-4);
    }

    #[test]
    fn rotate_keeps_unicycle_heading() {
        let state = joint_state(vec![agent(1.0, 1.0, 0.0, 0.0)]);
        let rotated = rotate(&state.to_tensor(Device::Cpu), Kinematics::Unicycle);
        let rot = (3.0f64 / 4.0).atan(); // atan2(gy, gx)
        assert!((rotated.double_value(&[0, 2]) - (0.5 - rot)).abs() < 1e-5);
    }

    #[test]
    fn forward_returns_one_value_per_sample() {
        let net = network(Kinematics::Holonomic);
        let state = Tensor::randn([4, 3, JOINT_STATE_DIM as i64], (Kind::Float, Device::Cpu));
        let (value, weights) = net.forward(&state).expect("forward");
        assert_eq!(value.size(), &[4, 1]);
        assert_eq!(weights.len(), 3);
    }

    #[test]
    fn attention_weights_are_a_distribution() {
        let net = network(Kinematics::Holonomic);
        let state = joint_state(vec![
            agent(1.0, 0.0, 0.0, 0.0),
            agent(-2.0, 1.0, 0.5, 0.0),
            agent(0.0, 3.0, -0.3, 0.2),
        ]);
        let batch = state.to_tensor(Device::Cpu).unsqueeze(0);
        let (_, weights) = net.forward(&batch).expect("forward");
        assert_eq!(weights.len(), 3);
        let sum: f64 = weights.as_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(weights.as_slice().iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn value_is_permutation_commutative() {
        let net = network(Kinematics::Holonomic);
        let a = agent(1.0, 0.0, 0.0, 0.0);
        let b = agent(-2.0, 1.0, 0.5, -0.4);
        let forward_order = joint_state(vec![a, b]).to_tensor(Device::Cpu).unsqueeze(0);
        let reverse_order = joint_state(vec![b, a]).to_tensor(Device::Cpu).unsqueeze(0);

        let (v1, w1) = net.forward(&forward_order).expect("forward");
        let (v2, w2) = net.forward(&reverse_order).expect("forward");
        assert!((v1.double_value(&[0, 0]) - v2.double_value(&[0, 0])).abs() < 1e-5);
        assert!((w1.as_slice()[0] - w2.as_slice()[1]).abs() < 1e-5);
        assert!((w1.as_slice()[1] - w2.as_slice()[0]).abs() < 1e-5);
    }

    #[test]
    fn wrong_row_width_is_rejected() {
        let net = network(Kinematics::Holonomic);
        let state = Tensor::randn([1, 2, 10], (Kind::Float, Device::Cpu));
        let err = net.forward(&state).err().expect("must fail");
        assert_eq!(
            err,
            PolicyError::DimensionMismatch {
                expected: JOINT_STATE_DIM,
                actual: 10,
            }
        );
    }

    #[test]
    fn empty_agent_axis_is_rejected() {
        let net = network(Kinematics::Holonomic);
        let state = Tensor::zeros([1, 0, JOINT_STATE_DIM as i64], (Kind::Float, Device::Cpu));
        let err = net.forward(&state).err().expect("must fail");
        assert_eq!(err, PolicyError::EmptyAgentSet);
    }

    #[test]
    fn mismatched_input_dim_fails_construction() {
        let config = PolicyConfig {
            input_dim: 14,
            ..PolicyConfig::default()
        };
        assert!(matches!(
            ValueNetwork::new(&config, Device::Cpu),
            Err(PolicyError::Precondition(_))
        ));
    }
}
