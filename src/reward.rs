//! Immediate reward for a state-action transition.
//!
//! Scores one timestep: a fixed penalty for colliding with any observed
//! agent, a bonus for reaching the goal, and a graded discomfort penalty
//! for passing too close. Collision checks use the closest approach between
//! the agents' straight-line motions over the step.

use crate::action::Action;
use crate::dynamics::propagate;
use crate::state::JointState;

/// Reward for colliding with another agent.
pub const COLLISION_PENALTY: f64 = -0.25;

/// Reward for reaching the goal.
pub const GOAL_REWARD: f64 = 1.0;

/// Separation below which discomfort is penalized.
pub const DISCOMFORT_DIST: f64 = 0.2;

/// Slope of the discomfort penalty inside the discomfort zone.
pub const DISCOMFORT_PENALTY_FACTOR: f64 = 0.5;

/// Scores one timestep of `action` taken from `state`.
///
/// Checked in order: collision with any agent, then goal arrival at the end
/// position, then discomfort from the minimum closest approach. Exactly one
/// term applies.
pub fn immediate_reward(state: &JointState, action: &Action, dt: f64) -> f64 {
    let s = &state.self_state;

    // Self velocity over the step, as commanded by the action.
    let (svx, svy) = match *action {
        Action::Holonomic { vx, vy } => (vx, vy),
        Action::Unicycle { rotation, speed } => {
            let heading = s.theta + rotation;
            (speed * heading.cos(), speed * heading.sin())
        }
    };

    let mut dmin = f64::INFINITY;
    let mut collision = false;
    for agent in &state.agent_states {
        // Relative motion of the agent in the self frame over one step.
        let px = agent.px - s.px;
        let py = agent.py - s.py;
        let vx = agent.vx - svx;
        let vy = agent.vy - svy;
        let ex = px + vx * dt;
        let ey = py + vy * dt;
        let closest = point_to_segment_dist(px, py, ex, ey, 0.0, 0.0) - agent.radius - s.radius;
        if closest < 0.0 {
            collision = true;
            break;
        } else if closest < dmin {
            dmin = closest;
        }
    }

    let end = propagate(s, action, dt);
    let dx = end.px - s.gx;
    let dy = end.py - s.gy;
    let reaching_goal = (dx * dx + dy * dy).sqrt() < s.radius;

    if collision {
        COLLISION_PENALTY
    } else if reaching_goal {
        GOAL_REWARD
    } else if dmin < DISCOMFORT_DIST {
        (dmin - DISCOMFORT_DIST) * DISCOMFORT_PENALTY_FACTOR * dt
    } else {
        0.0
    }
}

/// Distance from point `(x3, y3)` to the segment `(x1, y1)-(x2, y2)`.
pub fn point_to_segment_dist(x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> f64 {
    let px = x2 - x1;
    let py = y2 - y1;
    if px == 0.0 && py == 0.0 {
        return ((x3 - x1).powi(2) + (y3 - y1).powi(2)).sqrt();
    }
    let u = (((x3 - x1) * px + (y3 - y1) * py) / (px * px + py * py)).clamp(0.0, 1.0);
    let x = x1 + u * px;
    let y = y1 + u * py;
    ((x3 - x).powi(2) + (y3 - y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ObservedState, SelfState};

    fn self_state() -> SelfState {
        SelfState {
            px: 0.0,
            py: 0.0,
            vx: 0.0,
            vy: 0.0,
            radius: 0.3,
            gx: 5.0,
            gy: 0.0,
            v_pref: 1.0,
            theta: 0.0,
        }
    }

    fn still_agent(px: f64, py: f64) -> ObservedState {
        ObservedState {
            px,
            py,
            vx: 0.0,
            vy: 0.0,
            radius: 0.3,
        }
    }

    #[test]
    fn segment_distance_degenerate() {
        assert!((point_to_segment_dist(1.0, 0.0, 1.0, 0.0, 0.0, 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        // Point beyond the far endpoint.
        let d = point_to_segment_dist(0.0, 0.0, 1.0, 0.0, 2.0, 0.0);
        assert!((d - 1.0).abs() < 1e-12);
        // Point alongside the middle.
        let d = point_to_segment_dist(0.0, 0.0, 2.0, 0.0, 1.0, 1.0);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn collision_is_penalized() {
        // Agent 0.5 m ahead; driving straight at it closes the gap below
        // the 0.6 m combined radius.
        let state = JointState::new(self_state(), vec![still_agent(0.5, 0.0)]);
        let r = immediate_reward(&state, &Action::Holonomic { vx: 1.0, vy: 0.0 }, 0.25);
        assert_eq!(r, COLLISION_PENALTY);
    }

    #[test]
    fn reaching_goal_is_rewarded() {
        let state = JointState::new(
            SelfState {
                px: 4.8,
                ..self_state()
            },
            vec![still_agent(0.0, 3.0)],
        );
        let r = immediate_reward(&state, &Action::Holonomic { vx: 1.0, vy: 0.0 }, 0.25);
        assert_eq!(r, GOAL_REWARD);
    }

    #[test]
    fn near_miss_is_uncomfortable() {
        // Closest approach 0.75 - 0.6 = 0.15, inside the 0.2 m zone.
        let state = JointState::new(self_state(), vec![still_agent(1.0, 0.0)]);
        let r = immediate_reward(&state, &Action::Holonomic { vx: 1.0, vy: 0.0 }, 0.25);
        assert!(r < 0.0);
        assert!(r > COLLISION_PENALTY);
        assert!((r - (0.15 - 0.2) * 0.5 * 0.25).abs() < 1e-12);
    }

    #[test]
    fn clear_path_scores_zero() {
        let state = JointState::new(self_state(), vec![still_agent(0.0, 3.0)]);
        let r = immediate_reward(&state, &Action::Holonomic { vx: 1.0, vy: 0.0 }, 0.25);
        assert_eq!(r, 0.0);
    }

    #[test]
    fn unicycle_velocity_uses_rotated_heading() {
        // Heading straight at the agent; rotating away avoids discomfort.
        let state = JointState::new(self_state(), vec![still_agent(1.0, 0.0)]);
        let toward = immediate_reward(
            &state,
            &Action::Unicycle {
                rotation: 0.0,
                speed: 1.0,
            },
            0.25,
        );
        let away = immediate_reward(
            &state,
            &Action::Unicycle {
                rotation: std::f64::consts::FRAC_PI_4,
                speed: 1.0,
            },
            0.25,
        );
        assert!(toward < away);
    }

    #[test]
    fn empty_agent_set_scores_goal_progress_only() {
        let state = JointState::new(self_state(), vec![]);
        let r = immediate_reward(&state, &Action::Holonomic { vx: 1.0, vy: 0.0 }, 0.25);
        assert_eq!(r, 0.0);
    }
}
