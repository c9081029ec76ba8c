//! One-timestep dynamics used by the lookahead.
//!
//! The navigating agent advances under a candidate action; observed agents
//! advance under zero-acceleration extrapolation of their current velocity.

use std::f64::consts::TAU;

use crate::action::Action;
use crate::state::{ObservedState, SelfState};

/// Advances the navigating agent one timestep under `action`.
///
/// Holonomic actions set the velocity directly. Unicycle actions first add
/// the rotation to the heading (wrapped to `[0, 2π)`), then move forward at
/// the commanded speed along the new heading.
pub fn propagate(state: &SelfState, action: &Action, dt: f64) -> SelfState {
    match *action {
        Action::Holonomic { vx, vy } => SelfState {
            px: state.px + vx * dt,
            py: state.py + vy * dt,
            vx,
            vy,
            ..*state
        },
        Action::Unicycle { rotation, speed } => {
            let theta = (state.theta + rotation).rem_euclid(TAU);
            let vx = speed * theta.cos();
            let vy = speed * theta.sin();
            SelfState {
                px: state.px + vx * dt,
                py: state.py + vy * dt,
                vx,
                vy,
                theta,
                ..*state
            }
        }
    }
}

/// Advances an observed agent one timestep at its current velocity.
pub fn propagate_observed(state: &ObservedState, dt: f64) -> ObservedState {
    ObservedState {
        px: state.px + state.vx * dt,
        py: state.py + state.vy * dt,
        ..*state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn self_state() -> SelfState {
        SelfState {
            px: 1.0,
            py: 2.0,
            vx: 0.0,
            vy: 0.0,
            radius: 0.3,
            gx: 5.0,
            gy: 0.0,
            v_pref: 1.0,
            theta: 0.0,
        }
    }

    #[test]
    fn holonomic_moves_along_commanded_velocity() {
        let next = propagate(&self_state(), &Action::Holonomic { vx: 1.0, vy: -2.0 }, 0.25);
        assert!((next.px - 1.25).abs() < 1e-12);
        assert!((next.py - 1.5).abs() < 1e-12);
        assert_eq!(next.vx, 1.0);
        assert_eq!(next.vy, -2.0);
    }

    #[test]
    fn unicycle_rotates_then_moves() {
        let next = propagate(
            &self_state(),
            &Action::Unicycle {
                rotation: FRAC_PI_2,
                speed: 1.0,
            },
            1.0,
        );
        assert!((next.theta - FRAC_PI_2).abs() < 1e-12);
        assert!((next.px - 1.0).abs() < 1e-12);
        assert!((next.py - 3.0).abs() < 1e-12);
        assert!(next.vx.abs() < 1e-12);
        assert!((next.vy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unicycle_heading_wraps() {
        let state = SelfState {
            theta: TAU - 0.1,
            ..self_state()
        };
        let next = propagate(
            &state,
            &Action::Unicycle {
                rotation: 0.2,
                speed: 0.0,
            },
            1.0,
        );
        assert!((next.theta - 0.1).abs() < 1e-12);
    }

    #[test]
    fn observed_agent_extrapolates_velocity() {
        let agent = ObservedState {
            px: 0.0,
            py: 0.0,
            vx: 2.0,
            vy: -1.0,
            radius: 0.3,
        };
        let next = propagate_observed(&agent, 0.5);
        assert!((next.px - 1.0).abs() < 1e-12);
        assert!((next.py + 0.5).abs() < 1e-12);
        assert_eq!(next.vx, agent.vx);
        assert_eq!(next.vy, agent.vy);
    }
}
