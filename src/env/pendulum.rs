//! Torque-limited pendulum swing-up.
//!
//! State: angle θ from upright (0 = balanced) and angular velocity ω.
//! Observation: `[cos θ, sin θ, ω]`. Action: `[τ]` in `[-1, 1]`, scaled by
//! `MAX_TORQUE`. Reward penalises distance from upright, spin and effort.
//! The episode reports `solved` while the pole is held near vertical.

use image::Rgb;
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{Env, EnvError, Frame, RenderMode, StepInfo, Transition};

const GRAVITY: f64 = 9.81;
const LENGTH: f64 = 1.0;
const MASS: f64 = 1.0;
const DT: f64 = 0.05;
const MAX_TORQUE: f64 = 2.0;
const MAX_SPEED: f64 = 8.0;
const SOLVED_ANGLE: f64 = 0.15;
const SOLVED_SPEED: f64 = 0.5;

const FRAME_SIZE: u32 = 64;
const BACKGROUND: Rgb<u8> = Rgb([240, 240, 240]);
const ROD: Rgb<u8> = Rgb([200, 60, 40]);
const PIVOT: Rgb<u8> = Rgb([30, 30, 30]);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendulumState {
    pub theta: f64,
    pub omega: f64,
    pub t: usize,
}

#[derive(Debug, Clone)]
pub struct Pendulum {
    state: PendulumState,
    max_steps: usize,
}

impl Pendulum {
    pub fn new(max_steps: usize) -> Self {
        Self {
            state: PendulumState {
                theta: std::f64::consts::PI,
                omega: 0.0,
                t: 0,
            },
            max_steps,
        }
    }

    pub fn state(&self) -> &PendulumState {
        &self.state
    }

    fn is_upright(&self) -> bool {
        angle_normalize(self.state.theta).abs() < SOLVED_ANGLE && self.state.omega.abs() < SOLVED_SPEED
    }

    fn draw(&self) -> Frame {
        let mut frame = Frame::from_pixel(FRAME_SIZE, FRAME_SIZE, BACKGROUND);
        let c = FRAME_SIZE as f32 / 2.0;
        let reach = c * 0.8;
        // θ = 0 points up; image y grows downwards.
        let theta = self.state.theta as f32;
        let tip = (c + reach * theta.sin(), c - reach * theta.cos());
        draw_line_segment_mut(&mut frame, (c, c), tip, ROD);
        draw_filled_circle_mut(&mut frame, (c as i32, c as i32), 2, PIVOT);
        frame
    }
}

impl Default for Pendulum {
    fn default() -> Self {
        Self::new(200)
    }
}

impl Env for Pendulum {
    type State = PendulumState;

    fn observation_dim(&self) -> usize {
        3
    }

    fn action_dim(&self) -> usize {
        1
    }

    fn reset(&mut self, seed: u64) -> Result<Vec<f64>, EnvError> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.state = PendulumState {
            theta: std::f64::consts::PI + rng.gen_range(-0.2..0.2),
            omega: rng.gen_range(-0.2..0.2),
            t: 0,
        };
        Ok(self.observe())
    }

    fn get_state(&self) -> Self::State {
        self.state
    }

    fn set_state(&mut self, state: &Self::State) -> Result<(), EnvError> {
        if !state.theta.is_finite() || !state.omega.is_finite() {
            return Err(EnvError::State(format!("non-finite pendulum state {state:?}")));
        }
        self.state = *state;
        Ok(())
    }

    fn observe(&self) -> Vec<f64> {
        vec![self.state.theta.cos(), self.state.theta.sin(), self.state.omega]
    }

    fn step(&mut self, action: &[f64], mode: RenderMode) -> Result<Transition, EnvError> {
        if action.len() != 1 {
            return Err(EnvError::ActionDim {
                expected: 1,
                got: action.len(),
            });
        }
        if !action[0].is_finite() {
            return Err(EnvError::Step {
                step: self.state.t,
                reason: format!("non-finite torque {}", action[0]),
            });
        }
        let u = action[0].clamp(-1.0, 1.0) * MAX_TORQUE;
        let PendulumState { theta, omega, t } = self.state;

        let cost = angle_normalize(theta).powi(2) + 0.1 * omega.powi(2) + 0.001 * u.powi(2);

        // Semi-implicit Euler; gravity pulls away from upright.
        let alpha = GRAVITY / LENGTH * theta.sin() + u / (MASS * LENGTH * LENGTH);
        let omega = (omega + alpha * DT).clamp(-MAX_SPEED, MAX_SPEED);
        let theta = theta + omega * DT;
        self.state = PendulumState {
            theta,
            omega,
            t: t + 1,
        };

        Ok(Transition {
            observation: self.observe(),
            reward: -cost,
            done: self.state.t >= self.max_steps,
            info: StepInfo::solved(self.is_upright()),
            frame: mode.wants_frames().then(|| self.draw()),
        })
    }

    fn render_frame(&self) -> Result<Frame, EnvError> {
        Ok(self.draw())
    }
}

fn angle_normalize(theta: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    (theta + std::f64::consts::PI).rem_euclid(two_pi) - std::f64::consts::PI
}
