//! Planar point mass that has to reach a goal and stop there.
//!
//! Actions are a 2D force in `[-1, 1]^2`. The goal is drawn from the reset
//! seed, so two resets with the same seed give the same task.

use image::Rgb;
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{Env, EnvError, Frame, RenderMode, StepInfo, Transition};

const DT: f64 = 0.1;
const DAMPING: f64 = 0.1;
const ARENA: f64 = 1.0;
const GOAL_RADIUS: f64 = 0.05;

const FRAME_SIZE: u32 = 64;
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GOAL: Rgb<u8> = Rgb([40, 160, 40]);
const MASS: Rgb<u8> = Rgb([40, 40, 200]);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointMassState {
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub goal: [f64; 2],
    pub t: usize,
}

#[derive(Debug, Clone)]
pub struct PointMass {
    state: PointMassState,
    max_steps: usize,
}

impl PointMass {
    pub fn new(max_steps: usize) -> Self {
        Self {
            state: PointMassState {
                position: [0.0; 2],
                velocity: [0.0; 2],
                goal: [0.5, 0.5],
                t: 0,
            },
            max_steps,
        }
    }

    fn distance_to_goal(&self) -> f64 {
        let dx = self.state.position[0] - self.state.goal[0];
        let dy = self.state.position[1] - self.state.goal[1];
        (dx * dx + dy * dy).sqrt()
    }

    fn draw(&self) -> Frame {
        let mut frame = Frame::from_pixel(FRAME_SIZE, FRAME_SIZE, BACKGROUND);
        let to_px = |v: f64| ((v + ARENA) / (2.0 * ARENA) * (FRAME_SIZE - 1) as f64).round() as f32;
        let (gx, gy) = (to_px(self.state.goal[0]), to_px(-self.state.goal[1]));
        let (px, py) = (to_px(self.state.position[0]), to_px(-self.state.position[1]));
        draw_line_segment_mut(&mut frame, (gx - 2.0, gy), (gx + 2.0, gy), GOAL);
        draw_line_segment_mut(&mut frame, (gx, gy - 2.0), (gx, gy + 2.0), GOAL);
        draw_filled_circle_mut(&mut frame, (px as i32, py as i32), 1, MASS);
        frame
    }
}

impl Default for PointMass {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Env for PointMass {
    type State = PointMassState;

    fn observation_dim(&self) -> usize {
        6
    }

    fn action_dim(&self) -> usize {
        2
    }

    fn reset(&mut self, seed: u64) -> Result<Vec<f64>, EnvError> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.state = PointMassState {
            position: [0.0; 2],
            velocity: [0.0; 2],
            goal: [
                rng.gen_range(-0.8 * ARENA..0.8 * ARENA),
                rng.gen_range(-0.8 * ARENA..0.8 * ARENA),
            ],
            t: 0,
        };
        Ok(self.observe())
    }

    fn get_state(&self) -> Self::State {
        self.state
    }

    fn set_state(&mut self, state: &Self::State) -> Result<(), EnvError> {
        self.state = *state;
        Ok(())
    }

    fn observe(&self) -> Vec<f64> {
        let s = &self.state;
        vec![
            s.position[0],
            s.position[1],
            s.velocity[0],
            s.velocity[1],
            s.goal[0] - s.position[0],
            s.goal[1] - s.position[1],
        ]
    }

    fn step(&mut self, action: &[f64], mode: RenderMode) -> Result<Transition, EnvError> {
        if action.len() != 2 {
            return Err(EnvError::ActionDim {
                expected: 2,
                got: action.len(),
            });
        }
        if action.iter().any(|a| !a.is_finite()) {
            return Err(EnvError::Step {
                step: self.state.t,
                reason: format!("non-finite force {action:?}"),
            });
        }
        let s = &mut self.state;
        for i in 0..2 {
            let force = action[i].clamp(-1.0, 1.0);
            s.velocity[i] = (1.0 - DAMPING) * s.velocity[i] + force * DT;
            s.position[i] = (s.position[i] + s.velocity[i] * DT).clamp(-ARENA, ARENA);
        }
        s.t += 1;

        let distance = self.distance_to_goal();
        let effort = action.iter().map(|a| a * a).sum::<f64>();
        Ok(Transition {
            observation: self.observe(),
            reward: -distance - 0.01 * effort,
            done: self.state.t >= self.max_steps,
            info: StepInfo::solved(distance < GOAL_RADIUS),
            frame: mode.wants_frames().then(|| self.draw()),
        })
    }

    fn render_frame(&self) -> Result<Frame, EnvError> {
        Ok(self.draw())
    }
}
