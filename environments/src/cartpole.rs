use std::{collections::HashMap, f32::consts::PI};

use log::info;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{Environment, Step};

const GRAVITY: f32 = 9.8;
const CART_MASS: f32 = 1.0;
const POLE_MASS: f32 = 0.1;
const POLE_LENGTH: f32 = 0.5;
const FORCE_MAG: f32 = 10.0;
const DT: f32 = 0.02;
const X_THRESHOLD: f32 = 2.4;
const THETA_THRESHOLD: f32 = 12.0 * PI / 180.0;
const MAX_STEPS: u32 = 500;
const INIT_RANGE: f32 = 0.05;

/// The classic cart-pole balancing task.
///
/// Action `0` pushes the cart left, `1` pushes it right. Every step the pole stays up is
/// worth a reward of one; episodes are truncated after 500 steps.
#[derive(Debug)]
pub struct CartPole {
    x: f32,
    x_dot: f32,
    theta: f32,
    theta_dot: f32,
    ticks: u32,
    rng: StdRng,
}

impl CartPole {
    pub fn new(seed: u64) -> Self {
        Self {
            x: 0.,
            x_dot: 0.,
            theta: 0.,
            theta_dot: 0.,
            ticks: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn state(&self) -> Vec<f32> {
        vec![self.x, self.x_dot, self.theta, self.theta_dot]
    }
}

impl Environment for CartPole {
    fn reset(&mut self) -> Vec<f32> {
        self.x = self.rng.random_range(-INIT_RANGE..INIT_RANGE);
        self.x_dot = self.rng.random_range(-INIT_RANGE..INIT_RANGE);
        self.theta = self.rng.random_range(-INIT_RANGE..INIT_RANGE);
        self.theta_dot = self.rng.random_range(-INIT_RANGE..INIT_RANGE);
        self.ticks = 0;
        self.state()
    }

    fn step(&mut self, action: usize) -> Step {
        let force = if action == 1 { FORCE_MAG } else { -FORCE_MAG };

        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let total_mass = CART_MASS + POLE_MASS;
        let pole_mass_length = POLE_MASS * POLE_LENGTH;

        let temp =
            (force + pole_mass_length * self.theta_dot * self.theta_dot * sin_theta) / total_mass;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (POLE_LENGTH * (4.0 / 3.0 - POLE_MASS * cos_theta * cos_theta / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        self.x += DT * self.x_dot;
        self.x_dot += DT * x_acc;
        self.theta += DT * self.theta_dot;
        self.theta_dot += DT * theta_acc;
        self.ticks += 1;

        let fell = self.x.abs() > X_THRESHOLD || self.theta.abs() > THETA_THRESHOLD;
        let truncated = self.ticks >= MAX_STEPS;

        Step {
            state: self.state(),
            reward: 1.,
            done: fell || truncated,
            info: HashMap::from([("truncated", if truncated && !fell { 1. } else { 0. })]),
        }
    }

    fn render(&mut self) {
        const WIDTH: usize = 41;

        let pos = (self.x + X_THRESHOLD) / (2. * X_THRESHOLD) * (WIDTH - 1) as f32;
        let pos = pos.clamp(0., (WIDTH - 1) as f32) as usize;
        let pole = if self.theta > 0.05 {
            '/'
        } else if self.theta < -0.05 {
            '\\'
        } else {
            '|'
        };

        let track: String = (0..WIDTH).map(|i| if i == pos { pole } else { '_' }).collect();
        info!(tick = self.ticks; "{track}");
    }

    fn actions(&self) -> usize {
        2
    }

    fn observation_size(&self) -> usize {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_is_reproducible() {
        let a = CartPole::new(3).reset();
        let b = CartPole::new(3).reset();
        assert_eq!(a, b);
        assert!(a.iter().all(|v| v.abs() <= INIT_RANGE));
    }

    #[test]
    fn pushing_one_way_ends_the_episode() {
        let mut env = CartPole::new(0);
        env.reset();

        let steps = (1..=MAX_STEPS).find(|_| env.step(1).done).unwrap();
        assert!(steps < MAX_STEPS, "took {steps} steps");
    }
}
