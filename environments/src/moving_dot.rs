use std::collections::HashMap;

use log::info;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{Environment, Step};

const SIZE: i32 = 10;
const MAX_STEPS: u32 = 1000;

/// A dot on a square grid that has to be moved towards the centre.
///
/// Actions are `0` noop, `1` right, `2` left, `3` down and `4` up. A step is rewarded with
/// `+1` when it brings the dot closer to the centre and `-1` when it moves it away.
#[derive(Debug)]
pub struct MovingDot {
    pos: (i32, i32),
    ticks: u32,
    rng: StdRng,
}

impl MovingDot {
    pub fn new(seed: u64) -> Self {
        Self {
            pos: (0, 0),
            ticks: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn distance(&self) -> i32 {
        let centre = SIZE / 2;
        (self.pos.0 - centre).abs() + (self.pos.1 - centre).abs()
    }

    fn state(&self) -> Vec<f32> {
        let scale = (SIZE - 1) as f32;
        vec![self.pos.0 as f32 / scale, self.pos.1 as f32 / scale]
    }
}

impl Environment for MovingDot {
    fn reset(&mut self) -> Vec<f32> {
        self.pos = (self.rng.random_range(0..SIZE), self.rng.random_range(0..SIZE));
        self.ticks = 0;
        self.state()
    }

    fn step(&mut self, action: usize) -> Step {
        let before = self.distance();
        let (dx, dy) = match action {
            1 => (1, 0),
            2 => (-1, 0),
            3 => (0, 1),
            4 => (0, -1),
            _ => (0, 0),
        };

        self.pos.0 = (self.pos.0 + dx).clamp(0, SIZE - 1);
        self.pos.1 = (self.pos.1 + dy).clamp(0, SIZE - 1);
        self.ticks += 1;

        let after = self.distance();
        let reward = (before - after).signum() as f32;

        Step {
            state: self.state(),
            reward,
            done: self.ticks >= MAX_STEPS,
            info: HashMap::new(),
        }
    }

    fn render(&mut self) {
        info!(x = self.pos.0, y = self.pos.1, tick = self.ticks; "moving dot");
    }

    fn actions(&self) -> usize {
        5
    }

    fn observation_size(&self) -> usize {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_towards_the_centre_is_rewarded() {
        let mut env = MovingDot::new(0);
        env.reset();
        env.pos = (0, 5);

        assert_eq!(env.step(1).reward, 1.);
        assert_eq!(env.step(2).reward, -1.);
        assert_eq!(env.step(0).reward, 0.);
    }

    #[test]
    fn the_dot_stays_on_the_grid() {
        let mut env = MovingDot::new(0);
        env.reset();
        env.pos = (0, 0);

        let step = env.step(2);
        assert_eq!(env.pos, (0, 0));
        assert_eq!(step.state, vec![0., 0.]);
    }

    #[test]
    fn episodes_are_bounded() {
        let mut env = MovingDot::new(1);
        env.reset();
        assert!((0..MAX_STEPS).map(|_| env.step(0).done).last().unwrap());
    }
}
