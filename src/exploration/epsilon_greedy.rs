use rand::Rng;

use crate::{
    assert_interval,
    decay::{Decay, Geometric},
};

use super::Choice;

/// Epsilon greedy exploration policy with a per-episode decaying epsilon
///
/// Epsilon only ever moves through [`decay`](Self::decay), once per completed episode,
/// or back to its start value through [`reset`](Self::reset).
#[derive(Debug, Clone, PartialEq)]
pub struct EpsilonGreedy<D: Decay> {
    start: f32,
    epsilon: f32,
    decay: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy from a start value and a decay strategy
    ///
    /// **Panics** if `start` is not in the interval `[0,1]`
    pub fn new(start: f32, decay: D) -> Self {
        assert_interval!(start, 0.0, 1.0);
        Self {
            start,
            epsilon: start,
            decay,
        }
    }

    /// Current exploration rate
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Exploration rate at the start of a run
    pub fn start(&self) -> f32 {
        self.start
    }

    /// Invoke epsilon greedy policy: explore with probability epsilon
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Choice {
        if rng.gen::<f32>() < self.epsilon {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }

    /// Advance epsilon by one episode
    pub fn decay(&mut self) {
        self.epsilon = self.decay.step(self.epsilon);
    }

    /// Restore the start value
    pub fn reset(&mut self) {
        self.epsilon = self.start;
    }
}

impl Default for EpsilonGreedy<Geometric> {
    /// Start at `0.3` and decay by `0.995` per episode down to `0.05`
    fn default() -> Self {
        Self::new(0.3, Geometric::default())
    }
}
