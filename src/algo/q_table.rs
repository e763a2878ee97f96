use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use strum::{EnumCount, VariantArray};

use crate::{
    assert_interval,
    decay::{Decay, Geometric},
    env::{Action, Environment},
    exploration::{Choice, EpsilonGreedy},
};

/// Dense table of action values, one row of [`Action::COUNT`] values per state
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTable {
    values: Vec<f32>,
}

impl ValueTable {
    /// A zeroed table for `states` states
    pub fn new(states: usize) -> Self {
        Self {
            values: vec![0.0; states * Action::COUNT],
        }
    }

    /// Number of states covered
    pub fn states(&self) -> usize {
        self.values.len() / Action::COUNT
    }

    /// Action values of `state`, indexed by [`Action::index`]
    pub fn row(&self, state: usize) -> &[f32] {
        let start = state * Action::COUNT;
        &self.values[start..start + Action::COUNT]
    }

    pub fn get(&self, state: usize, action: Action) -> f32 {
        self.values[state * Action::COUNT + action.index()]
    }

    pub fn set(&mut self, state: usize, action: Action, value: f32) {
        self.values[state * Action::COUNT + action.index()] = value;
    }

    /// Largest action value of `state`
    pub fn max(&self, state: usize) -> f32 {
        self.row(state)
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Every action whose value equals the maximum for `state`
    pub fn argmax_all(&self, state: usize) -> Vec<Action> {
        let max = self.max(state);
        Action::VARIANTS
            .iter()
            .copied()
            .filter(|&a| self.get(state, a) == max)
            .collect()
    }

    /// Whether nothing has been learned yet
    pub fn is_zeroed(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }
}

/// Configuration for the [`QTableAgent`]
#[derive(Debug, Clone)]
pub struct QTableAgentConfig<D: Decay = Geometric> {
    /// Exploration policy
    ///
    /// **Default**: start at `0.3`, decay by `0.995` per episode, floor `0.05`
    pub exploration: EpsilonGreedy<D>,
    /// Learning rate
    ///
    /// **Default**: `0.2`
    pub alpha: f32,
    /// Discount factor
    ///
    /// **Default**: `0.9`
    pub gamma: f32,
    /// Seed for action selection; `None` seeds from system entropy
    ///
    /// **Default**: `None`
    pub seed: Option<u64>,
}

impl Default for QTableAgentConfig<Geometric> {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::default(),
            alpha: 0.2,
            gamma: 0.9,
            seed: None,
        }
    }
}

/// A greedy rollout produced by [`QTableAgent::rollout`]
#[derive(Debug, Clone, PartialEq)]
pub struct Rollout {
    /// Visited states, starting with the initial state
    pub states: Vec<usize>,
    pub total_reward: f32,
    /// The rollout ended in a terminal state rather than by running out of steps
    pub terminal: bool,
}

/// A Q-learning agent over a dense table of states
///
/// States are the dense indices produced by a
/// [`StateEncoder`](crate::encoder::StateEncoder). The learning rate and discount are
/// fixed for the lifetime of the agent; only the exploration rate changes, once per
/// completed episode.
#[derive(Debug, Clone)]
pub struct QTableAgent<D: Decay = Geometric> {
    table: ValueTable,
    exploration: EpsilonGreedy<D>,
    alpha: f32, // learning rate
    gamma: f32, // discount factor
    rng: StdRng,
}

impl<D: Decay> QTableAgent<D> {
    /// Initialize a new agent with a zeroed table of `states` states
    ///
    /// **Panics** if `alpha` or `gamma` is not in the interval `[0,1]`
    pub fn new(states: usize, config: QTableAgentConfig<D>) -> Self {
        assert_interval!(config.alpha, 0.0, 1.0);
        assert_interval!(config.gamma, 0.0, 1.0);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            table: ValueTable::new(states),
            exploration: config.exploration,
            alpha: config.alpha,
            gamma: config.gamma,
            rng,
        }
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    /// Choose an action for `state` based on the exploration policy
    pub fn select_action(&mut self, state: usize) -> Action {
        match self.exploration.choose(&mut self.rng) {
            Choice::Explore => Action::VARIANTS[self.rng.gen_range(0..Action::COUNT)],
            Choice::Exploit => self.greedy_action(state),
        }
    }

    /// The highest valued action for `state`, ties broken uniformly at random
    pub fn greedy_action(&mut self, state: usize) -> Action {
        *self
            .table
            .argmax_all(state)
            .choose(&mut self.rng)
            .expect("There is always at least one maximal action")
    }

    /// Apply the Q-learning backup for one transition
    ///
    /// Q(s,a) ← Q(s,a) + α(target - Q(s,a)), where target = r for terminal steps and
    /// r + γ max<sub>a'</sub> Q(s',a') otherwise. Terminal steps never look at `next_state`.
    pub fn update(
        &mut self,
        state: usize,
        action: Action,
        reward: f32,
        next_state: usize,
        terminal: bool,
    ) {
        let q_value = self.table.get(state, action);
        let target = if terminal {
            reward
        } else {
            reward + self.gamma * self.table.max(next_state)
        };
        self.table
            .set(state, action, q_value + self.alpha * (target - q_value));
    }

    /// Decay the exploration rate; called once per completed episode
    pub fn decay_exploration(&mut self) {
        self.exploration.decay();
    }

    /// Replace the table with a zeroed one of `states` states, keeping the exploration rate
    ///
    /// Everything learned is lost. Used when the state encoding changes.
    pub fn reinitialize(&mut self, states: usize) {
        log::info!(
            "value table reinitialized: {} -> {} states, learned values discarded",
            self.table.states(),
            states
        );
        self.table = ValueTable::new(states);
    }

    /// Zero the table and restore the initial exploration rate
    pub fn reset(&mut self, states: usize) {
        self.table = ValueTable::new(states);
        self.exploration.reset();
    }

    /// Follow the greedy policy from a fresh episode of `env` without learning
    pub fn rollout<E>(&mut self, env: &mut E, max_steps: usize) -> Rollout
    where
        E: Environment<State = usize, Action = Action>,
    {
        let mut state = env.reset();
        let mut rollout = Rollout {
            states: vec![state],
            total_reward: 0.0,
            terminal: false,
        };

        for _ in 0..max_steps {
            let action = self.greedy_action(state);
            let transition = env.step(action);
            rollout.total_reward += transition.reward;
            rollout.states.push(transition.next_state);
            state = transition.next_state;
            if transition.terminal {
                rollout.terminal = true;
                break;
            }
        }

        rollout
    }
}
