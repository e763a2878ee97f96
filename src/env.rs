use strum::{EnumCount, EnumIter, FromRepr, VariantArray};

/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// This base trait represents the common case of a discrete-time, episodic MDP with
/// one agent and a finite state space and action space.
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type State;

    /// A representation of an action that an agent can take to affect the environment
    type Action;

    /// Update the environment in response to an action taken by the agent
    fn step(&mut self, action: Self::Action) -> Transition<Self::State>;

    /// Reset the environment for a new episode
    ///
    /// **Returns** the initial state
    fn reset(&mut self) -> Self::State;

    /// The current state
    fn state(&self) -> Self::State;
}

/// Outcome of a single [`Environment::step`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition<S> {
    pub next_state: S,
    pub reward: f32,
    /// The episode ended with this step; `next_state` must not be bootstrapped from
    pub terminal: bool,
}

/// A unit move on the grid
#[derive(EnumIter, VariantArray, EnumCount, FromRepr, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Action {
    /// `(row, col)` offset of the move
    pub fn offset(self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
            Action::Right => (0, 1),
        }
    }

    /// Column of this action in the value table
    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn action_index_round_trips() {
        for action in Action::iter() {
            assert_eq!(Action::from_repr(action.index()), Some(action));
        }
        assert_eq!(Action::COUNT, Action::VARIANTS.len());
    }

    #[test]
    fn offsets_are_unit_moves() {
        for action in Action::iter() {
            let (dr, dc) = action.offset();
            assert_eq!(dr.abs() + dc.abs(), 1, "{action:?} moves one cell on one axis");
        }
    }
}
