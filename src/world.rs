use crate::{
    config::RewardConfig,
    encoder::{ItemMask, StateEncoder},
    env::{Action, Environment, Transition},
    grid::{CellKind, EditOutcome, GridLayout, Pos},
};

/// Outcome of [`GridWorld::transition`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Move {
    pub pos: Pos,
    /// Items still present after the move
    pub items: ItemMask,
    pub reward: f32,
    pub terminal: bool,
    /// The item picked up by this move
    pub collected: Option<Pos>,
}

/// An editable grid with a start, goal, hazard, walls and collectible items
///
/// The world tracks the agent position and the items still present in the current
/// episode. Its state, as seen by an agent, is the dense index produced by its
/// [`StateEncoder`].
#[derive(Debug, Clone)]
pub struct GridWorld {
    layout: GridLayout,
    encoder: StateEncoder,
    rewards: RewardConfig,
    pos: Pos,
    items: ItemMask,
}

impl GridWorld {
    pub fn new(layout: GridLayout, rewards: RewardConfig) -> Self {
        let encoder = StateEncoder::new(&layout);
        Self {
            pos: layout.start(),
            items: encoder.full_mask(),
            layout,
            encoder,
            rewards,
        }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn encoder(&self) -> &StateEncoder {
        &self.encoder
    }

    pub fn rewards(&self) -> &RewardConfig {
        &self.rewards
    }

    /// Takes effect on the next item collected
    pub fn set_item_reward(&mut self, reward: f32) {
        self.rewards.item = reward;
    }

    pub fn position(&self) -> Pos {
        self.pos
    }

    /// Items not yet collected in the current episode
    pub fn remaining_items(&self) -> ItemMask {
        self.items
    }

    /// Positions of the items not yet collected in the current episode
    pub fn remaining_item_cells(&self) -> Vec<Pos> {
        self.layout
            .items()
            .iter()
            .copied()
            .filter(|&pos| self.encoder.item_bit(pos).is_some_and(|bit| self.items & bit != 0))
            .collect()
    }

    /// The transition and reward function
    ///
    /// Moves off the grid or into a wall leave the agent in place but still cost the
    /// step penalty. Entering the goal or the hazard ends the episode. Entering a cell
    /// with an item still present in `items` collects it.
    pub fn transition(&self, pos: Pos, items: ItemMask, action: Action) -> Move {
        let (dr, dc) = action.offset();
        let target = pos
            .0
            .checked_add_signed(dr)
            .zip(pos.1.checked_add_signed(dc))
            .filter(|&next| self.layout.contains(next));
        let next = match target {
            Some(next) if self.layout.kind(next) != CellKind::Wall => next,
            _ => pos,
        };

        let mut outcome = Move {
            pos: next,
            items,
            reward: self.rewards.step_penalty,
            terminal: false,
            collected: None,
        };

        match self.layout.kind(next) {
            CellKind::Goal => {
                outcome.reward += self.rewards.goal;
                outcome.terminal = true;
            }
            CellKind::Hazard => {
                outcome.reward += self.rewards.hazard;
                outcome.terminal = true;
            }
            CellKind::Item => {
                if let Some(bit) = self.encoder.item_bit(next).filter(|bit| items & bit != 0) {
                    outcome.reward += self.rewards.item;
                    outcome.items &= !bit;
                    outcome.collected = Some(next);
                }
            }
            CellKind::Empty | CellKind::Start | CellKind::Wall => {}
        }

        outcome
    }

    /// Edit a cell of the layout; see [`GridLayout::edit_cell`]
    ///
    /// A change to the item set rebuilds the state encoder, so previously encoded states
    /// are meaningless afterwards. The agent is moved back to the start if it now stands
    /// on a wall or a terminal cell, and the items are restored if their encoding changed.
    pub fn edit_cell(&mut self, pos: Pos, kind: CellKind) -> Option<EditOutcome> {
        let outcome = self.layout.edit_cell(pos, kind)?;
        if outcome.items_changed {
            self.encoder = StateEncoder::new(&self.layout);
            self.items = self.encoder.full_mask();
        }
        if !self.is_free(self.pos) {
            self.pos = self.layout.start();
        }
        Some(outcome)
    }

    /// Resize the layout; see [`GridLayout::resize`]
    ///
    /// Always rebuilds the encoder and restarts the episode state when the size changes.
    pub fn resize(&mut self, rows: usize, cols: usize) -> bool {
        if !self.layout.resize(rows, cols) {
            return false;
        }
        self.encoder = StateEncoder::new(&self.layout);
        self.reset();
        true
    }

    /// Whether the agent may stand on `pos` mid-episode
    fn is_free(&self, pos: Pos) -> bool {
        match self.layout.kind(pos) {
            CellKind::Empty | CellKind::Start | CellKind::Item => true,
            CellKind::Goal | CellKind::Hazard | CellKind::Wall => false,
        }
    }
}

impl Environment for GridWorld {
    type State = usize;
    type Action = Action;

    fn step(&mut self, action: Self::Action) -> Transition<Self::State> {
        let Move {
            pos,
            items,
            reward,
            terminal,
            collected,
        } = self.transition(self.pos, self.items, action);

        if let Some(item) = collected {
            log::trace!("collected item at {item:?}");
        }
        self.pos = pos;
        self.items = items;

        Transition {
            next_state: self.state(),
            reward,
            terminal,
        }
    }

    fn reset(&mut self) -> Self::State {
        self.pos = self.layout.start();
        self.items = self.encoder.full_mask();
        self.state()
    }

    fn state(&self) -> Self::State {
        self.encoder.encode(self.pos, self.items)
    }
}
