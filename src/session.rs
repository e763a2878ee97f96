use crate::{
    algo::q_table::{QTableAgent, QTableAgentConfig},
    config::{coerce_item_reward, RewardConfig, TrainingConfig},
    encoder::ItemMask,
    env::{Action, Environment, Transition},
    grid::{CellKind, EditOutcome, GridError, GridLayout, Pos},
    telemetry::{EpisodeRecord, Telemetry, TelemetryConfig},
    world::GridWorld,
};

/// Bookkeeping of the episode in flight
///
/// The agent position and the remaining items live in the [`GridWorld`]; this holds
/// what only matters until the episode ends.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeState {
    /// Reward accumulated so far
    pub score: f32,
    pub steps: u32,
    /// Every position visited, starting at the start cell
    pub trajectory: Vec<Pos>,
}

impl EpisodeState {
    fn new(start: Pos) -> Self {
        Self {
            score: 0.0,
            steps: 0,
            trajectory: vec![start],
        }
    }
}

/// What happened during one [`TrainingSession::step`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub action: Action,
    pub reward: f32,
    pub position: Pos,
    /// Present when this step ended the episode
    pub finished: Option<EpisodeRecord>,
}

/// All mutable training state of a run: world, agent, telemetry and the episode in flight
///
/// Nothing here knows about time or scheduling; the
/// [`Scheduler`](crate::scheduler::Scheduler) decides when to call [`step`](Self::step).
#[derive(Debug, Clone)]
pub struct TrainingSession {
    world: GridWorld,
    agent: QTableAgent,
    telemetry: Telemetry,
    episode: Option<EpisodeState>,
    episodes_completed: u64,
    last_score: f32,
    steps_taken: u64,
    max_episode_steps: Option<u32>,
}

impl TrainingSession {
    /// Build a session from a [`TrainingConfig`]
    pub fn new(config: TrainingConfig) -> Result<Self, GridError> {
        let layout = GridLayout::new(config.layout)?;
        Ok(Self::from_parts(
            layout,
            config.rewards,
            config.agent,
            config.telemetry,
            config.scheduler.max_episode_steps,
        ))
    }

    pub fn from_parts(
        layout: GridLayout,
        rewards: RewardConfig,
        agent: QTableAgentConfig,
        telemetry: TelemetryConfig,
        max_episode_steps: Option<u32>,
    ) -> Self {
        let world = GridWorld::new(layout, rewards);
        let states = world.encoder().len();
        Self {
            agent: QTableAgent::new(states, agent),
            world,
            telemetry: Telemetry::new(telemetry),
            episode: None,
            episodes_completed: 0,
            last_score: 0.0,
            steps_taken: 0,
            max_episode_steps,
        }
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    pub fn agent(&self) -> &QTableAgent {
        &self.agent
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// The episode in flight, if any
    pub fn episode(&self) -> Option<&EpisodeState> {
        self.episode.as_ref()
    }

    pub fn in_episode(&self) -> bool {
        self.episode.is_some()
    }

    pub fn episodes_completed(&self) -> u64 {
        self.episodes_completed
    }

    /// Number of the episode in flight, or of the last completed one between episodes
    pub fn episode_number(&self) -> u64 {
        self.episodes_completed + u64::from(self.in_episode())
    }

    /// Score of the episode in flight, or of the last completed one between episodes
    pub fn current_score(&self) -> f32 {
        self.episode.as_ref().map_or(self.last_score, |ep| ep.score)
    }

    /// Steps taken since the session was created or reset
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    pub fn position(&self) -> Pos {
        self.world.position()
    }

    pub fn remaining_items(&self) -> ItemMask {
        self.world.remaining_items()
    }

    /// Start a fresh episode: agent at the start, all items present, score zero
    ///
    /// An episode already in flight is discarded without being recorded.
    pub fn begin_episode(&mut self) {
        self.world.reset();
        self.episode = Some(EpisodeState::new(self.world.position()));
    }

    /// Discard the episode in flight without recording it and put the agent back at the start
    pub fn abandon_episode(&mut self) {
        if let Some(ep) = self.episode.take() {
            log::debug!(
                "abandoned episode {} after {} steps",
                self.episodes_completed + 1,
                ep.steps
            );
        }
        self.world.reset();
    }

    /// Take one learning step, starting an episode first if none is in flight
    ///
    /// When the step ends the episode, the episode is recorded, exploration decays once,
    /// and the next call starts a new episode.
    pub fn step(&mut self) -> StepReport {
        let mut ep = match self.episode.take() {
            Some(ep) => ep,
            None => {
                self.world.reset();
                EpisodeState::new(self.world.position())
            }
        };

        let state = self.world.state();
        let action = self.agent.select_action(state);
        let Transition {
            next_state,
            reward,
            terminal,
        } = self.world.step(action);
        self.agent
            .update(state, action, reward, next_state, terminal);

        let position = self.world.position();
        ep.score += reward;
        ep.steps += 1;
        ep.trajectory.push(position);
        self.steps_taken += 1;
        log::trace!("{action:?} -> {position:?}, reward {reward:.2}");

        let truncated = self.max_episode_steps.is_some_and(|max| ep.steps >= max);
        let finished = if terminal || truncated {
            if truncated && !terminal {
                log::debug!("episode truncated after {} steps", ep.steps);
            }
            Some(self.finish_episode(ep))
        } else {
            self.episode = Some(ep);
            None
        };

        StepReport {
            action,
            reward,
            position,
            finished,
        }
    }

    fn finish_episode(&mut self, ep: EpisodeState) -> EpisodeRecord {
        self.episodes_completed += 1;
        self.last_score = ep.score;
        let record = self
            .telemetry
            .record(self.episodes_completed, ep.score, &ep.trajectory);
        self.agent.decay_exploration();
        log::debug!(
            "episode {} finished in {} steps: score {:.2}, average {:.2}, epsilon {:.3}",
            record.episode,
            ep.steps,
            record.score,
            record.average,
            self.agent.epsilon()
        );
        record
    }

    /// Restore the initial conditions: zeroed table, initial exploration, no history
    pub fn reset(&mut self) {
        self.episode = None;
        self.episodes_completed = 0;
        self.last_score = 0.0;
        self.steps_taken = 0;
        self.world.reset();
        self.agent.reset(self.world.encoder().len());
        self.telemetry.clear();
    }

    /// Edit a grid cell; see [`GridLayout::edit_cell`]
    ///
    /// A change to the item set changes the state encoding, so the value table is
    /// reinitialized and everything learned is lost. The episode in flight restarts when
    /// the encoding changed or the agent had to be moved off the edited cell.
    pub fn edit_cell(&mut self, pos: Pos, kind: CellKind) -> Option<EditOutcome> {
        let before = self.world.position();
        let outcome = self.world.edit_cell(pos, kind)?;
        if outcome.promoted {
            log::info!("edit at {pos:?} would remove the last terminal cell, made it the goal");
        }
        if outcome.items_changed {
            self.agent.reinitialize(self.world.encoder().len());
        }
        if outcome.items_changed || self.world.position() != before {
            self.restart_episode();
        }
        Some(outcome)
    }

    /// Resize the grid; see [`GridLayout::resize`]
    ///
    /// Reinitializes the value table, restarts the episode in flight and forgets the
    /// best run, whose trajectory may no longer fit the grid.
    pub fn resize(&mut self, rows: usize, cols: usize) -> bool {
        if !self.world.resize(rows, cols) {
            return false;
        }
        self.agent.reinitialize(self.world.encoder().len());
        self.telemetry.clear_best();
        self.restart_episode();
        true
    }

    /// Set the item bonus; negative values clamp to zero, non-finite ones are ignored
    pub fn set_item_reward(&mut self, reward: f32) {
        let last = self.world.rewards().item;
        self.world.set_item_reward(coerce_item_reward(reward, last));
    }

    fn restart_episode(&mut self) {
        if self.episode.is_some() {
            self.begin_episode();
        } else {
            self.world.reset();
        }
    }

    /// Positions visited by the current greedy policy from the start cell, without learning
    ///
    /// Stops at a terminal cell or after `max_steps` steps.
    pub fn greedy_path(&mut self, max_steps: usize) -> Vec<Pos> {
        let mut world = self.world.clone();
        let rollout = self.agent.rollout(&mut world, max_steps);
        rollout
            .states
            .into_iter()
            .map(|state| world.encoder().decode(state).0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::LayoutConfig;

    fn session(items: Vec<Pos>) -> TrainingSession {
        let layout = GridLayout::new(LayoutConfig {
            items,
            ..Default::default()
        })
        .unwrap();
        TrainingSession::from_parts(
            layout,
            RewardConfig::default(),
            QTableAgentConfig {
                seed: Some(3),
                ..Default::default()
            },
            TelemetryConfig::default(),
            None,
        )
    }

    fn run_episode(session: &mut TrainingSession) -> EpisodeRecord {
        loop {
            if let Some(record) = session.step().finished {
                return record;
            }
        }
    }

    #[test]
    fn step_starts_an_episode() {
        let mut session = session(Vec::new());
        assert!(!session.in_episode());
        assert_eq!(session.episode_number(), 0);

        let report = session.step();
        if report.finished.is_none() {
            assert!(session.in_episode());
            assert_eq!(session.episode_number(), 1);
            let ep = session.episode().unwrap();
            assert_eq!(ep.trajectory.len(), 2);
            assert_eq!(ep.trajectory[0], (0, 0));
            assert_eq!(ep.trajectory[1], report.position);
        }
    }

    #[test]
    fn episode_completion_records_and_decays() {
        let mut session = session(Vec::new());
        let record = run_episode(&mut session);

        assert_eq!(record.episode, 1);
        assert_eq!(session.episodes_completed(), 1);
        assert!(!session.in_episode());
        assert_eq!(session.telemetry().len(), 1);
        assert_eq!(session.agent().epsilon(), 0.3 * 0.995);

        let best = session.telemetry().best().unwrap();
        assert_eq!(best.trajectory.first(), Some(&(0, 0)));
        let last = *best.trajectory.last().unwrap();
        assert!(last == (4, 4) || last == (2, 2), "ended on a terminal cell");
    }

    #[test]
    fn reset_restores_initial_conditions() {
        let mut session = session(Vec::new());
        for _ in 0..5 {
            run_episode(&mut session);
        }
        session.step();
        session.reset();

        assert_eq!(session.episodes_completed(), 0);
        assert_eq!(session.steps_taken(), 0);
        assert!(!session.in_episode());
        assert!(session.agent().table().is_zeroed());
        assert_eq!(session.agent().epsilon(), 0.3);
        assert!(session.telemetry().is_empty());
        assert!(session.telemetry().best().is_none());
        assert_eq!(session.position(), (0, 0));
    }

    #[test]
    fn item_edit_reinitializes_table_and_restarts_episode() {
        let mut session = session(Vec::new());
        run_episode(&mut session);
        assert!(!session.agent().table().is_zeroed());

        session.step();
        let outcome = session.edit_cell((0, 4), CellKind::Item).unwrap();
        assert!(outcome.items_changed);
        assert_eq!(session.agent().table().states(), 50);
        assert!(session.agent().table().is_zeroed());
        assert!(session.agent().epsilon() < 0.3, "exploration survives the resize");
        if let Some(ep) = session.episode() {
            assert_eq!(ep.trajectory, [(0, 0)], "episode restarted");
        }
        assert_eq!(session.remaining_items(), 0b1);
    }

    #[test]
    fn wall_edit_keeps_learning() {
        let mut session = session(Vec::new());
        run_episode(&mut session);
        session.edit_cell((4, 0), CellKind::Wall).unwrap();
        assert!(!session.agent().table().is_zeroed());
    }

    #[test]
    fn resize_forgets_best_run() {
        let mut session = session(Vec::new());
        run_episode(&mut session);
        assert!(session.resize(4, 4));
        assert!(session.telemetry().best().is_none());
        assert_eq!(session.telemetry().len(), 1, "history kept");
        assert_eq!(session.agent().table().states(), 16);
        assert!(!session.resize(4, 4));
    }

    #[test]
    fn truncation_ends_long_episodes() {
        let layout = GridLayout::new(LayoutConfig {
            walls: vec![(3, 4), (4, 3), (1, 3), (3, 1)],
            ..Default::default()
        })
        .unwrap();
        let mut session = TrainingSession::from_parts(
            layout,
            RewardConfig::default(),
            QTableAgentConfig::default(),
            TelemetryConfig::default(),
            Some(50),
        );
        let record = run_episode(&mut session);
        assert!(session.steps_taken() <= 50);
        assert_eq!(record.episode, 1);
    }

    #[test]
    fn item_reward_is_coerced() {
        let mut session = session(vec![(0, 1)]);
        session.set_item_reward(3.0);
        session.set_item_reward(f32::NAN);
        assert_eq!(session.world().rewards().item, 3.0);
        session.set_item_reward(f32::INFINITY);
        assert_eq!(session.world().rewards().item, 3.0);
        session.set_item_reward(-2.0);
        assert_eq!(session.world().rewards().item, 0.0);
    }
}
