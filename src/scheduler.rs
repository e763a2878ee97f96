use std::{
    ops::ControlFlow,
    time::{Duration, Instant},
};

use crate::{
    config::{coerce_fast_forward_episodes, coerce_speed, TrainingConfig},
    grid::{CellKind, EditOutcome, GridError, GridLayout, Pos},
    session::{StepReport, TrainingSession},
    telemetry::EpisodeRecord,
    yield_point::{FastForwardHandle, FastForwardProgress, YieldPoint},
};

/// Configuration for the [`Scheduler`]
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Delay between steps at speed `1.0`
    ///
    /// **Default**: `250ms`
    pub base_delay: Duration,
    /// Pause between the end of an episode and the start of the next in timed mode
    ///
    /// **Default**: `400ms`
    pub episode_delay: Duration,
    /// Number of fast-forward episodes between [`YieldPoint`] checkpoints
    ///
    /// **Default**: `25`
    pub yield_every: u32,
    /// Initial speed multiplier, clamped into `[MIN_SPEED, MAX_SPEED]`
    ///
    /// **Default**: `1.0`
    pub speed: f32,
    /// Episodes are cut off after this many steps, so a grid whose terminal cells are
    /// walled off cannot stall training
    ///
    /// **Default**: `Some(10_000)`
    pub max_episode_steps: Option<u32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            episode_delay: Duration::from_millis(400),
            yield_every: 25,
            speed: 1.0,
            max_episode_steps: Some(10_000),
        }
    }
}

/// Execution status of the [`Scheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// No episode in progress
    Idle,
    /// Stepping on timed ticks
    Running,
    /// Stepping suspended, episode in flight kept
    Paused,
    /// Inside [`Scheduler::run_fast_forward`]
    FastForward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickKind {
    Step,
    NextEpisode,
}

/// The single timed action the scheduler is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTick {
    due: Instant,
    kind: TickKind,
}

/// What a due [`Scheduler::tick`] did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickEvent {
    EpisodeStarted { episode: u64 },
    Step(StepReport),
}

/// How a fast-forward batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastForwardOutcome {
    Completed,
    Cancelled,
    /// A reset was requested through the [`FastForwardHandle`] and has been applied
    Reset,
}

/// Summary of [`Scheduler::run_fast_forward`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastForwardReport {
    /// Whole episodes run, not counting an episode in flight finished first
    pub episodes: u32,
    /// Steps taken, including those of an abandoned partial episode
    pub steps: u64,
    pub outcome: FastForwardOutcome,
    pub last: Option<EpisodeRecord>,
}

/// Everything a renderer needs, detached from the scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub status: Status,
    pub layout: GridLayout,
    pub position: Pos,
    /// Items not yet collected in the current episode
    pub remaining_items: Vec<Pos>,
    /// Number of the episode in flight, or of the last completed one
    pub episode: u64,
    pub score: f32,
    pub best_score: Option<f32>,
    pub best_episode: Option<u64>,
    pub best_trajectory: Vec<Pos>,
    pub epsilon: f32,
    pub history: Vec<EpisodeRecord>,
    pub rolling_average: Option<f32>,
    /// `[lower, upper]` score axis bounds
    pub score_bounds: [f32; 2],
    pub speed: f32,
}

/// Drives a [`TrainingSession`] in stepped, timed or fast-forward mode
///
/// The scheduler owns no clock. Hosts pass the current [`Instant`] into [`tick`] and
/// use [`next_deadline`] to decide when to call it next. Commands that do not apply in
/// the current [`Status`] are ignored.
///
/// [`tick`]: Self::tick
/// [`next_deadline`]: Self::next_deadline
#[derive(Debug)]
pub struct Scheduler {
    session: TrainingSession,
    config: SchedulerConfig,
    status: Status,
    pending: Option<PendingTick>,
    speed: f32,
    handle: FastForwardHandle,
}

impl Scheduler {
    pub fn new(config: TrainingConfig) -> Result<Self, GridError> {
        let scheduler = config.scheduler.clone();
        let session = TrainingSession::new(config)?;
        Ok(Self::with_session(session, scheduler))
    }

    pub fn with_session(session: TrainingSession, config: SchedulerConfig) -> Self {
        assert!(config.yield_every > 0, "yield_every must be non-zero");
        Self {
            session,
            speed: coerce_speed(config.speed, 1.0),
            config,
            status: Status::Idle,
            pending: None,
            handle: FastForwardHandle::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn session(&self) -> &TrainingSession {
        &self.session
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// A handle for cancelling or resetting fast-forward batches from another thread
    pub fn handle(&self) -> FastForwardHandle {
        self.handle.clone()
    }

    fn step_delay(&self) -> Duration {
        self.config.base_delay.div_f32(self.speed)
    }

    fn schedule(&mut self, kind: TickKind, due: Instant) {
        self.pending = Some(PendingTick { due, kind });
    }

    fn ignored(&self, command: &str) {
        log::debug!("{command} ignored while {:?}", self.status);
    }

    /// Begin timed training
    ///
    /// From [`Status::Idle`] a fresh episode starts; from [`Status::Paused`] this is
    /// [`resume`](Self::resume).
    pub fn start(&mut self, now: Instant) {
        match self.status {
            Status::Idle => {
                log::info!("training started at speed {}", self.speed);
                self.session.begin_episode();
                self.status = Status::Running;
                self.schedule(TickKind::Step, now);
            }
            Status::Paused => self.resume(now),
            Status::Running | Status::FastForward => self.ignored("start"),
        }
    }

    /// Suspend timed training, keeping the episode in flight
    pub fn pause(&mut self) {
        if self.status != Status::Running {
            return self.ignored("pause");
        }
        self.pending = None;
        self.status = Status::Paused;
        log::debug!("paused in episode {}", self.session.episode_number());
    }

    /// Continue timed training: the same episode if one is in flight, otherwise the next
    pub fn resume(&mut self, now: Instant) {
        if self.status != Status::Paused {
            return self.ignored("resume");
        }
        self.status = Status::Running;
        if self.session.in_episode() {
            self.schedule(TickKind::Step, now + self.step_delay());
        } else {
            self.schedule(TickKind::NextEpisode, now);
        }
    }

    /// Execute exactly one step, starting an episode first if none is in flight
    ///
    /// Only from [`Status::Idle`] or [`Status::Paused`]; leaves the scheduler paused.
    pub fn step_once(&mut self) -> Option<StepReport> {
        match self.status {
            Status::Idle | Status::Paused => {
                self.pending = None;
                self.status = Status::Paused;
                Some(self.session.step())
            }
            Status::Running | Status::FastForward => {
                self.ignored("step");
                None
            }
        }
    }

    /// Restore the initial state: zeroed table, initial exploration, empty history
    pub fn reset(&mut self) {
        self.pending = None;
        self.session.reset();
        self.status = Status::Idle;
        log::info!("training reset");
    }

    /// Change the speed multiplier; the tick already scheduled keeps its deadline
    ///
    /// **Returns** the accepted speed
    pub fn set_speed(&mut self, speed: f32) -> f32 {
        self.speed = coerce_speed(speed, self.speed);
        self.speed
    }

    /// When the next [`tick`](Self::tick) is due, while running
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.status {
            Status::Running => self.pending.map(|p| p.due),
            _ => None,
        }
    }

    /// Advance timed training if the pending tick is due at `now`
    pub fn tick(&mut self, now: Instant) -> Option<TickEvent> {
        if self.status != Status::Running {
            return None;
        }
        let pending = self.pending.filter(|p| p.due <= now)?;

        match pending.kind {
            TickKind::NextEpisode => {
                self.session.begin_episode();
                self.schedule(TickKind::Step, now + self.step_delay());
                Some(TickEvent::EpisodeStarted {
                    episode: self.session.episode_number(),
                })
            }
            TickKind::Step => {
                let report = self.session.step();
                if report.finished.is_some() {
                    self.schedule(TickKind::NextEpisode, now + self.config.episode_delay);
                } else {
                    self.schedule(TickKind::Step, now + self.step_delay());
                }
                Some(TickEvent::Step(report))
            }
        }
    }

    /// Edit a grid cell; see [`TrainingSession::edit_cell`]
    pub fn edit_cell(&mut self, pos: Pos, kind: CellKind) -> Option<EditOutcome> {
        if self.status == Status::FastForward {
            self.ignored("edit");
            return None;
        }
        self.session.edit_cell(pos, kind)
    }

    /// Advance the cell at `pos` to the next kind of the edit cycle
    pub fn cycle_cell(&mut self, pos: Pos) -> Option<EditOutcome> {
        let layout = self.session.world().layout();
        if !layout.contains(pos) {
            return None;
        }
        let next = layout.kind(pos).next();
        self.edit_cell(pos, next)
    }

    /// Resize the grid; see [`TrainingSession::resize`]
    pub fn resize(&mut self, rows: usize, cols: usize) -> bool {
        if self.status == Status::FastForward {
            self.ignored("resize");
            return false;
        }
        self.session.resize(rows, cols)
    }

    pub fn set_item_reward(&mut self, reward: f32) {
        self.session.set_item_reward(reward);
    }

    /// Run `count` whole episodes back-to-back without delays
    ///
    /// `count` is sanitized like host input. Requests on the [`FastForwardHandle`] are
    /// polled before every step; requests made while no batch runs are discarded. The
    /// yield point is consulted every `yield_every` completed episodes and may cancel
    /// by breaking. An episode in flight when the batch starts is finished and recorded
    /// before the `count` whole episodes run; a partial episode left by cancellation is
    /// abandoned without being recorded. The scheduler ends [`Status::Paused`], or
    /// [`Status::Idle`] when a reset was requested.
    pub fn run_fast_forward<Y>(&mut self, count: u32, yield_point: &mut Y) -> FastForwardReport
    where
        Y: YieldPoint + ?Sized,
    {
        let mut report = FastForwardReport {
            episodes: 0,
            steps: 0,
            outcome: FastForwardOutcome::Completed,
            last: None,
        };
        if self.status == Status::FastForward {
            self.ignored("fast-forward");
            return report;
        }

        let count = coerce_fast_forward_episodes(count);
        self.handle.take();
        self.pending = None;
        self.status = Status::FastForward;
        log::info!(
            "fast-forwarding {count} episodes from episode {}",
            self.session.episode_number()
        );

        // The episode in flight is finished first so the batch starts at a boundary
        let mut cancelled = self.session.in_episode() && !self.finish_episode(&mut report);

        while !cancelled && report.episodes < count {
            if !self.finish_episode(&mut report) {
                cancelled = true;
                break;
            }
            report.episodes += 1;

            if report.episodes % self.config.yield_every == 0 && report.episodes < count {
                let progress = FastForwardProgress {
                    completed: report.episodes,
                    requested: count,
                    episode: self.session.episodes_completed(),
                    epsilon: self.session.agent().epsilon(),
                    average: self.session.telemetry().rolling_average(),
                };
                if let ControlFlow::Break(()) = yield_point.checkpoint(&progress) {
                    cancelled = true;
                }
            }
        }
        if cancelled {
            report.outcome = FastForwardOutcome::Cancelled;
        }

        self.session.abandon_episode();
        let (_, reset) = self.handle.take();
        if reset {
            report.outcome = FastForwardOutcome::Reset;
            self.reset();
        } else {
            self.status = Status::Paused;
        }

        log::info!(
            "fast-forward {:?} after {} episodes and {} steps, epsilon {:.3}",
            report.outcome,
            report.episodes,
            report.steps,
            self.session.agent().epsilon()
        );
        report
    }

    /// Step until the current or next episode ends
    ///
    /// **Returns** `false` if the handle cancelled first
    fn finish_episode(&mut self, report: &mut FastForwardReport) -> bool {
        loop {
            if self.handle.is_cancelled() {
                return false;
            }
            report.steps += 1;
            if let Some(record) = self.session.step().finished {
                report.last = Some(record);
                return true;
            }
        }
    }

    /// Positions visited by the current greedy policy, without learning
    pub fn greedy_path(&mut self, max_steps: usize) -> Vec<Pos> {
        self.session.greedy_path(max_steps)
    }

    pub fn snapshot(&self) -> Snapshot {
        let session = &self.session;
        let telemetry = session.telemetry();
        let best = telemetry.best();
        Snapshot {
            status: self.status,
            layout: session.world().layout().clone(),
            position: session.position(),
            remaining_items: session.world().remaining_item_cells(),
            episode: session.episode_number(),
            score: session.current_score(),
            best_score: best.map(|b| b.score),
            best_episode: best.map(|b| b.episode),
            best_trajectory: best.map(|b| b.trajectory.clone()).unwrap_or_default(),
            epsilon: session.agent().epsilon(),
            history: telemetry.history().copied().collect(),
            rolling_average: telemetry.rolling_average(),
            score_bounds: telemetry.scale().bounds(),
            speed: self.speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algo::q_table::QTableAgentConfig, yield_point::NoYield};

    fn scheduler() -> Scheduler {
        Scheduler::new(TrainingConfig {
            agent: QTableAgentConfig {
                seed: Some(5),
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn start_steps_on_schedule() {
        let mut scheduler = scheduler();
        let t0 = Instant::now();
        assert_eq!(scheduler.tick(t0), None, "idle");

        scheduler.start(t0);
        assert_eq!(scheduler.status(), Status::Running);
        assert_eq!(scheduler.next_deadline(), Some(t0));

        assert!(matches!(scheduler.tick(t0), Some(TickEvent::Step(_))));
        let due = t0 + Duration::from_millis(250);
        assert_eq!(scheduler.next_deadline(), Some(due));
        assert_eq!(scheduler.tick(due - Duration::from_millis(1)), None, "not yet due");
        assert!(scheduler.tick(due).is_some());
    }

    #[test]
    fn speed_change_applies_to_next_tick() {
        let mut scheduler = scheduler();
        let t0 = Instant::now();
        scheduler.start(t0);
        scheduler.tick(t0);
        let due = t0 + Duration::from_millis(250);

        assert_eq!(scheduler.set_speed(2.0), 2.0);
        assert_eq!(scheduler.next_deadline(), Some(due), "pending tick unchanged");
        scheduler.tick(due);
        assert_eq!(
            scheduler.next_deadline(),
            Some(due + Duration::from_millis(125))
        );

        assert_eq!(scheduler.set_speed(-1.0), 2.0, "invalid speed keeps the last");
    }

    #[test]
    fn pause_and_resume_keep_the_episode() {
        let mut scheduler = scheduler();
        let mut now = Instant::now();
        scheduler.start(now);
        for _ in 0..3 {
            scheduler.tick(now);
            now += Duration::from_secs(1);
        }
        let before = scheduler.snapshot();

        scheduler.pause();
        assert_eq!(scheduler.status(), Status::Paused);
        assert_eq!(scheduler.next_deadline(), None);
        assert_eq!(scheduler.tick(now + Duration::from_secs(10)), None);

        scheduler.resume(now);
        let after = scheduler.snapshot();
        assert_eq!(after.episode, before.episode);
        assert_eq!(after.position, before.position);
        assert_eq!(after.score, before.score);
        assert_eq!(scheduler.status(), Status::Running);
    }

    #[test]
    fn incompatible_commands_are_ignored() {
        let mut scheduler = scheduler();
        let now = Instant::now();
        scheduler.pause();
        scheduler.resume(now);
        assert_eq!(scheduler.status(), Status::Idle);

        scheduler.start(now);
        scheduler.start(now);
        assert_eq!(scheduler.status(), Status::Running);
        assert_eq!(scheduler.step_once(), None, "no single steps while running");
    }

    #[test]
    fn step_once_leaves_paused() {
        let mut scheduler = scheduler();
        let report = scheduler.step_once().unwrap();
        assert_eq!(scheduler.status(), Status::Paused);
        assert_eq!(scheduler.snapshot().position, report.position);
        assert_eq!(scheduler.snapshot().episode, 1);
    }

    #[test]
    fn episode_end_waits_before_next_episode() {
        let mut scheduler = scheduler();
        let mut now = Instant::now();
        scheduler.start(now);
        loop {
            match scheduler.tick(now) {
                Some(TickEvent::Step(report)) if report.finished.is_some() => break,
                _ => now += Duration::from_secs(1),
            }
        }
        assert_eq!(
            scheduler.next_deadline(),
            Some(now + Duration::from_millis(400))
        );
        now += Duration::from_millis(400);
        assert_eq!(
            scheduler.tick(now),
            Some(TickEvent::EpisodeStarted { episode: 2 })
        );
    }

    #[test]
    fn fast_forward_ends_paused() {
        let mut scheduler = scheduler();
        let report = scheduler.run_fast_forward(500, &mut NoYield);

        assert_eq!(report.outcome, FastForwardOutcome::Completed);
        assert_eq!(report.episodes, 500);
        assert_eq!(scheduler.status(), Status::Paused);
        assert_eq!(scheduler.session().episodes_completed(), 500);
        assert!(!scheduler.session().in_episode());
        let expected = (0.3_f32 * 0.995_f32.powi(500)).max(0.05);
        assert_eq!(scheduler.session().agent().epsilon(), expected);
    }

    #[test]
    fn fast_forward_finishes_episode_in_flight() {
        let mut scheduler = scheduler();
        scheduler.step_once();
        let before = scheduler.snapshot().episode;
        assert_eq!(before, 1);

        let report = scheduler.run_fast_forward(500, &mut NoYield);
        assert_eq!(report.episodes, 500);
        assert_eq!(scheduler.snapshot().episode, before + 500);
        assert_eq!(scheduler.session().episodes_completed(), 501);
        assert_eq!(scheduler.snapshot().position, (0, 0), "paused at a boundary");
    }

    #[test]
    fn fast_forward_from_boundary_counts_exactly() {
        let mut scheduler = scheduler();
        scheduler.run_fast_forward(30, &mut NoYield);
        let before = scheduler.snapshot().episode;
        scheduler.run_fast_forward(500, &mut NoYield);
        assert_eq!(scheduler.snapshot().episode, before + 500);
    }

    #[test]
    fn yield_point_runs_and_cancels() {
        let mut scheduler = scheduler();
        let mut seen = Vec::new();
        let report = scheduler.run_fast_forward(200, &mut |p: &FastForwardProgress| {
            seen.push(p.completed);
            if p.completed >= 75 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        assert_eq!(seen, [25, 50, 75]);
        assert_eq!(report.outcome, FastForwardOutcome::Cancelled);
        assert_eq!(report.episodes, 75);
        assert_eq!(scheduler.status(), Status::Paused);
    }

    #[test]
    fn reset_request_mid_batch() {
        let mut scheduler = scheduler();
        let handle = scheduler.handle();
        let report = scheduler.run_fast_forward(500, &mut |_: &FastForwardProgress| {
            handle.request_reset();
            ControlFlow::Continue(())
        });

        assert_eq!(report.outcome, FastForwardOutcome::Reset);
        assert_eq!(report.episodes, 25, "stopped at the first checkpoint");
        assert_eq!(scheduler.status(), Status::Idle);
        assert_eq!(scheduler.session().episodes_completed(), 0);
        assert_eq!(scheduler.session().agent().epsilon(), 0.3);
        assert!(scheduler.session().agent().table().is_zeroed());
    }

    #[test]
    fn stale_requests_are_discarded() {
        let mut scheduler = scheduler();
        scheduler.handle().cancel();
        let report = scheduler.run_fast_forward(30, &mut NoYield);
        assert_eq!(report.outcome, FastForwardOutcome::Completed);
        assert_eq!(report.episodes, 30);
    }

    #[test]
    fn cycle_cell_follows_edit_order() {
        let mut scheduler = scheduler();
        let outcome = scheduler.cycle_cell((0, 1)).unwrap();
        assert_eq!(outcome.kind, CellKind::Item);
        assert_eq!(scheduler.cycle_cell((0, 1)).unwrap().kind, CellKind::Wall);
        assert_eq!(scheduler.cycle_cell((0, 0)), None, "start is fixed");
        assert_eq!(scheduler.cycle_cell((9, 9)), None);
    }
}
