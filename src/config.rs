use std::str::FromStr;

use crate::{
    algo::q_table::QTableAgentConfig,
    grid::{LayoutConfig, MAX_DIM, MIN_DIM},
    scheduler::SchedulerConfig,
    telemetry::TelemetryConfig,
};

/// Item bonus used when the host supplies something unusable
pub const DEFAULT_ITEM_REWARD: f32 = 5.0;
/// Fast-forward batch size used when the host supplies something unusable
pub const DEFAULT_FAST_FORWARD_EPISODES: u32 = 500;
/// Largest fast-forward batch accepted from a host
pub const MAX_FAST_FORWARD_EPISODES: u32 = 1_000_000;
pub const MIN_SPEED: f32 = 0.1;
pub const MAX_SPEED: f32 = 50.0;

/// Reward function of the grid world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardConfig {
    /// Paid on every step, including rejected moves
    ///
    /// **Default**: `-0.1`
    pub step_penalty: f32,
    /// Added when the goal is reached
    ///
    /// **Default**: `10.0`
    pub goal: f32,
    /// Added when the hazard is reached
    ///
    /// **Default**: `-10.0`
    pub hazard: f32,
    /// Added when an item is collected
    ///
    /// **Default**: [`DEFAULT_ITEM_REWARD`]
    pub item: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            step_penalty: -0.1,
            goal: 10.0,
            hazard: -10.0,
            item: DEFAULT_ITEM_REWARD,
        }
    }
}

/// Everything needed to build a [`Scheduler`](crate::scheduler::Scheduler)
#[derive(Debug, Clone, Default)]
pub struct TrainingConfig {
    pub layout: LayoutConfig,
    pub rewards: RewardConfig,
    pub agent: QTableAgentConfig,
    pub telemetry: TelemetryConfig,
    pub scheduler: SchedulerConfig,
}

/// Clamp a grid dimension into `[MIN_DIM, MAX_DIM]`
pub fn coerce_dimension(value: usize) -> usize {
    value.clamp(MIN_DIM, MAX_DIM)
}

/// Non-finite rewards keep `last`, negative ones clamp to zero
pub fn coerce_item_reward(value: f32, last: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        last
    }
}

/// Non-positive or non-finite speeds keep `last`, others clamp into `[MIN_SPEED, MAX_SPEED]`
pub fn coerce_speed(value: f32, last: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value.clamp(MIN_SPEED, MAX_SPEED)
    } else {
        last
    }
}

/// Zero falls back to [`DEFAULT_FAST_FORWARD_EPISODES`], large batches clamp to [`MAX_FAST_FORWARD_EPISODES`]
pub fn coerce_fast_forward_episodes(value: u32) -> u32 {
    match value {
        0 => DEFAULT_FAST_FORWARD_EPISODES,
        n => n.min(MAX_FAST_FORWARD_EPISODES),
    }
}

/// Last valid values of the host-editable settings
///
/// Hosts feed raw text from their input widgets into the setters. Input is never
/// rejected: unusable values are clamped or replaced and the coercion is logged.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    rows: usize,
    cols: usize,
    item_reward: f32,
    speed: f32,
    fast_forward_episodes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let layout = LayoutConfig::default();
        Self {
            rows: layout.rows,
            cols: layout.cols,
            item_reward: DEFAULT_ITEM_REWARD,
            speed: 1.0,
            fast_forward_episodes: DEFAULT_FAST_FORWARD_EPISODES,
        }
    }
}

fn parse<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

impl Settings {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn item_reward(&self) -> f32 {
        self.item_reward
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn fast_forward_episodes(&self) -> u32 {
        self.fast_forward_episodes
    }

    /// **Returns** the accepted `(rows, cols)`
    pub fn set_dimensions(&mut self, rows: &str, cols: &str) -> (usize, usize) {
        self.rows = Self::dimension(rows, self.rows, "rows");
        self.cols = Self::dimension(cols, self.cols, "cols");
        (self.rows, self.cols)
    }

    fn dimension(raw: &str, last: usize, name: &str) -> usize {
        // Negative input clamps to the minimum rather than being discarded
        let Some(value) = parse::<i64>(raw) else {
            log::warn!("ignoring non-numeric {name} {raw:?}, keeping {last}");
            return last;
        };
        let accepted = coerce_dimension(value.clamp(0, MAX_DIM as i64 + 1) as usize);
        if accepted as i64 != value {
            log::warn!("{name} {value} clamped to {accepted}");
        }
        accepted
    }

    /// **Returns** the accepted item reward
    pub fn set_item_reward(&mut self, raw: &str) -> f32 {
        let accepted = coerce_item_reward(parse(raw).unwrap_or(f32::NAN), self.item_reward);
        if parse::<f32>(raw) != Some(accepted) {
            log::warn!("item reward {raw:?} coerced to {accepted}");
        }
        self.item_reward = accepted;
        accepted
    }

    /// **Returns** the accepted speed multiplier
    pub fn set_speed(&mut self, raw: &str) -> f32 {
        let accepted = coerce_speed(parse(raw).unwrap_or(f32::NAN), self.speed);
        if parse::<f32>(raw) != Some(accepted) {
            log::warn!("speed {raw:?} coerced to {accepted}");
        }
        self.speed = accepted;
        accepted
    }

    /// **Returns** the accepted fast-forward episode count
    pub fn set_fast_forward_episodes(&mut self, raw: &str) -> u32 {
        let accepted = coerce_fast_forward_episodes(parse(raw).unwrap_or(0));
        if parse::<u32>(raw) != Some(accepted) {
            log::warn!("fast-forward episode count {raw:?} coerced to {accepted}");
        }
        self.fast_forward_episodes = accepted;
        accepted
    }
}
