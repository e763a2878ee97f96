use crate::{ds::RingBuffer, grid::Pos, util::round2};

/// Configuration for [`Telemetry`]
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// Number of episodes kept in the score history
    ///
    /// **Default**: `200`
    pub history_capacity: usize,
    /// Number of most recent episodes in the rolling average
    ///
    /// **Default**: `10`
    pub average_window: usize,
    /// Score band shown while every score in the history fits inside it
    ///
    /// **Default**: `[-15.0, 10.0]`
    pub scale_band: [f32; 2],
    /// Margin added around the extrema once the scale is dynamic
    ///
    /// **Default**: `0.5`
    pub scale_padding: f32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            history_capacity: 200,
            average_window: 10,
            scale_band: [-15.0, 10.0],
            scale_padding: 0.5,
        }
    }
}

/// One completed episode in the score history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeRecord {
    pub episode: u64,
    /// Episode score rounded to two decimals
    pub score: f32,
    /// Rolling average including this episode, rounded to two decimals
    pub average: f32,
}

/// The highest scoring episode so far
#[derive(Debug, Clone, PartialEq)]
pub struct BestRun {
    pub score: f32,
    pub episode: u64,
    /// Every position of the episode, starting at the start cell
    pub trajectory: Vec<Pos>,
}

/// Decides the score range a chart should show
///
/// The range stays at the configured band until a score in the history leaves it, then
/// follows the history extrema until every retained score is back inside the band.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreScale {
    band: [f32; 2],
    padding: f32,
    dynamic: bool,
    extrema: Option<(f32, f32)>,
}

impl ScoreScale {
    fn new(band: [f32; 2], padding: f32) -> Self {
        Self {
            band,
            padding,
            dynamic: false,
            extrema: None,
        }
    }

    fn observe(&mut self, extrema: Option<(f32, f32)>) {
        self.extrema = extrema;
        let Some((min, max)) = extrema else {
            return;
        };
        let [low, high] = self.band;
        if min < low || max > high {
            self.dynamic = true;
        } else if self.dynamic {
            self.dynamic = false;
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// `[lower, upper]` bounds of the score axis
    pub fn bounds(&self) -> [f32; 2] {
        let [low, high] = self.band;
        let (min, max) = match self.extrema {
            Some(extrema) if self.dynamic => extrema,
            _ => return self.band,
        };

        let lower = (min - self.padding).min(low);
        let upper = (max + self.padding).max(high);
        if lower >= upper {
            let center = (lower + upper) / 2.0;
            return [center - 1.0, center + 1.0];
        }
        [lower, upper]
    }
}

/// Per-episode score bookkeeping of a training run
#[derive(Debug, Clone)]
pub struct Telemetry {
    config: TelemetryConfig,
    history: RingBuffer<EpisodeRecord>,
    best: Option<BestRun>,
    scale: ScoreScale,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}

impl Telemetry {
    /// **Panics** if the history capacity or the average window is zero
    pub fn new(config: TelemetryConfig) -> Self {
        assert!(config.average_window > 0, "average window must be non-zero");
        Self {
            history: RingBuffer::new(config.history_capacity),
            best: None,
            scale: ScoreScale::new(config.scale_band, config.scale_padding),
            config,
        }
    }

    /// Record a completed episode
    ///
    /// The score is stored rounded to two decimals. The best run is replaced only when
    /// `score` strictly exceeds the best score so far.
    pub fn record(&mut self, episode: u64, score: f32, trajectory: &[Pos]) -> EpisodeRecord {
        let rounded = round2(score);
        let window = self
            .config
            .average_window
            .min(self.history.len() + 1)
            .min(self.history.capacity());
        let sum: f32 = self
            .history
            .latest(window - 1)
            .map(|r| r.score)
            .chain(std::iter::once(rounded))
            .sum();
        let record = EpisodeRecord {
            episode,
            score: rounded,
            average: round2(sum / window as f32),
        };
        self.history.push(record);
        self.scale.observe(self.extrema());

        if self.best.as_ref().map_or(true, |best| score > best.score) {
            log::debug!("episode {episode}: new best score {score:.2}");
            self.best = Some(BestRun {
                score,
                episode,
                trajectory: trajectory.to_vec(),
            });
        }

        record
    }

    /// Retained episodes, oldest first
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &EpisodeRecord> + '_ {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.len() == 0
    }

    /// Rolling average as of the latest episode
    pub fn rolling_average(&self) -> Option<f32> {
        self.history.last().map(|r| r.average)
    }

    pub fn best(&self) -> Option<&BestRun> {
        self.best.as_ref()
    }

    /// `(min, max)` of the retained scores
    pub fn extrema(&self) -> Option<(f32, f32)> {
        self.history.iter().fold(None, |acc, r| match acc {
            None => Some((r.score, r.score)),
            Some((min, max)) => Some((r.score.min(min), r.score.max(max))),
        })
    }

    pub fn scale(&self) -> &ScoreScale {
        &self.scale
    }

    /// Forget the best run, e.g. when its trajectory no longer fits the grid
    pub fn clear_best(&mut self) {
        self.best = None;
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.history.clear();
        self.best = None;
        self.scale = ScoreScale::new(self.config.scale_band, self.config.scale_padding);
    }
}
