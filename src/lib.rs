//! Tabular Q-learning on small editable grid worlds
//!
//! A [`Scheduler`](scheduler::Scheduler) owns a [`TrainingSession`](session::TrainingSession)
//! and drives it one step at a time, on timed ticks, or in uninterrupted fast-forward
//! batches. Renderers pull a [`Snapshot`](scheduler::Snapshot); the library never draws.

/// Implemented RL algorithms
pub mod algo;

/// Configuration types and sanitizers for host input
pub mod config;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Data structures
pub mod ds;

/// Dense state encoding
pub mod encoder;

/// Environment
pub mod env;

/// Exploration policies
pub mod exploration;

/// Grid layout and cell kinds
pub mod grid;

/// Episode scheduling in stepped, timed and fast-forward mode
pub mod scheduler;

/// Training state of a run
pub mod session;

/// Score history and best-run tracking
pub mod telemetry;

/// The grid world environment
pub mod world;

/// Cooperative suspension and cancellation of fast-forward batches
pub mod yield_point;

/// Terminal dashboard
#[cfg(feature = "viz")]
pub mod viz;

mod util;
