use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Progress of a fast-forward batch, handed to each [`YieldPoint`] checkpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastForwardProgress {
    /// Episodes completed in this batch
    pub completed: u32,
    /// Episodes requested for this batch
    pub requested: u32,
    /// Lifetime episode counter of the session
    pub episode: u64,
    pub epsilon: f32,
    /// Rolling average score as of the latest episode
    pub average: Option<f32>,
}

impl FastForwardProgress {
    /// Completed fraction of the batch in `[0, 1]`
    pub fn ratio(&self) -> f64 {
        match self.requested {
            0 => 1.0,
            requested => f64::from(self.completed) / f64::from(requested),
        }
    }
}

/// Cooperative suspension point of a fast-forward batch
///
/// Called every few episodes so a host can refresh its display or hand control back to
/// an event loop. Returning [`ControlFlow::Break`] cancels the batch.
pub trait YieldPoint {
    fn checkpoint(&mut self, progress: &FastForwardProgress) -> ControlFlow<()>;
}

impl<F> YieldPoint for F
where
    F: FnMut(&FastForwardProgress) -> ControlFlow<()>,
{
    fn checkpoint(&mut self, progress: &FastForwardProgress) -> ControlFlow<()> {
        self(progress)
    }
}

/// A [`YieldPoint`] that never interrupts
#[derive(Debug, Clone, Copy, Default)]
pub struct NoYield;

impl YieldPoint for NoYield {
    fn checkpoint(&mut self, _progress: &FastForwardProgress) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Thread-safe requests to interrupt a running fast-forward batch
///
/// Requests are polled before every step of the batch. A reset request also cancels.
#[derive(Debug, Clone, Default)]
pub struct FastForwardHandle {
    cancel: Arc<AtomicBool>,
    reset: Arc<AtomicBool>,
}

impl FastForwardHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the batch after the current step
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Stop the batch and reset the session
    pub fn request_reset(&self) {
        self.reset.store(true, Ordering::Release);
        self.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn reset_requested(&self) -> bool {
        self.reset.load(Ordering::Acquire)
    }

    /// Clear both flags, consuming any pending request
    ///
    /// **Returns** `(cancelled, reset)` as they were before clearing
    pub(crate) fn take(&self) -> (bool, bool) {
        (
            self.cancel.swap(false, Ordering::AcqRel),
            self.reset.swap(false, Ordering::AcqRel),
        )
    }
}
