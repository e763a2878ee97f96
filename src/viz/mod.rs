use std::{
    io,
    sync::mpsc::{self, Sender},
    thread::{self, JoinHandle},
};

use crate::{
    scheduler::{FastForwardReport, Snapshot},
    yield_point::{FastForwardHandle, FastForwardProgress},
};

mod app;
mod components;
mod term;

pub use app::App;

/// Messages from the training thread to the dashboard
#[derive(Debug, Clone)]
pub enum Update {
    /// A fast-forward checkpoint
    Progress(FastForwardProgress),
    /// Full state, sent between batches
    Snapshot(Box<Snapshot>),
    /// A fast-forward batch ended
    Finished(FastForwardReport),
}

/// Install the dashboard logger and run the dashboard on its own thread
///
/// Key presses act on training through `handle`. The dashboard keeps running after the
/// sender is dropped until the user quits.
pub fn init(handle: FastForwardHandle) -> (JoinHandle<io::Result<()>>, Sender<Update>) {
    if tui_logger::init_logger(log::LevelFilter::Trace).is_err() {
        log::warn!("a logger is already installed, the Logs tab stays empty");
    }
    tui_logger::set_default_level(log::LevelFilter::Debug);

    let (tx, rx) = mpsc::channel();
    let thread = thread::spawn(move || App::new(handle).run(rx));
    (thread, tx)
}

/// Wait for the dashboard thread, reporting a panic as an error
pub fn join(thread: JoinHandle<io::Result<()>>) -> io::Result<()> {
    thread
        .join()
        .map_err(|_| io::Error::other("dashboard thread panicked"))?
}
