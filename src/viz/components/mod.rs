mod grid;
mod help;
mod log;
mod plot;

use crossterm::event::KeyCode;
use ratatui::widgets::WidgetRef;

pub use grid::GridView;
pub use help::render_help;
pub use self::log::Logs;
pub use plot::{Plot, Plots};

/// A widget that reacts to key presses
pub trait Component: WidgetRef {
    /// **Returns** whether the key was consumed
    fn handle_key(&mut self, key: KeyCode) -> bool;
}
