use crossterm::event::KeyCode;
use ratatui::{prelude::*, widgets::*};
use tui_logger::{
    TuiLoggerLevelOutput, TuiLoggerSmartWidget, TuiLoggerWidget, TuiWidgetEvent, TuiWidgetState,
};

use super::Component;

/// Keys understood in both views, as `(key, action)` rows for the help popup
pub const STREAM_KEYS: [(&str, &str); 4] = [
    ("  v  ", "Switch between event stream and targets"),
    ("PgUp ", "Page mode, scroll up"),
    ("PgDn ", "Scroll down in page mode"),
    (" Esc ", "Leave page mode"),
];

/// Extra keys of the target view
pub const TARGET_KEYS: [(&str, &str); 5] = [
    ("  s  ", "Toggle the target selector"),
    ("  f  ", "Focus on the selected target"),
    ("⬆ / ⬇", "Switch log target"),
    ("⬅ / ➡", "Show one level less / more"),
    ("- / +", "Capture one level less / more"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    /// Training events, newest last, without the target column
    Stream,
    /// Per-target level selection
    Targets,
}

/// Captured training log records
pub struct Logs {
    state: TuiWidgetState,
    view: View,
}

impl Logs {
    pub fn new() -> Self {
        Self {
            state: TuiWidgetState::new().set_default_display_level(log::LevelFilter::Debug),
            view: View::Stream,
        }
    }

    /// Whether the target view is shown, which decides the help rows
    pub fn shows_targets(&self) -> bool {
        self.view == View::Targets
    }

    fn scroll_event(key: KeyCode) -> Option<TuiWidgetEvent> {
        match key {
            KeyCode::PageUp => Some(TuiWidgetEvent::PrevPageKey),
            KeyCode::PageDown => Some(TuiWidgetEvent::NextPageKey),
            KeyCode::Esc => Some(TuiWidgetEvent::EscapeKey),
            _ => None,
        }
    }

    fn target_event(key: KeyCode) -> Option<TuiWidgetEvent> {
        match key {
            KeyCode::Up => Some(TuiWidgetEvent::UpKey),
            KeyCode::Down => Some(TuiWidgetEvent::DownKey),
            KeyCode::Left => Some(TuiWidgetEvent::LeftKey),
            KeyCode::Right => Some(TuiWidgetEvent::RightKey),
            KeyCode::Char('+') => Some(TuiWidgetEvent::PlusKey),
            KeyCode::Char('-') => Some(TuiWidgetEvent::MinusKey),
            KeyCode::Char('s') => Some(TuiWidgetEvent::HideKey),
            KeyCode::Char('f') => Some(TuiWidgetEvent::FocusKey),
            _ => None,
        }
    }
}

impl WidgetRef for Logs {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        match self.view {
            View::Stream => TuiLoggerWidget::default()
                .block(
                    Block::bordered()
                        .border_type(BorderType::Rounded)
                        .title("Training events (v: targets)"),
                )
                .style_warn(Style::default().light_yellow())
                .style_info(Style::default().cyan())
                .style_debug(Style::default().gray())
                .output_timestamp(Some("%H:%M:%S".to_string()))
                .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
                .output_target(false)
                .output_file(false)
                .output_line(false)
                .output_separator(' ')
                .state(&self.state)
                .render(area, buf),
            View::Targets => TuiLoggerSmartWidget::default()
                .style(Style::default().white())
                .style_warn(Style::default().light_yellow())
                .style_info(Style::default().cyan())
                .style_debug(Style::default().gray())
                .output_separator(' ')
                .state(&self.state)
                .render(area, buf),
        }
    }
}

impl Component for Logs {
    fn handle_key(&mut self, key: KeyCode) -> bool {
        if key == KeyCode::Char('v') {
            self.view = match self.view {
                View::Stream => View::Targets,
                View::Targets => View::Stream,
            };
            return true;
        }

        let event = match self.view {
            View::Stream => Self::scroll_event(key),
            View::Targets => Self::scroll_event(key).or_else(|| Self::target_event(key)),
        };
        match event {
            Some(event) => {
                self.state.transition(event);
                true
            }
            None => false,
        }
    }
}
