use std::{
    io,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{prelude::*, widgets::*};

use super::{
    components::{render_help, Component, GridView, Logs, Plot, Plots},
    term::TerminalGuard,
    Update,
};
use crate::{
    scheduler::{FastForwardOutcome, FastForwardReport, Snapshot},
    yield_point::{FastForwardHandle, FastForwardProgress},
};

const TABS: [&str; 2] = ["Training", "Logs"];
const AVERAGE_PLOT: usize = 0;
const EPSILON_PLOT: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Train,
    /// The training thread hung up
    Done,
    Quit,
}

/// The root TUI component which holds the dashboard state and runs the render loop
pub struct App {
    state: State,
    handle: FastForwardHandle,
    selected_tab: usize,
    show_help: bool,
    plots: Plots,
    logs: Logs,
    progress: Option<FastForwardProgress>,
    snapshot: Option<Snapshot>,
    last_report: Option<FastForwardReport>,
}

impl App {
    pub fn new(handle: FastForwardHandle) -> Self {
        Self {
            state: State::default(),
            handle,
            selected_tab: 0,
            show_help: false,
            plots: Plots::new(vec![Plot::new("Average score"), Plot::new("Epsilon")]),
            logs: Logs::new(),
            progress: None,
            snapshot: None,
            last_report: None,
        }
    }

    fn apply(&mut self, update: Update) {
        match update {
            Update::Progress(progress) => {
                let x = progress.episode as f64;
                if let Some(average) = progress.average {
                    if let Some(plot) = self.plots.get_mut(AVERAGE_PLOT) {
                        plot.update((x, average.into()));
                    }
                }
                if let Some(plot) = self.plots.get_mut(EPSILON_PLOT) {
                    plot.update((x, progress.epsilon.into()));
                }
                self.progress = Some(progress);
            }
            Update::Snapshot(snapshot) => {
                if let Some(plot) = self.plots.get_mut(AVERAGE_PLOT) {
                    let [low, high] = snapshot.score_bounds;
                    plot.set_y_bounds([low.into(), high.into()]);
                    if snapshot.history.is_empty() {
                        plot.replace(Vec::new());
                    }
                }
                self.snapshot = Some(*snapshot);
            }
            Update::Finished(report) => {
                if report.outcome == FastForwardOutcome::Reset {
                    for index in [AVERAGE_PLOT, EPSILON_PLOT] {
                        if let Some(plot) = self.plots.get_mut(index) {
                            plot.replace(Vec::new());
                        }
                    }
                }
                self.last_report = Some(report);
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => {
                self.handle.cancel();
                self.state = State::Quit;
            }
            KeyCode::Char('c') => self.handle.cancel(),
            KeyCode::Char('r') => self.handle.request_reset(),
            KeyCode::Char('h') => self.show_help = !self.show_help,
            KeyCode::Tab => self.selected_tab = (self.selected_tab + 1) % TABS.len(),
            key if self.selected_tab == 1 => {
                self.logs.handle_key(key);
            }
            KeyCode::Left => self.plots.prev_plot(),
            KeyCode::Right => self.plots.next_plot(),
            _ => {}
        }
    }

    /// Initialize the terminal and run the main loop until the user quits
    ///
    /// Restores the terminal on exit
    pub fn run(&mut self, rx: Receiver<Update>) -> io::Result<()> {
        let mut guard = TerminalGuard::enter()?;

        while self.state != State::Quit {
            if self.state == State::Train {
                loop {
                    match rx.try_recv() {
                        Ok(update) => self.apply(update),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            self.state = State::Done;
                            break;
                        }
                    }
                }
            }

            guard
                .terminal
                .draw(|frame| frame.render_widget(&*self, frame.size()))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        Ok(())
    }

    fn status_line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        if let Some(s) = &self.snapshot {
            spans.push(Span::from(format!("{:?}", s.status)).light_green().bold());
            spans.push(Span::raw(format!(
                "  episode {}  epsilon {:.3}  average {}  best {}",
                s.episode,
                s.epsilon,
                s.rolling_average
                    .map_or_else(|| String::from("-"), |a| format!("{a:.2}")),
                s.best_score.map_or_else(|| String::from("-"), |b| format!("{b:.2}")),
            )));
        }
        if let Some(report) = &self.last_report {
            spans.push(Span::raw(format!(
                "  last batch {:?} after {} episodes",
                report.outcome, report.episodes
            )));
        }
        if self.state == State::Done {
            spans.push(Span::from("  training finished, press q to exit").yellow());
        }
        Line::from(spans)
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [menu_area, main_area, status_area, progress_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .areas(area);

        Tabs::new(TABS)
            .block(Block::default().padding(Padding::uniform(1)))
            .white()
            .bold()
            .highlight_style(Style::default().light_green())
            .select(self.selected_tab)
            .render(menu_area, buf);

        match self.selected_tab {
            0 => {
                let grid_width = self
                    .snapshot
                    .as_ref()
                    .map_or(0, |s| s.layout.cols() as u16 * 3 + 4);
                let [grid_area, plot_area] = Layout::horizontal([
                    Constraint::Length(grid_width.max(24)),
                    Constraint::Fill(1),
                ])
                .areas(main_area);
                if let Some(snapshot) = &self.snapshot {
                    GridView { snapshot }.render(grid_area, buf);
                }
                self.plots.render(plot_area, buf);
            }
            1 => self.logs.render_ref(main_area, buf),
            _ => {}
        }

        self.status_line().render(status_area, buf);

        let ratio = self.progress.map_or(0.0, |p| p.ratio()).clamp(0.0, 1.0);
        Gauge::default()
            .block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .title("Fast-forward"),
            )
            .gauge_style(Color::Cyan)
            .ratio(ratio)
            .render(progress_area, buf);

        if self.show_help {
            render_help(area, buf, self.selected_tab, self.logs.shows_targets());
        }
    }
}
