use ratatui::{prelude::*, widgets::*};

use crate::{grid::CellKind, scheduler::Snapshot};

/// The grid with the agent, the remaining items and the best trajectory
pub struct GridView<'a> {
    pub snapshot: &'a Snapshot,
}

impl GridView<'_> {
    fn cell(&self, pos: (usize, usize)) -> Span<'static> {
        let snapshot = self.snapshot;
        if pos == snapshot.position {
            return Span::from(" @ ").black().on_light_yellow().bold();
        }
        let on_best = snapshot.best_trajectory.contains(&pos);
        let span = match snapshot.layout.kind(pos) {
            CellKind::Start => Span::from(" S ").light_blue(),
            CellKind::Goal => Span::from(" G ").light_green().bold(),
            CellKind::Hazard => Span::from(" H ").light_red().bold(),
            CellKind::Wall => Span::from("███").dark_gray(),
            CellKind::Item if snapshot.remaining_items.contains(&pos) => {
                Span::from(" * ").light_magenta()
            }
            CellKind::Item | CellKind::Empty => Span::from(" · ").gray(),
        };
        if on_best {
            span.on_blue()
        } else {
            span
        }
    }
}

impl Widget for GridView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layout = &self.snapshot.layout;
        let lines: Vec<Line> = (0..layout.rows())
            .map(|r| Line::from((0..layout.cols()).map(|c| self.cell((r, c))).collect::<Vec<_>>()))
            .collect();

        let title = match self.snapshot.best_score {
            Some(best) => format!("Grid (best {best:.2})"),
            None => String::from("Grid"),
        };
        Paragraph::new(lines)
            .block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .padding(Padding::uniform(1))
                    .title(title),
            )
            .render(area, buf);
    }
}
