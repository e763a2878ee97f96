use ratatui::{prelude::*, widgets::*};

use super::log::{STREAM_KEYS, TARGET_KEYS};

fn key_line(key: &'static str, action: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::from(key).light_cyan().bold(),
        Span::raw(" : "),
        Span::raw(action),
    ])
}

/// Popup listing the key bindings of the selected tab
pub fn render_help(area: Rect, buf: &mut Buffer, selected_tab: usize, log_targets: bool) {
    let mut lines = vec![
        key_line("  q  ", "Cancel training and exit"),
        key_line("  c  ", "Cancel the fast-forward batch"),
        key_line("  r  ", "Reset training"),
        key_line("  h  ", "Toggle help popup"),
        key_line(" Tab ", "Switch tabs"),
    ];

    match selected_tab {
        0 => lines.push(key_line("⬅ / ➡", "Switch plots")),
        1 => {
            lines.extend(STREAM_KEYS.map(|(key, action)| key_line(key, action)));
            if log_targets {
                lines.extend(TARGET_KEYS.map(|(key, action)| key_line(key, action)));
            }
        }
        _ => {}
    }

    let [_, center_vert, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length((lines.len() + 4) as u16),
        Constraint::Fill(1),
    ])
    .areas(area);

    let [_, center, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(60),
        Constraint::Fill(1),
    ])
    .areas(center_vert);

    Clear.render(center, buf);

    Paragraph::new(lines)
        .block(
            Block::bordered()
                .border_type(BorderType::Rounded)
                .padding(Padding::horizontal(1))
                .title("Help"),
        )
        .render(center, buf);
}
