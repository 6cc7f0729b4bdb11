//! Help overlay: the active key bindings grouped by panel.

use crate::api::Backend;
use crate::app::App;
use crate::keybindings::{Context, KeybindingRegistry};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table},
    Frame,
};

const SECTIONS: [(Context, &str); 5] = [
    (Context::Global, "General"),
    (Context::Sidebar, "Sidebar"),
    (Context::EntryList, "Entry List"),
    (Context::Reader, "Reader"),
    (Context::Search, "Search"),
];

pub fn render<B: Backend>(f: &mut Frame, app: &App<B>) {
    let overlay = centered_rect(80, 80, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }
    f.render_widget(Clear, overlay);

    let rows = help_rows(&app.keybindings);
    let total_rows = rows.len();

    // borders plus the header row
    let visible_height = overlay.height.saturating_sub(3) as usize;
    let max_scroll = total_rows.saturating_sub(visible_height);
    let scroll = app.help_scroll_offset.min(max_scroll);

    let heading = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let visible: Vec<Row> = rows
        .into_iter()
        .skip(scroll)
        .take(visible_height)
        .map(|(key, text)| match key {
            Some(key) => Row::new(vec![format!("  {}", key), text]),
            None if text.is_empty() => Row::new(vec![String::new(), String::new()]),
            None => Row::new(vec![Line::from(Span::styled(text, heading)), Line::from("")]),
        })
        .collect();

    let title = if max_scroll > 0 {
        format!(" Help ({}/{}) ", scroll + 1, max_scroll + 1)
    } else {
        " Help (? to close) ".to_string()
    };

    let table = Table::new(visible, [Constraint::Length(16), Constraint::Min(20)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(title),
        )
        .header(
            Row::new(vec!["Key", "Action"])
                .style(
                    Style::default()
                        .add_modifier(Modifier::BOLD)
                        .add_modifier(Modifier::UNDERLINED),
                )
                .bottom_margin(1),
        );
    f.render_widget(table, overlay);

    if scroll < max_scroll {
        let hint = Span::styled(
            " j/k to scroll, ? or Esc to close ",
            Style::default().fg(Color::DarkGray),
        );
        let hint_area = Rect {
            x: overlay.x + 1,
            y: overlay.y + overlay.height.saturating_sub(1),
            width: overlay.width.saturating_sub(2),
            height: 1,
        };
        f.render_widget(Paragraph::new(Line::from(hint)), hint_area);
    }
}

/// Flat table rows: `(None, heading)` starts a section, `(None, "")` separates
/// sections, `(Some(key), description)` is a binding.
fn help_rows(registry: &KeybindingRegistry) -> Vec<(Option<String>, String)> {
    let bindings = registry.all_bindings();
    let mut rows = Vec::new();

    for (ctx, label) in &SECTIONS {
        let mut section = bindings.iter().filter(|(c, ..)| c == ctx).peekable();
        if section.peek().is_none() {
            continue;
        }
        if !rows.is_empty() {
            rows.push((None, String::new()));
        }
        rows.push((None, format!("-- {} --", label)));
        rows.extend(section.map(|(_, key, _, desc)| (Some(key.clone()), desc.to_string())));
    }
    rows
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}
