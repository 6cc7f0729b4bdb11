//! Render dispatch for the TUI.

use crate::api::Backend;
use crate::app::App;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    widgets::Paragraph,
    Frame,
};

use super::{dialog, entries, help, reader, sidebar, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Draw the whole screen: panels, status bar, then any overlay.
pub(super) fn render<B: Backend>(f: &mut Frame, app: &mut App<B>) {
    let area = f.area();
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    render_panels(f, app, rows[0]);
    status::render(f, app, rows[1]);

    if let Some(d) = app.controller.dialog() {
        dialog::render(f, d, app.controller.state().categories());
    }
    if app.show_help {
        help::render(f, app);
    }
}

/// Sidebar on the left; entry list and reader stacked on the right.
/// The reader only takes space while an entry is open.
fn render_panels<B: Backend>(f: &mut Frame, app: &mut App<B>, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(area);

    sidebar::render(f, app, columns[0]);

    if app.controller.state().current_entry().is_some() {
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(columns[1]);
        entries::render(f, app, right[0]);
        reader::render(f, app, right[1]);
    } else {
        entries::render(f, app, columns[1]);
    }
}

/// Rectangle of at most `width` x `height` centered in `area`.
pub(super) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}
