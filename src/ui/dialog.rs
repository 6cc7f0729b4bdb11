//! Dialog overlay for the create/edit/delete flows.

use crate::api::Category;
use crate::dialogs::Dialog;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::render::centered;

/// Draw `dialog` centered over the current view.
pub fn render(f: &mut Frame, dialog: &Dialog, categories: &[Category]) {
    let lines = dialog_lines(dialog, categories);
    let height = lines.len() as u16 + 2;
    let overlay = centered(f.area(), 64, height);
    if overlay.width < 20 || overlay.height < 5 {
        return;
    }

    f.render_widget(Clear, overlay);
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(format!(" {} ", dialog.title())),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, overlay);
}

fn dialog_lines(dialog: &Dialog, categories: &[Category]) -> Vec<Line<'static>> {
    let focused = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    if let Some(question) = dialog.confirmation() {
        lines.push(Line::from(question));
    }

    for (idx, field) in dialog.fields().iter().enumerate() {
        let value = if field.secret {
            "*".repeat(field.value.chars().count())
        } else {
            field.value.clone()
        };
        let is_focused = idx == dialog.focus();
        let cursor = if is_focused { "_" } else { "" };
        let label_style = if is_focused { focused } else { Style::default() };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<12} ", field.label), label_style),
            Span::raw(format!("{}{}", value, cursor)),
        ]));
    }

    if dialog.has_category_picker() {
        let name = dialog
            .category()
            .and_then(|id| categories.iter().find(|c| c.id == id))
            .map(|c| c.title.clone())
            .unwrap_or_else(|| "(none)".to_string());
        let label_style = if dialog.picker_focused() {
            focused
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<12} ", "Category"), label_style),
            Span::raw(format!("< {} >", name)),
        ]));
    }

    lines.push(Line::from(""));
    if let Some(error) = dialog.error() {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )));
    }

    let footer = if dialog.is_pending() {
        "Saving..."
    } else if dialog.confirmation().is_some() {
        "(y/Enter) Delete  (n/Esc) Cancel"
    } else if dialog.has_category_picker() {
        "(Tab) Next field  (Left/Right) Category  (Enter) Save  (Esc) Cancel"
    } else {
        "(Tab) Next field  (Enter) Save  (Esc) Cancel"
    };
    lines.push(Line::from(Span::styled(
        footer,
        Style::default().fg(Color::DarkGray),
    )));
    lines
}
