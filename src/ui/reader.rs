use crate::api::{Backend, Entry};
use crate::app::{App, Focus, MAX_SCROLL};
use crate::util::{html_to_text, strip_control_chars};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

/// Render the open entry.
pub fn render<B: Backend>(f: &mut Frame, app: &mut App<B>, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    app.reader_visible_lines = area.height.saturating_sub(2) as usize;
    let viewport_width = area.width.saturating_sub(2) as usize;

    let Some(entry) = app.controller.state().current_entry() else {
        return;
    };
    let lines = entry_lines(entry);
    let content_lines = wrapped_height(&lines, viewport_width);

    // Clamp before drawing so a resize never shows an out-of-range frame.
    app.clamp_scroll(content_lines);

    let border_style = if app.focus == Focus::Reader {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let paragraph = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title("Entry"),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset.min(MAX_SCROLL) as u16, 0));

    f.render_widget(paragraph, area);
}

/// Header (title, author, link) followed by the sanitized body.
pub fn entry_lines(entry: &Entry) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        strip_control_chars(&entry.title).into_owned(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    let mut meta = Vec::new();
    if let Some(author) = entry.author.as_deref().filter(|a| !a.is_empty()) {
        meta.push(strip_control_chars(author).into_owned());
    }
    if let Some(at) = entry.published_at {
        meta.push(at.format("%Y-%m-%d %H:%M").to_string());
    }
    if !meta.is_empty() {
        lines.push(Line::from(Span::styled(
            meta.join(" • "),
            Style::default().fg(Color::DarkGray),
        )));
    }
    if let Some(link) = entry.link.as_deref() {
        lines.push(Line::from(Span::styled(
            strip_control_chars(link).into_owned(),
            Style::default().fg(Color::Blue),
        )));
    }
    lines.push(Line::from(""));

    match entry.summary.as_deref().map(html_to_text) {
        Some(body) if !body.is_empty() => {
            lines.extend(body.lines().map(|l| Line::from(l.to_string())));
        }
        _ => lines.push(Line::from(Span::styled(
            "No content",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    lines
}

/// Display rows the lines take when wrapped at `width` columns.
fn wrapped_height(lines: &[Line], width: usize) -> usize {
    if width == 0 {
        return lines.len();
    }
    lines
        .iter()
        .map(|line| {
            let w: usize = line.spans.iter().map(|s| s.content.width()).sum();
            w.div_ceil(width).max(1)
        })
        .sum()
}
