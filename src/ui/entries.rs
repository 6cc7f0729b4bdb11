use crate::api::{Backend, Entry};
use crate::app::{App, Focus};
use crate::util::{display_width, relative_time, strip_control_chars, truncate_to_width};
use chrono::{NaiveDateTime, Utc};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

const LOAD_MORE_ROW: &str = "── load more ──";

/// Render the entry list panel.
pub fn render<B: Backend>(f: &mut Frame, app: &App<B>, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }
    let state = app.controller.state();
    let width = area.width.saturating_sub(2) as usize;
    let now = Utc::now().naive_utc();

    let mut items: Vec<ListItem> = state
        .entries()
        .iter()
        .map(|entry| {
            let current = state.current_entry_id() == Some(entry.id);
            ListItem::new(entry_line(entry, current, width, now))
        })
        .collect();

    if state.next_page().is_some() {
        items.push(ListItem::new(Line::from(Span::styled(
            LOAD_MORE_ROW,
            Style::default().fg(Color::Cyan),
        ))));
    }

    let empty = items.is_empty();
    if empty {
        let hint = if state.is_loading() {
            "Loading..."
        } else if state.search_mode() {
            "No results"
        } else if state.selected_feed_id().is_some() {
            "No entries"
        } else {
            "Select a feed"
        };
        items.push(ListItem::new(hint));
    }

    let border_style = if app.focus == Focus::Entries {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let title = if app.search_mode {
        format!("Search: {}_", app.search_input)
    } else if let Some(phrase) = state.search_phrase().filter(|_| state.search_mode()) {
        format!("Results for \"{}\"", strip_control_chars(phrase))
    } else if let Some(feed) = state.selected_feed() {
        strip_control_chars(&feed.feed_title).into_owned()
    } else {
        "Entries".to_string()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut list_state = ListState::default();
    if !empty {
        list_state.select(Some(app.entry_selected));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

/// Unread marker, title and age, fitted to `width`.
fn entry_line(entry: &Entry, current: bool, width: usize, now: NaiveDateTime) -> Line<'static> {
    let marker = if entry.is_read() { "  " } else { "● " };
    let age = entry
        .published_at
        .map(|at| relative_time(at, now))
        .unwrap_or_default();
    let age_width = if age.is_empty() { 0 } else { display_width(&age) + 2 };
    let room = width.saturating_sub(2 + age_width);
    let title = strip_control_chars(&entry.title);
    let title = truncate_to_width(&title, room).into_owned();

    let title_style = if current {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else if entry.is_read() {
        Style::default().fg(Color::Gray)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    let mut spans = vec![
        Span::styled(marker, Style::default().fg(Color::Green)),
        Span::styled(title, title_style),
    ];
    if !age.is_empty() {
        spans.push(Span::styled(
            format!("  {}", age),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::entry;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_entry_line_marks_unread_and_age() {
        let now = NaiveDateTime::parse_from_str("2024-03-10 12:00", "%Y-%m-%d %H:%M").unwrap();
        let mut e = entry(1, 10, false);
        e.title = "Hello".to_string();
        e.published_at = Some(now - chrono::Duration::hours(3));

        assert_eq!(text(&entry_line(&e, false, 40, now)), "● Hello  3h");
    }

    #[test]
    fn test_entry_line_truncates_long_title() {
        let now = NaiveDateTime::parse_from_str("2024-03-10 12:00", "%Y-%m-%d %H:%M").unwrap();
        let mut e = entry(1, 10, true);
        e.title = "A very long entry title".to_string();
        e.published_at = None;

        assert_eq!(text(&entry_line(&e, false, 12, now)), "  A very ...");
    }
}
