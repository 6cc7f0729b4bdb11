use crate::api::Backend;
use crate::app::{sidebar_items, App, Focus, SidebarItem};
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

const NEW_MARKER: &str = "● ";
const FAILURE_BANNER: &str = "Could not load categories. Press r to retry.";

/// Render the category/feed sidebar.
pub fn render<B: Backend>(f: &mut Frame, app: &App<B>, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }
    let state = app.controller.state();

    let area = if state.failed_load_categories() {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);
        let banner = Paragraph::new(FAILURE_BANNER)
            .style(Style::default().fg(Color::Red))
            .wrap(ratatui::widgets::Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(banner, split[0]);
        split[1]
    } else {
        area
    };

    let width = area.width.saturating_sub(2) as usize;
    let selected_feed = state.selected_feed_id();
    let items: Vec<ListItem> = if !state.categories_loaded() {
        vec![ListItem::new("Loading...")]
    } else if state.categories().is_empty() {
        vec![ListItem::new("No categories yet. Press c to add one.")]
    } else {
        sidebar_items(state.categories())
            .into_iter()
            .filter_map(|item| match item {
                SidebarItem::Category(id) => {
                    let category = state.category(id)?;
                    let unread: i64 = category.feeds.iter().map(|f| f.unread.max(0)).sum();
                    let label = format_label(&category.title, unread, width);
                    Some(ListItem::new(Line::from(Span::styled(
                        label,
                        Style::default().add_modifier(Modifier::BOLD),
                    ))))
                }
                SidebarItem::Feed(id) => {
                    let feed = state.find_feed(id)?;
                    let mut spans = vec![Span::raw("  ")];
                    if feed.new_entries {
                        spans.push(Span::styled(NEW_MARKER, Style::default().fg(Color::Green)));
                    }
                    let used = 2 + if feed.new_entries { 2 } else { 0 };
                    let label = format_label(&feed.feed_title, feed.unread, width.saturating_sub(used));
                    let style = if selected_feed == Some(id) {
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                    } else if feed.unread > 0 {
                        Style::default().add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::Gray)
                    };
                    spans.push(Span::styled(label, style));
                    Some(ListItem::new(Line::from(spans)))
                }
            })
            .collect()
    };

    let border_style = if app.focus == Focus::Sidebar {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title("Categories"),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut list_state = ListState::default();
    if state.categories_loaded() && !state.categories().is_empty() {
        list_state.select(Some(app.sidebar_selected));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

/// `title (unread)`, cut to `width` columns. Zero unread shows no count.
fn format_label(title: &str, unread: i64, width: usize) -> String {
    let title = strip_control_chars(title);
    let count = if unread > 0 {
        format!(" ({})", unread)
    } else {
        String::new()
    };
    let room = width.saturating_sub(count.len());
    format!("{}{}", truncate_to_width(&title, room), count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_label_with_count() {
        assert_eq!(format_label("Example Feed", 2, 40), "Example Feed (2)");
        assert_eq!(format_label("Example Feed", 0, 40), "Example Feed");
    }

    #[test]
    fn test_format_label_truncates_title_not_count() {
        assert_eq!(format_label("Example Feed", 12, 12), "Exam... (12)");
    }
}
