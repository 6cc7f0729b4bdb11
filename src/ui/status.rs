use crate::api::Backend;
use crate::app::{App, Focus};
use crate::keybindings::Action;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Render the status bar: message if any, otherwise key hints.
pub fn render<B: Backend>(f: &mut Frame, app: &App<B>, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if app.search_mode {
        Cow::Borrowed("Type to search | Esc cancel | Enter search")
    } else {
        Cow::Owned(hints(app))
    };

    let text = if app.controller.state().is_loading() {
        let frame = SPINNER[app.spinner_frame % SPINNER.len()];
        Cow::Owned(format!("{} {}", frame, text))
    } else {
        text
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), area);
}

/// Key hints for the focused panel, using the configured bindings.
fn hints<B: Backend>(app: &App<B>) -> String {
    let actions: &[(Action, &str)] = match app.focus {
        Focus::Sidebar => &[
            (Action::Select, "open"),
            (Action::NewFeed, "add feed"),
            (Action::Edit, "edit"),
            (Action::Delete, "delete"),
            (Action::Refresh, "reload"),
            (Action::ShowHelp, "help"),
            (Action::Quit, "quit"),
        ],
        Focus::Entries => &[
            (Action::Select, "read"),
            (Action::LoadMore, "more"),
            (Action::EnterSearch, "search"),
            (Action::OpenInBrowser, "open"),
            (Action::HistoryBack, "back"),
            (Action::ShowHelp, "help"),
        ],
        Focus::Reader => &[
            (Action::ScrollDown, "scroll"),
            (Action::PageDown, "page"),
            (Action::OpenInBrowser, "open"),
            (Action::Back, "close"),
            (Action::Quit, "quit"),
        ],
    };

    actions
        .iter()
        .filter_map(|(action, label)| {
            let key = app.keybindings.key_for(*action)?;
            Some(format!("[{}] {}", key, label))
        })
        .collect::<Vec<_>>()
        .join("  ")
}
