//! Input handling for the TUI.
//!
//! Overlays (help, dialog, search bar) capture keys first; everything else
//! goes through the keybinding registry for the focused panel.

use crate::api::{Backend, MoveDirection};
use crate::app::{App, Focus};
use crate::keybindings::Action as KbAction;
use crate::util::{validate_url_for_open, MAX_SEARCH_QUERY_LENGTH};
use crossterm::event::{KeyCode, KeyModifiers};

use super::Action;

const ERR_ENTRY_NO_LINK: &str = "Entry has no link";

/// Main input dispatch.
pub(super) fn handle_input<B: Backend>(
    app: &mut App<B>,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Action {
    if app.show_help {
        return handle_help_input(app, code);
    }

    if app.controller.dialog().is_some() {
        handle_dialog_input(app, code);
        return Action::Continue;
    }

    if app.search_mode {
        handle_search_input(app, code, modifiers);
        return Action::Continue;
    }

    handle_browse_input(app, code, modifiers)
}

/// Help overlay: j/k scroll, Esc/q/? dismiss.
fn handle_help_input<B: Backend>(app: &mut App<B>, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
    Action::Continue
}

/// Dialog overlay. Delete dialogs are yes/no; form dialogs edit fields.
fn handle_dialog_input<B: Backend>(app: &mut App<B>, code: KeyCode) {
    let confirm_only = app
        .controller
        .dialog()
        .is_some_and(|d| d.fields().is_empty() && !d.has_category_picker());

    match code {
        KeyCode::Esc => app.controller.cancel_dialog(),
        KeyCode::Char('n') | KeyCode::Char('N') if confirm_only => app.controller.cancel_dialog(),
        KeyCode::Enter => submit_dialog(app),
        KeyCode::Char('y') | KeyCode::Char('Y') if confirm_only => submit_dialog(app),
        code => {
            let categories = app.controller.state().categories().to_vec();
            let Some(dialog) = app.controller.dialog_mut() else {
                return;
            };
            if dialog.is_pending() {
                return;
            }
            match code {
                KeyCode::Tab | KeyCode::Down => dialog.focus_next(),
                KeyCode::BackTab | KeyCode::Up => dialog.focus_prev(),
                KeyCode::Left if dialog.picker_focused() => dialog.cycle_category(&categories, -1),
                KeyCode::Right | KeyCode::Char(' ') if dialog.picker_focused() => {
                    dialog.cycle_category(&categories, 1)
                }
                KeyCode::Backspace => dialog.backspace(),
                KeyCode::Char(c) => dialog.insert_char(c),
                _ => {}
            }
        }
    }
}

fn submit_dialog<B: Backend>(app: &mut App<B>) {
    if let Err(e) = app.controller.submit_dialog() {
        tracing::debug!(error = %e, "Dialog validation failed");
    }
}

/// Search bar: type a phrase, Enter runs it, Esc cancels.
fn handle_search_input<B: Backend>(app: &mut App<B>, code: KeyCode, modifiers: KeyModifiers) {
    let action = app
        .keybindings
        .action_for_key(code, modifiers, app.key_context());

    match action {
        Some(KbAction::ExitSearch) => app.exit_search(),
        Some(KbAction::CommitSearch) => app.commit_search(),
        _ => match code {
            KeyCode::Backspace => {
                app.search_input.pop();
            }
            KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
                if app.search_input.chars().count() >= MAX_SEARCH_QUERY_LENGTH {
                    app.set_status(format!(
                        "Search query too long (max {} chars)",
                        MAX_SEARCH_QUERY_LENGTH
                    ));
                } else {
                    app.search_input.push(c);
                }
            }
            _ => {}
        },
    }
}

/// Browse input: sidebar, entry list and reader.
fn handle_browse_input<B: Backend>(
    app: &mut App<B>,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Action {
    let action = app
        .keybindings
        .action_for_key(code, modifiers, app.key_context());

    match action {
        Some(KbAction::Quit) => return Action::Quit,
        Some(KbAction::NavDown) => app.nav_down(),
        Some(KbAction::NavUp) => app.nav_up(),
        Some(KbAction::CycleFocus) => app.cycle_focus(),
        Some(KbAction::Select) => app.activate(),
        Some(KbAction::Back) => app.back(),
        Some(KbAction::HistoryBack) => app.history_back(),
        Some(KbAction::Refresh) => {
            app.controller.refresh();
            app.set_status("Reloading...");
        }
        Some(KbAction::EnterSearch) => app.enter_search(),
        Some(KbAction::LoadMore) => app.load_more(),
        Some(KbAction::OpenInBrowser) => open_current_link(app),
        Some(KbAction::NewCategory) => app.new_category(),
        Some(KbAction::NewFeed) => app.new_feed(),
        Some(KbAction::Edit) => app.edit_selected(),
        Some(KbAction::Delete) => app.delete_selected(),
        Some(KbAction::MoveUp) => app.move_selected(MoveDirection::Up),
        Some(KbAction::MoveDown) => app.move_selected(MoveDirection::Down),
        Some(KbAction::EditUser) => app.edit_user(),
        Some(KbAction::ScrollDown) => app.scroll_down(1),
        Some(KbAction::ScrollUp) => app.scroll_up(1),
        Some(KbAction::PageDown) => app.scroll_down(app.page_size()),
        Some(KbAction::PageUp) => app.scroll_up(app.page_size()),
        Some(KbAction::ShowHelp) => {
            app.show_help = true;
            app.help_scroll_offset = 0;
        }
        Some(KbAction::ExitSearch) | Some(KbAction::CommitSearch) | None => {}
    }
    Action::Continue
}

/// Open the link of the open entry, or of the entry under the cursor.
fn open_current_link<B: Backend>(app: &mut App<B>) {
    let state = app.controller.state();
    let entry = if app.focus == Focus::Reader {
        state.current_entry()
    } else {
        app.selected_entry()
    };
    let Some(entry) = entry else {
        return;
    };
    let Some(url) = entry.link.clone() else {
        app.set_status(ERR_ENTRY_NO_LINK);
        return;
    };

    // Links come from third-party feeds; validate before handing to the OS.
    if let Err(e) = validate_url_for_open(&url) {
        app.set_status(e.to_string());
    } else if let Err(e) = open::that(&url) {
        app.set_status(format!("Failed to open browser: {}", e));
    }
}
