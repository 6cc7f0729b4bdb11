use crate::api::{Backend, Category, CategoryId, Entry, Feed, FeedId, MoveDirection};
use crate::dialogs::DialogRequest;
use crate::keybindings::{Context, KeybindingRegistry};
use crate::sync::{SyncController, SyncEvent};
use std::borrow::Cow;
use tokio::time::Instant;

/// Maximum scroll offset for the reader (ratatui u16 limit).
pub const MAX_SCROLL: usize = u16::MAX as usize;

/// How long a status message stays on screen.
const STATUS_TTL_SECS: u64 = 3;

// ============================================================================
// Focus and Sidebar
// ============================================================================

/// Which panel has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Entries,
    Reader,
}

/// One row of the flattened category/feed sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarItem {
    Category(CategoryId),
    Feed(FeedId),
}

/// Flatten categories into sidebar rows: each category followed by its feeds.
pub fn sidebar_items(categories: &[Category]) -> Vec<SidebarItem> {
    let mut items = Vec::with_capacity(categories.iter().map(|c| c.feeds.len() + 1).sum());
    for category in categories {
        items.push(SidebarItem::Category(category.id));
        items.extend(category.feeds.iter().map(|f| SidebarItem::Feed(f.id)));
    }
    items
}

// ============================================================================
// App
// ============================================================================

/// Terminal front end state around a [`SyncController`].
///
/// The controller owns the view state and the location; `App` only adds
/// what the terminal needs: cursors, focus, search input, status line.
pub struct App<B: Backend> {
    pub controller: SyncController<B>,
    pub keybindings: KeybindingRegistry,

    pub focus: Focus,
    /// Cursor into [`sidebar_items`].
    pub sidebar_selected: usize,
    /// Cursor into the entry list; `entries.len()` is the "load more" row.
    pub entry_selected: usize,
    pub scroll_offset: usize,
    /// Reader viewport height, updated by the renderer.
    pub reader_visible_lines: usize,

    pub search_mode: bool,
    pub search_input: String,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    pub spinner_frame: usize,

    pub show_help: bool,
    pub help_scroll_offset: usize,

    /// Account fields pre-filled into the edit-user dialog.
    pub user_name: String,
    pub user_email: String,

    /// Selected feed the sidebar cursor last followed.
    followed_feed: Option<FeedId>,
}

impl<B: Backend> App<B> {
    pub fn new(controller: SyncController<B>, keybindings: KeybindingRegistry) -> Self {
        Self {
            controller,
            keybindings,
            focus: Focus::Sidebar,
            sidebar_selected: 0,
            entry_selected: 0,
            scroll_offset: 0,
            reader_visible_lines: 0,
            search_mode: false,
            search_input: String::new(),
            status_message: None,
            needs_redraw: true,
            spinner_frame: 0,
            show_help: false,
            help_scroll_offset: 0,
            user_name: String::new(),
            user_email: String::new(),
            followed_feed: None,
        }
    }

    /// Keybinding context for the current focus and input mode.
    pub fn key_context(&self) -> Context {
        if self.search_mode {
            return Context::Search;
        }
        match self.focus {
            Focus::Sidebar => Context::Sidebar,
            Focus::Entries => Context::EntryList,
            Focus::Reader => Context::Reader,
        }
    }

    // ------------------------------------------------------------------------
    // Sync results
    // ------------------------------------------------------------------------

    /// Apply a background result and surface alerts/notices in the status bar.
    pub fn on_sync_event(&mut self, event: SyncEvent) {
        self.controller.handle_event(event);
        if let Some(alert) = self.controller.take_alert() {
            self.set_status(alert);
        }
        if let Some(notice) = self.controller.take_notice() {
            self.set_status(notice);
        }
        self.follow_selection();
        self.clamp_selections();
        self.needs_redraw = true;
    }

    /// Move the sidebar cursor to the selected feed when the selection changed
    /// underneath it (location restore, history, deletes).
    fn follow_selection(&mut self) {
        let selected = self.controller.state().selected_feed_id();
        if selected == self.followed_feed {
            return;
        }
        self.followed_feed = selected;
        self.entry_selected = 0;
        self.scroll_offset = 0;
        if let Some(id) = selected {
            let items = sidebar_items(self.controller.state().categories());
            if let Some(idx) = items.iter().position(|i| *i == SidebarItem::Feed(id)) {
                self.sidebar_selected = idx;
            }
        } else if self.focus == Focus::Reader {
            self.focus = Focus::Entries;
        }
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Keep cursors inside their lists after the lists changed.
    pub fn clamp_selections(&mut self) {
        let sidebar_len = sidebar_items(self.controller.state().categories()).len();
        self.sidebar_selected = self.sidebar_selected.min(sidebar_len.saturating_sub(1));
        self.entry_selected = self
            .entry_selected
            .min(self.entry_rows().saturating_sub(1));

        if self.focus == Focus::Reader && self.controller.state().current_entry().is_none() {
            self.focus = Focus::Entries;
        }
    }

    pub fn selected_sidebar_item(&self) -> Option<SidebarItem> {
        sidebar_items(self.controller.state().categories())
            .get(self.sidebar_selected)
            .copied()
    }

    /// Category under the sidebar cursor, or the category of the feed under it.
    pub fn selected_category(&self) -> Option<&Category> {
        let state = self.controller.state();
        let id = match self.selected_sidebar_item()? {
            SidebarItem::Category(id) => id,
            SidebarItem::Feed(id) => state.find_feed(id)?.category_id,
        };
        state.category(id)
    }

    pub fn cursor_feed(&self) -> Option<&Feed> {
        match self.selected_sidebar_item()? {
            SidebarItem::Feed(id) => self.controller.state().find_feed(id),
            SidebarItem::Category(_) => None,
        }
    }

    /// Rows of the entry list, including the "load more" row.
    pub fn entry_rows(&self) -> usize {
        let state = self.controller.state();
        state.entries().len() + usize::from(state.next_page().is_some())
    }

    pub fn on_load_more_row(&self) -> bool {
        let state = self.controller.state();
        state.next_page().is_some() && self.entry_selected == state.entries().len()
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        self.controller.state().entries().get(self.entry_selected)
    }

    /// Navigate up in the focused list.
    pub fn nav_up(&mut self) {
        match self.focus {
            Focus::Sidebar => self.sidebar_selected = self.sidebar_selected.saturating_sub(1),
            Focus::Entries => self.entry_selected = self.entry_selected.saturating_sub(1),
            Focus::Reader => self.scroll_up(1),
        }
    }

    /// Navigate down in the focused list.
    pub fn nav_down(&mut self) {
        match self.focus {
            Focus::Sidebar => {
                let max = sidebar_items(self.controller.state().categories())
                    .len()
                    .saturating_sub(1);
                self.sidebar_selected = (self.sidebar_selected + 1).min(max);
            }
            Focus::Entries => {
                let max = self.entry_rows().saturating_sub(1);
                self.entry_selected = (self.entry_selected + 1).min(max);
            }
            Focus::Reader => self.scroll_down(1),
        }
    }

    /// Sidebar → entries → reader (when an entry is open) → sidebar.
    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Sidebar => Focus::Entries,
            Focus::Entries if self.controller.state().current_entry().is_some() => Focus::Reader,
            Focus::Entries | Focus::Reader => Focus::Sidebar,
        };
    }

    /// Enter on the focused row.
    pub fn activate(&mut self) {
        match self.focus {
            Focus::Sidebar => {
                if let Some(SidebarItem::Feed(id)) = self.selected_sidebar_item() {
                    self.controller.select_feed(id);
                    self.followed_feed = Some(id);
                    self.entry_selected = 0;
                    self.scroll_offset = 0;
                    self.focus = Focus::Entries;
                }
            }
            Focus::Entries => {
                if self.on_load_more_row() {
                    self.load_more();
                    return;
                }
                let Some(id) = self.selected_entry().map(|e| e.id) else {
                    return;
                };
                self.controller.toggle_entry(id);
                if self.controller.state().current_entry_id() == Some(id) {
                    self.scroll_offset = 0;
                    self.focus = Focus::Reader;
                }
            }
            Focus::Reader => {}
        }
    }

    /// Esc: close the reader, or step focus back toward the sidebar.
    pub fn back(&mut self) {
        match self.focus {
            Focus::Reader => {
                self.controller.set_current_entry(None);
                self.focus = Focus::Entries;
            }
            Focus::Entries => self.focus = Focus::Sidebar,
            Focus::Sidebar => {}
        }
    }

    /// Backspace: previous location.
    pub fn history_back(&mut self) {
        if !self.controller.go_back() {
            self.set_status("No previous location");
            return;
        }
        self.follow_selection();
        self.clamp_selections();
    }

    pub fn load_more(&mut self) {
        if !self.controller.load_next_page() {
            self.set_status("No more entries");
        }
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    pub fn enter_search(&mut self) {
        self.search_mode = true;
        self.search_input.clear();
    }

    pub fn exit_search(&mut self) {
        self.search_mode = false;
        self.search_input.clear();
    }

    pub fn commit_search(&mut self) {
        self.search_mode = false;
        let phrase = std::mem::take(&mut self.search_input);
        if phrase.trim().is_empty() {
            return;
        }
        self.controller.do_search(&phrase);
        self.entry_selected = 0;
        self.focus = Focus::Entries;
    }

    // ------------------------------------------------------------------------
    // Dialogs and category order
    // ------------------------------------------------------------------------

    pub fn new_category(&mut self) {
        self.controller.open_dialog(DialogRequest::CreateCategory);
    }

    /// Subscribe dialog, pre-assigned to the category under the cursor.
    pub fn new_feed(&mut self) {
        let category = self
            .selected_category()
            .map(|c| c.id)
            .or_else(|| self.controller.state().categories().first().map(|c| c.id));
        self.controller
            .open_dialog(DialogRequest::CreateFeed { category });
    }

    pub fn edit_selected(&mut self) {
        let request = match self.selected_sidebar_item() {
            Some(SidebarItem::Feed(_)) => self.cursor_feed().cloned().map(DialogRequest::UpdateFeed),
            Some(SidebarItem::Category(_)) => {
                self.selected_category().cloned().map(DialogRequest::EditCategory)
            }
            None => None,
        };
        if let Some(request) = request {
            self.controller.open_dialog(request);
        }
    }

    pub fn delete_selected(&mut self) {
        let request = match self.selected_sidebar_item() {
            Some(SidebarItem::Feed(_)) => self.cursor_feed().cloned().map(DialogRequest::DeleteFeed),
            Some(SidebarItem::Category(_)) => self
                .selected_category()
                .cloned()
                .map(DialogRequest::DeleteCategory),
            None => None,
        };
        if let Some(request) = request {
            self.controller.open_dialog(request);
        }
    }

    pub fn edit_user(&mut self) {
        self.controller.open_dialog(DialogRequest::EditUser {
            name: self.user_name.clone(),
            email: self.user_email.clone(),
        });
    }

    /// Move the category under the cursor; only category rows move.
    pub fn move_selected(&mut self, direction: MoveDirection) {
        match self.selected_sidebar_item() {
            Some(SidebarItem::Category(id)) => self.controller.move_category(id, direction),
            _ => self.set_status("Select a category to move"),
        }
    }

    // ------------------------------------------------------------------------
    // Reader scroll
    // ------------------------------------------------------------------------

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(MAX_SCROLL);
    }

    /// Keep the scroll offset inside `content_lines` for the current viewport.
    pub fn clamp_scroll(&mut self, content_lines: usize) {
        let max_scroll = content_lines.saturating_sub(self.reader_visible_lines);
        self.scroll_offset = self.scroll_offset.min(max_scroll).min(MAX_SCROLL);
    }

    pub fn page_size(&self) -> usize {
        self.reader_visible_lines.saturating_sub(2).max(1)
    }

    // ------------------------------------------------------------------------
    // Status line
    // ------------------------------------------------------------------------

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Clear the status message once it is older than three seconds.
    /// Returns true if a message was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}

// ============================================================================
// Tests
// ============================================================================
