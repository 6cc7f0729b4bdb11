//! View state store.
//!
//! [`ViewState`] is the single owned view/session object: the category
//! snapshot, the selected feed, the loaded entry page, the current entry and
//! the loading/error flags. Every mutation goes through a method that
//! publishes a [`StateChange`] so observers (the terminal UI, tests) never
//! need to diff the state themselves.
use crate::api::{Category, Entry, EntryId, EntryPage, Feed, FeedId, PageMeta};
use chrono::{NaiveDateTime, Utc};
use std::collections::HashSet;
use tokio::sync::broadcast;

/// Capacity of the change channel. Slow subscribers see `Lagged` and should
/// re-read the whole state.
const CHANGE_CAPACITY: usize = 64;

/// Published after each mutation of [`ViewState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Categories,
    Selection,
    Entries,
    CurrentEntry,
    Loading,
    Alert,
}

pub struct ViewState {
    categories: Vec<Category>,
    categories_loaded: bool,
    failed_load_categories: bool,
    /// Lookup key into `categories`; the snapshot owns the feed.
    selected_feed: Option<FeedId>,
    entries: EntryPage,
    current_entry: Option<EntryId>,
    search_phrase: Option<String>,
    search_mode: bool,
    loading: bool,
    alert: Option<String>,
    changes: broadcast::Sender<StateChange>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewState")
            .field("categories", &self.categories.len())
            .field("categories_loaded", &self.categories_loaded)
            .field("failed_load_categories", &self.failed_load_categories)
            .field("selected_feed", &self.selected_feed)
            .field("entries", &self.entries.objects.len())
            .field("current_entry", &self.current_entry)
            .field("search_mode", &self.search_mode)
            .field("loading", &self.loading)
            .finish()
    }
}

impl ViewState {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            categories: Vec::new(),
            categories_loaded: false,
            failed_load_categories: false,
            selected_feed: None,
            entries: EntryPage::default(),
            current_entry: None,
            search_phrase: None,
            search_mode: false,
            loading: false,
            alert: None,
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    fn notify(&self, change: StateChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn categories_loaded(&self) -> bool {
        self.categories_loaded
    }

    pub fn failed_load_categories(&self) -> bool {
        self.failed_load_categories
    }

    /// Replace the whole snapshot after a successful fetch.
    pub fn replace_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
        self.categories_loaded = true;
        self.failed_load_categories = false;
        self.notify(StateChange::Categories);
    }

    /// Record a failed fetch. The previous snapshot is kept.
    pub fn mark_categories_failed(&mut self) {
        self.failed_load_categories = true;
        self.notify(StateChange::Categories);
    }

    /// Hide the failure banner ahead of a manual reload.
    pub fn clear_categories_failure(&mut self) {
        if self.failed_load_categories {
            self.failed_load_categories = false;
            self.notify(StateChange::Categories);
        }
    }

    pub fn category(&self, id: i64) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Linear scan over every category's feeds.
    pub fn find_feed(&self, id: FeedId) -> Option<&Feed> {
        self.categories
            .iter()
            .flat_map(|c| c.feeds.iter())
            .find(|f| f.id == id)
    }

    fn find_feed_mut(&mut self, id: FeedId) -> Option<&mut Feed> {
        self.categories
            .iter_mut()
            .flat_map(|c| c.feeds.iter_mut())
            .find(|f| f.id == id)
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    pub fn selected_feed_id(&self) -> Option<FeedId> {
        self.selected_feed
    }

    /// The selected feed as it appears in the current snapshot.
    pub fn selected_feed(&self) -> Option<&Feed> {
        self.selected_feed.and_then(|id| self.find_feed(id))
    }

    /// Select a feed and drop everything loaded for the previous one.
    pub fn select_feed(&mut self, id: FeedId) {
        self.selected_feed = Some(id);
        self.entries = EntryPage::default();
        self.current_entry = None;
        self.search_mode = false;
        self.search_phrase = None;
        if let Some(feed) = self.find_feed_mut(id) {
            feed.new_entries = false;
        }
        self.notify(StateChange::Selection);
        self.notify(StateChange::Entries);
    }

    /// Clear the selected feed, its entries and the current entry.
    pub fn clear_selection(&mut self) {
        self.selected_feed = None;
        self.entries = EntryPage::default();
        self.current_entry = None;
        self.search_mode = false;
        self.search_phrase = None;
        self.notify(StateChange::Selection);
        self.notify(StateChange::Entries);
    }

    // ------------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------------

    pub fn entries(&self) -> &[Entry] {
        &self.entries.objects
    }

    pub fn page_meta(&self) -> &PageMeta {
        &self.entries.meta
    }

    pub fn next_page(&self) -> Option<&str> {
        self.entries.meta.next.as_deref()
    }

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.objects.iter().find(|e| e.id == id)
    }

    /// Install the first page of the selected feed.
    pub fn replace_entries(&mut self, page: EntryPage) {
        self.entries = page;
        self.current_entry = None;
        self.notify(StateChange::Entries);
    }

    /// Start a search: the phrase is recorded before results arrive.
    /// A search location has no feed: the selection and open entry go
    /// right away, whether or not the results arrive.
    pub fn begin_search(&mut self, phrase: &str) {
        self.search_phrase = Some(phrase.to_string());
        self.selected_feed = None;
        self.current_entry = None;
        self.notify(StateChange::Selection);
    }

    /// Search results replace the list and clear the feed selection.
    pub fn apply_search_results(&mut self, page: EntryPage) {
        self.entries = page;
        self.selected_feed = None;
        self.current_entry = None;
        self.search_mode = true;
        self.notify(StateChange::Selection);
        self.notify(StateChange::Entries);
    }

    /// Append a following page, keeping order and skipping ids already present.
    /// The page's metadata replaces the current one.
    pub fn append_page(&mut self, page: EntryPage) {
        let mut seen: HashSet<EntryId> = self.entries.objects.iter().map(|e| e.id).collect();
        let before = self.entries.objects.len();
        for entry in page.objects {
            if seen.insert(entry.id) {
                self.entries.objects.push(entry);
            }
        }
        tracing::debug!(
            appended = self.entries.objects.len() - before,
            next = ?page.meta.next,
            "Appended entry page"
        );
        self.entries.meta = page.meta;
        self.notify(StateChange::Entries);
    }

    pub fn search_phrase(&self) -> Option<&str> {
        self.search_phrase.as_deref()
    }

    pub fn search_mode(&self) -> bool {
        self.search_mode
    }

    // ------------------------------------------------------------------------
    // Current entry
    // ------------------------------------------------------------------------

    pub fn current_entry_id(&self) -> Option<EntryId> {
        self.current_entry
    }

    pub fn current_entry(&self) -> Option<&Entry> {
        self.current_entry.and_then(|id| self.entry(id))
    }

    /// Make `id` the current entry (or clear it with `None`).
    ///
    /// An unread entry is stamped read and its feed's unread counter drops by
    /// one, never below zero. Returns true when that transition happened.
    /// Ids not in the loaded list are ignored.
    pub fn set_current_entry(&mut self, id: Option<EntryId>) -> bool {
        self.set_current_entry_at(id, Utc::now().naive_utc())
    }

    fn set_current_entry_at(&mut self, id: Option<EntryId>, now: NaiveDateTime) -> bool {
        let Some(id) = id else {
            if self.current_entry.take().is_some() {
                self.notify(StateChange::CurrentEntry);
            }
            return false;
        };

        let selected = self.selected_feed;
        let Some(entry) = self.entries.objects.iter_mut().find(|e| e.id == id) else {
            tracing::debug!(entry_id = id, "Ignoring unknown entry");
            return false;
        };

        self.current_entry = Some(id);
        entry.new_entry = false;

        let mut owner = None;
        if entry.read_at.is_none() {
            entry.read_at = Some(now);
            owner = Some(if entry.feed_id != 0 {
                entry.feed_id
            } else {
                selected.unwrap_or_default()
            });
        }

        let transitioned = owner.is_some();
        if let Some(feed) = owner.and_then(|feed_id| self.find_feed_mut(feed_id)) {
            feed.unread = (feed.unread - 1).max(0);
            self.notify(StateChange::Categories);
        }
        self.notify(StateChange::CurrentEntry);
        transitioned
    }

    /// Collapse the entry if it is current, otherwise make it current.
    pub fn toggle_entry(&mut self, id: EntryId) -> bool {
        if self.current_entry == Some(id) {
            self.set_current_entry(None)
        } else {
            self.set_current_entry(Some(id))
        }
    }

    /// Merge a fetched entry detail into the list (server-side read stamp).
    pub fn merge_entry(&mut self, detail: Entry) {
        if let Some(entry) = self.entries.objects.iter_mut().find(|e| e.id == detail.id) {
            if entry.read_at.is_none() {
                entry.read_at = detail.read_at;
            }
            if detail.summary.is_some() {
                entry.summary = detail.summary;
            }
            self.notify(StateChange::Entries);
        }
    }

    // ------------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------------

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.notify(StateChange::Loading);
        }
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    /// Raise a one-shot user alert.
    pub fn raise_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
        self.notify(StateChange::Alert);
    }

    /// Consume the pending alert, if any.
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }
}
