//! Sync controller.
//!
//! [`SyncController`] owns the [`ViewState`] and the [`Location`] and is the
//! only code that mutates them. Network calls run in spawned tasks that
//! report back through an `mpsc` channel as [`SyncEvent`]s; the owner feeds
//! each event to [`SyncController::handle_event`], so every mutation happens
//! on one logical thread.
//!
//! Entry-list requests (feed entries, search, load-more) are tagged with a
//! generation. Only responses of the latest generation are applied, so a slow
//! response for a feed the user already left cannot overwrite the newer list.
use crate::api::{
    ApiError, Backend, Category, CategoryId, Entry, EntryId, EntryPage, FeedId, MoveDirection,
};
use crate::dialogs::{Deleted, Dialog, DialogError, DialogRequest, Submission, SAVE_FAILED};
use crate::router::{Location, Route};
use crate::state::{StateChange, ViewState};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Default category poll period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Capacity of the result channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

pub const ENTRIES_FAILED: &str = "Error fetching entries.";
pub const SEARCH_FAILED: &str = "Error fetching search results.";
pub const MOVE_FAILED: &str = "Error moving category.";

/// Results of background work, applied by [`SyncController::handle_event`].
#[derive(Debug)]
pub enum SyncEvent {
    CategoriesLoaded {
        quiet: bool,
        result: Result<Vec<Category>, ApiError>,
    },
    /// The poll timer fired.
    PollTick,
    EntriesLoaded {
        feed: FeedId,
        generation: u64,
        result: Result<EntryPage, ApiError>,
    },
    SearchLoaded {
        phrase: String,
        generation: u64,
        result: Result<EntryPage, ApiError>,
    },
    PageLoaded {
        generation: u64,
        result: Result<EntryPage, ApiError>,
    },
    EntryDetail {
        id: EntryId,
        result: Result<Entry, ApiError>,
    },
    CategoryMoved {
        id: CategoryId,
        result: Result<(), ApiError>,
    },
    DialogSubmitted {
        /// Which opened dialog sent it.
        dialog: u64,
        submission: Submission,
        result: Result<(), ApiError>,
    },
}

pub struct SyncController<B: Backend> {
    backend: Arc<B>,
    state: ViewState,
    location: Location,
    events: mpsc::Sender<SyncEvent>,
    poll_interval: Duration,
    /// Single pending poll; re-arming aborts the previous one.
    poll_timer: Option<JoinHandle<()>>,
    /// Set by the first successful category load; inbound navigation is
    /// ignored until then.
    navigation_ready: bool,
    list_generation: u64,
    loading_more: bool,
    in_flight: usize,
    dialog: Option<Dialog>,
    /// Bumped on every `open_dialog`.
    dialog_seq: u64,
    notice: Option<&'static str>,
}

impl<B: Backend> SyncController<B> {
    /// Create a controller and the receiver its results arrive on.
    pub fn new(backend: Arc<B>, poll_interval: Duration) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (events, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let controller = Self {
            backend,
            state: ViewState::new(),
            location: Location::default(),
            events,
            poll_interval,
            poll_timer: None,
            navigation_ready: false,
            list_generation: 0,
            loading_more: false,
            in_flight: 0,
            dialog: None,
            dialog_seq: 0,
            notice: None,
        };
        (controller, rx)
    }

    /// Seed the location before the first load (e.g. from `--open`).
    pub fn with_location(mut self, path: &str) -> Self {
        self.location = Location::new(path);
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state.subscribe()
    }

    /// Requests spawned but not yet applied. Zero means settled.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn take_alert(&mut self) -> Option<String> {
        self.state.take_alert()
    }

    /// One-shot confirmation of a completed dialog.
    pub fn take_notice(&mut self) -> Option<&'static str> {
        self.notice.take()
    }

    fn spawn<F>(&mut self, task: &'static str, work: F)
    where
        F: Future<Output = SyncEvent> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.events.clone();
        tokio::spawn(async move {
            let event = work.await;
            if let Err(e) = tx.send(event).await {
                tracing::warn!(task, error = %e, "Failed to send result (receiver dropped)");
            }
        });
    }

    // ------------------------------------------------------------------------
    // Categories and polling
    // ------------------------------------------------------------------------

    /// Fetch the category snapshot. `quiet` loads do not raise the loading flag.
    pub fn load_categories(&mut self, quiet: bool) {
        if !quiet {
            self.state.set_loading(true);
        }
        tracing::debug!(quiet, "Loading categories");
        let backend = Arc::clone(&self.backend);
        self.spawn("load_categories", async move {
            SyncEvent::CategoriesLoaded {
                quiet,
                result: backend.list_categories().await,
            }
        });
    }

    /// Manual reload: hides the failure banner and reloads.
    pub fn refresh(&mut self) {
        self.state.clear_categories_failure();
        self.load_categories(false);
    }

    /// Arm the poll timer, replacing any pending tick.
    fn schedule_poll(&mut self) {
        if let Some(handle) = self.poll_timer.take() {
            handle.abort();
        }
        let tx = self.events.clone();
        let interval = self.poll_interval;
        self.poll_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            // Closed channel means the controller is gone.
            let _ = tx.send(SyncEvent::PollTick).await;
        }));
    }

    pub fn poll_pending(&self) -> bool {
        self.poll_timer
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn on_categories_loaded(&mut self, quiet: bool, result: Result<Vec<Category>, ApiError>) {
        self.state.set_loading(false);
        match result {
            Ok(categories) => {
                tracing::debug!(count = categories.len(), quiet, "Categories loaded");
                self.state.replace_categories(categories);
                if !self.navigation_ready {
                    self.navigation_ready = true;
                    tracing::info!(path = self.location.path(), "Restoring location");
                    self.on_location_change();
                }
            }
            Err(e) => {
                tracing::error!(error = %e, quiet, "Error loading categories");
                self.state.mark_categories_failed();
            }
        }
        self.schedule_poll();
    }

    // ------------------------------------------------------------------------
    // Selection and navigation
    // ------------------------------------------------------------------------

    /// Select a feed, point the location at its slug and fetch its entries.
    pub fn select_feed(&mut self, id: FeedId) {
        let Some(path) = self.state.find_feed(id).map(Route::feed_path) else {
            tracing::warn!(feed_id = id, "Cannot select unknown feed");
            return;
        };
        self.state.select_feed(id);
        self.location.set(&path);
        self.fetch_entries(id);
    }

    fn fetch_entries(&mut self, feed: FeedId) {
        self.list_generation += 1;
        let generation = self.list_generation;
        self.loading_more = false;
        self.state.set_loading(true);
        tracing::debug!(feed_id = feed, generation, "Fetching entries");

        let backend = Arc::clone(&self.backend);
        self.spawn("fetch_entries", async move {
            SyncEvent::EntriesLoaded {
                feed,
                generation,
                result: backend.list_entries(feed).await,
            }
        });
    }

    /// Inbound navigation to `path` (typed, `--open`, link).
    pub fn navigate(&mut self, path: &str) {
        if self.location.set(path) {
            self.on_location_change();
        }
    }

    /// Walk back through the location history.
    pub fn go_back(&mut self) -> bool {
        if self.location.back().is_none() {
            return false;
        }
        self.on_location_change();
        true
    }

    /// Bring the selection in line with the current location.
    fn on_location_change(&mut self) {
        if !self.navigation_ready {
            tracing::debug!(path = self.location.path(), "Categories not loaded; deferring navigation");
            return;
        }

        match self.location.route() {
            Route::Feed(id) => match self.state.find_feed(id).map(Route::feed_path) {
                Some(canonical) => {
                    self.state.select_feed(id);
                    self.location.replace(&canonical);
                    self.fetch_entries(id);
                }
                None => {
                    tracing::warn!(feed_id = id, "Location names an unknown feed");
                    self.invalidate_lists();
                    self.state.clear_selection();
                    self.location.replace("/");
                }
            },
            Route::Search(phrase) => self.run_search(phrase),
            Route::Home => {
                self.invalidate_lists();
                self.state.clear_selection();
            }
        }
    }

    /// Drop any in-flight list response. Its arrival would have cleared the
    /// loading flag, so clear it here.
    fn invalidate_lists(&mut self) {
        self.list_generation += 1;
        self.loading_more = false;
        self.state.set_loading(false);
    }

    fn on_entries_loaded(
        &mut self,
        feed: FeedId,
        generation: u64,
        result: Result<EntryPage, ApiError>,
    ) {
        if generation != self.list_generation {
            tracing::debug!(
                feed_id = feed,
                generation,
                current = self.list_generation,
                "Dropping stale entry list"
            );
            return;
        }
        self.state.set_loading(false);
        match result {
            Ok(page) => {
                tracing::debug!(feed_id = feed, count = page.objects.len(), "Entries loaded");
                self.state.replace_entries(page);
            }
            Err(e) => {
                tracing::error!(feed_id = feed, error = %e, "Error fetching entries");
                self.state.raise_alert(ENTRIES_FAILED);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Search for `phrase` by navigating to its search location.
    /// A blank phrase does nothing.
    pub fn do_search(&mut self, phrase: &str) {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return;
        }
        let path = Route::search_path(phrase);
        if self.location.set(&path) {
            self.on_location_change();
        } else if self.navigation_ready {
            // Same phrase again: re-run instead of ignoring the request.
            self.run_search(phrase.to_string());
        }
    }

    fn run_search(&mut self, phrase: String) {
        self.list_generation += 1;
        let generation = self.list_generation;
        self.loading_more = false;
        self.state.begin_search(&phrase);
        self.state.set_loading(true);
        tracing::debug!(phrase = %phrase, generation, "Running search");

        let backend = Arc::clone(&self.backend);
        self.spawn("search", async move {
            let result = backend.search_entries(&phrase).await;
            SyncEvent::SearchLoaded {
                phrase,
                generation,
                result,
            }
        });
    }

    fn on_search_loaded(
        &mut self,
        phrase: String,
        generation: u64,
        result: Result<EntryPage, ApiError>,
    ) {
        if generation != self.list_generation {
            tracing::debug!(phrase = %phrase, generation, "Dropping stale search results");
            return;
        }
        self.state.set_loading(false);
        match result {
            Ok(page) => {
                tracing::debug!(phrase = %phrase, count = page.objects.len(), "Search results");
                self.state.apply_search_results(page);
            }
            Err(e) => {
                tracing::error!(phrase = %phrase, error = %e, "Error fetching search results");
                self.state.raise_alert(SEARCH_FAILED);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------------

    /// Follow a `meta.next` cursor and append the page.
    pub fn load_more(&mut self, next_url: &str) {
        if self.loading_more {
            tracing::debug!(next_url, "Load more already in flight");
            return;
        }
        self.loading_more = true;
        let generation = self.list_generation;
        let next_url = next_url.to_string();
        let backend = Arc::clone(&self.backend);
        self.spawn("load_more", async move {
            SyncEvent::PageLoaded {
                generation,
                result: backend.fetch_page(&next_url).await,
            }
        });
    }

    /// [`load_more`](Self::load_more) with the current list's cursor.
    pub fn load_next_page(&mut self) -> bool {
        match self.state.next_page().map(str::to_string) {
            Some(next) => {
                self.load_more(&next);
                true
            }
            None => false,
        }
    }

    fn on_page_loaded(&mut self, generation: u64, result: Result<EntryPage, ApiError>) {
        if generation != self.list_generation {
            tracing::debug!(generation, "Dropping page for a replaced list");
            return;
        }
        self.loading_more = false;
        match result {
            Ok(page) => self.state.append_page(page),
            Err(e) => {
                tracing::error!(error = %e, "Error loading more entries");
                self.state.raise_alert(ENTRIES_FAILED);
            }
        }
    }

    /// Make an entry current (or clear with `None`).
    ///
    /// The read transition is applied locally right away; the detail fetch
    /// that marks it read server-side is fire-and-forget.
    pub fn set_current_entry(&mut self, id: Option<EntryId>) {
        self.state.set_current_entry(id);
        if let Some(id) = id.filter(|id| self.state.entry(*id).is_some()) {
            let backend = Arc::clone(&self.backend);
            self.spawn("fetch_entry", async move {
                SyncEvent::EntryDetail {
                    id,
                    result: backend.fetch_entry(id).await,
                }
            });
        }
    }

    /// Open the entry, or close it when it is already current.
    pub fn toggle_entry(&mut self, id: EntryId) {
        if self.state.current_entry_id() == Some(id) {
            self.set_current_entry(None);
        } else {
            self.set_current_entry(Some(id));
        }
    }

    // ------------------------------------------------------------------------
    // Category order
    // ------------------------------------------------------------------------

    /// Reorder on the server, then reload the full snapshot.
    pub fn move_category(&mut self, id: CategoryId, direction: MoveDirection) {
        let backend = Arc::clone(&self.backend);
        self.spawn("move_category", async move {
            SyncEvent::CategoryMoved {
                id,
                result: backend.move_category(id, direction).await,
            }
        });
    }

    // ------------------------------------------------------------------------
    // Dialogs
    // ------------------------------------------------------------------------

    pub fn open_dialog(&mut self, request: DialogRequest) {
        self.dialog_seq += 1;
        self.dialog = Some(Dialog::open(request));
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn dialog_mut(&mut self) -> Option<&mut Dialog> {
        self.dialog.as_mut()
    }

    /// Dismiss the open dialog without side effects.
    pub fn cancel_dialog(&mut self) {
        self.dialog = None;
    }

    /// Validate the open dialog and send its single API call.
    ///
    /// Validation errors are shown in the dialog and returned; no call is made.
    pub fn submit_dialog(&mut self) -> Result<(), DialogError> {
        let Some(dialog) = self.dialog.as_mut() else {
            return Ok(());
        };
        if dialog.is_pending() {
            return Ok(());
        }
        let submission = match dialog.submission() {
            Ok(submission) => submission,
            Err(e) => {
                dialog.set_error(e.to_string());
                return Err(e);
            }
        };
        dialog.set_pending();

        let dialog = self.dialog_seq;
        let backend = Arc::clone(&self.backend);
        self.spawn("dialog_submit", async move {
            let result = submission.execute(backend.as_ref()).await;
            SyncEvent::DialogSubmitted {
                dialog,
                submission,
                result,
            }
        });
        Ok(())
    }

    /// Apply a save result. The server-side change stands even if the user
    /// closed the dialog meanwhile; only the dialog that sent it is touched.
    fn on_dialog_submitted(
        &mut self,
        dialog: u64,
        submission: Submission,
        result: Result<(), ApiError>,
    ) {
        let same_dialog = dialog == self.dialog_seq && self.dialog.is_some();
        match result {
            Ok(()) => {
                tracing::info!(action = submission.describe(), "Dialog saved");
                if let Some(deleted) = submission.deleted() {
                    self.forget_deleted(deleted);
                }
                if same_dialog {
                    self.dialog = None;
                }
                self.notice = Some(submission.describe());
                self.load_categories(false);
            }
            Err(e) => {
                tracing::error!(action = submission.describe(), error = %e, "Dialog save failed");
                match self.dialog.as_mut() {
                    Some(open) if same_dialog => open.set_error(SAVE_FAILED),
                    _ => self.state.raise_alert(SAVE_FAILED),
                }
            }
        }
    }

    /// Clear the selection when it pointed into a deleted feed or category.
    fn forget_deleted(&mut self, deleted: Deleted) {
        let affected = match (deleted, self.state.selected_feed()) {
            (Deleted::Feed(id), _) => self.state.selected_feed_id() == Some(id),
            (Deleted::Category(id), Some(feed)) => feed.category_id == id,
            (Deleted::Category(_), None) => false,
        };
        if affected {
            tracing::debug!(?deleted, "Selected feed deleted; clearing selection");
            self.invalidate_lists();
            self.state.clear_selection();
            self.location.set("/");
        }
    }

    // ------------------------------------------------------------------------
    // Event dispatch
    // ------------------------------------------------------------------------

    pub fn handle_event(&mut self, event: SyncEvent) {
        if !matches!(event, SyncEvent::PollTick) {
            self.in_flight = self.in_flight.saturating_sub(1);
        }

        match event {
            SyncEvent::CategoriesLoaded { quiet, result } => {
                self.on_categories_loaded(quiet, result);
            }
            SyncEvent::PollTick => {
                self.poll_timer = None;
                self.load_categories(true);
            }
            SyncEvent::EntriesLoaded {
                feed,
                generation,
                result,
            } => self.on_entries_loaded(feed, generation, result),
            SyncEvent::SearchLoaded {
                phrase,
                generation,
                result,
            } => self.on_search_loaded(phrase, generation, result),
            SyncEvent::PageLoaded { generation, result } => self.on_page_loaded(generation, result),
            SyncEvent::EntryDetail { id, result } => match result {
                Ok(entry) => self.state.merge_entry(entry),
                Err(e) => tracing::warn!(entry_id = id, error = %e, "Entry detail fetch failed"),
            },
            SyncEvent::CategoryMoved { id, result } => match result {
                Ok(()) => self.load_categories(false),
                Err(e) => {
                    tracing::error!(category_id = id, error = %e, "Error moving category");
                    self.state.raise_alert(MOVE_FAILED);
                }
            },
            SyncEvent::DialogSubmitted {
                dialog,
                submission,
                result,
            } => {
                self.on_dialog_submitted(dialog, submission, result);
            }
        }
    }
}

impl<B: Backend> Drop for SyncController<B> {
    fn drop(&mut self) {
        if let Some(handle) = self.poll_timer.take() {
            handle.abort();
        }
    }
}
