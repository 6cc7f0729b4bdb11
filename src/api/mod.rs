//! Client side of the webrss REST API.
//!
//! - [`types`] - wire types (`Category`, `Feed`, `Entry`, `EntryPage`, request bodies)
//! - [`client`] - [`HttpBackend`], the reqwest implementation of [`Backend`]
//!
//! The controller only depends on the [`Backend`] trait so tests can drive it
//! with an in-memory implementation.

mod client;
mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{ClientOptions, HttpBackend};
pub use types::{
    Category, CategoryForm, CategoryId, Entry, EntryId, EntryPage, Feed, FeedId, FeedUpdate,
    MoveDirection, NewFeed, PageMeta, UserForm,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Not logged in (session missing or expired)")]
    Unauthorized,
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Insecure base URL: HTTPS required to send credentials (set allow_insecure to override)")]
    InsecureBaseUrl,
    #[error("Login failed: {0}")]
    Login(String),
}

impl ApiError {
    /// Returns true if this error is transient and an idempotent request may be retried.
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout(_) | ApiError::Network(_) => true,
            ApiError::HttpStatus(status) => *status >= 500,
            ApiError::Unauthorized
            | ApiError::ResponseTooLarge(_)
            | ApiError::InvalidUtf8
            | ApiError::Decode(_)
            | ApiError::InvalidUrl(_)
            | ApiError::InsecureBaseUrl
            | ApiError::Login(_) => false,
        }
    }
}

// ============================================================================
// Backend Trait
// ============================================================================

/// Every call the client makes against the webrss server.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// `GET /api/category/`
    async fn list_categories(&self) -> Result<Vec<Category>, ApiError>;
    /// `POST /api/category/`
    async fn create_category(&self, form: &CategoryForm) -> Result<(), ApiError>;
    /// `POST /api/category/{id}/`
    async fn update_category(&self, id: CategoryId, form: &CategoryForm) -> Result<(), ApiError>;
    /// `DELETE /api/category/{id}/`
    async fn delete_category(&self, id: CategoryId) -> Result<(), ApiError>;
    /// `POST /api/category/{id}/move_up` or `move_down`
    async fn move_category(&self, id: CategoryId, direction: MoveDirection)
        -> Result<(), ApiError>;

    /// `POST /api/feed/`
    async fn create_feed(&self, form: &NewFeed) -> Result<(), ApiError>;
    /// `PUT /api/feed/{id}/`
    async fn update_feed(&self, id: FeedId, form: &FeedUpdate) -> Result<(), ApiError>;
    /// `DELETE /api/feed/{id}/`
    async fn delete_feed(&self, id: FeedId) -> Result<(), ApiError>;

    /// `GET /api/entry/?feed={id}`
    async fn list_entries(&self, feed: FeedId) -> Result<EntryPage, ApiError>;
    /// `GET /api/entry/search/?phrase={q}`
    async fn search_entries(&self, phrase: &str) -> Result<EntryPage, ApiError>;
    /// Follow a `meta.next` cursor verbatim.
    async fn fetch_page(&self, next_url: &str) -> Result<EntryPage, ApiError>;
    /// `GET /api/entry/{id}`; the server marks the entry read.
    async fn fetch_entry(&self, id: EntryId) -> Result<Entry, ApiError>;

    /// `POST /api/user/`
    async fn update_user(&self, form: &UserForm) -> Result<(), ApiError>;
}
