//! Utility functions for common operations.
//!
//! - **Text processing**: display width, truncation, control-character and
//!   HTML stripping for feed-supplied text
//! - **URL validation**: feed URLs typed into dialogs and entry links opened
//!   in the browser

mod text;
mod url_validator;

pub use text::{
    display_width, html_to_text, relative_time, strip_control_chars, truncate_to_width,
};
pub use url_validator::{validate_feed_url, validate_url_for_open, UrlValidationError};

/// Maximum length of a search phrase typed into the search bar.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;
