//! Location routing.
//!
//! The location is the client's address bar: a path such as
//! `/10-example-feed` (a feed) or `/search=rust+news` (a search) plus a back
//! history. [`Route`] parses and renders those paths.
use crate::api::{Feed, FeedId};
use url::form_urlencoded;

const SEARCH_PREFIX: &str = "search=";

/// Title part of a slug: lowercased, each space replaced by `-`.
pub fn slugify(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

/// `{id}-{slugified title}`, e.g. `10-example-feed`.
pub fn feed_slug(feed: &Feed) -> String {
    format!("{}-{}", feed.id, slugify(&feed.feed_title))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Feed(FeedId),
    Search(String),
}

impl Route {
    /// Parse a location path. The leading `/` is optional.
    pub fn parse(path: &str) -> Self {
        let path = path.trim();
        let path = path.strip_prefix('/').unwrap_or(path);

        if let Some(raw) = path.strip_prefix(SEARCH_PREFIX) {
            let phrase: String = form_urlencoded::parse(format!("q={}", raw).as_bytes())
                .next()
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            let phrase = phrase.trim();
            if phrase.is_empty() {
                return Route::Home;
            }
            return Route::Search(phrase.to_string());
        }

        let digits_end = path
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(path.len());
        if digits_end > 0 && path[digits_end..].starts_with('-') {
            if let Ok(id) = path[..digits_end].parse::<FeedId>() {
                return Route::Feed(id);
            }
        }
        Route::Home
    }

    /// Path for a feed route, from the feed's current title.
    pub fn feed_path(feed: &Feed) -> String {
        format!("/{}", feed_slug(feed))
    }

    pub fn search_path(phrase: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(phrase.as_bytes()).collect();
        format!("/{}{}", SEARCH_PREFIX, encoded)
    }

    /// Render the route back to a path. A bare feed route has no title, so
    /// its slug ends at the `-`; [`Route::feed_path`] gives the full slug.
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Feed(id) => format!("/{}-", id),
            Route::Search(phrase) => Self::search_path(phrase),
        }
    }
}

/// Current location path plus back history.
#[derive(Debug, Clone)]
pub struct Location {
    path: String,
    history: Vec<String>,
}

impl Default for Location {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Location {
    pub fn new(path: &str) -> Self {
        Self {
            path: normalize(path),
            history: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn route(&self) -> Route {
        Route::parse(&self.path)
    }

    /// Move to `path`, pushing the current one onto the history.
    /// Returns false (and records nothing) when the path is unchanged.
    pub fn set(&mut self, path: &str) -> bool {
        let path = normalize(path);
        if path == self.path {
            return false;
        }
        let previous = std::mem::replace(&mut self.path, path);
        self.history.push(previous);
        true
    }

    /// Rewrite the current path without adding a history step.
    pub fn replace(&mut self, path: &str) {
        self.path = normalize(path);
    }

    /// Pop the history. Returns the restored path.
    pub fn back(&mut self) -> Option<&str> {
        let previous = self.history.pop()?;
        self.path = previous;
        Some(&self.path)
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }
}

fn normalize(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::feed;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_slug_of_example_feed() {
        assert_eq!(feed_slug(&feed(10, "Example Feed", 1, 0)), "10-example-feed");
        assert_eq!(Route::feed_path(&feed(10, "Example Feed", 1, 0)), "/10-example-feed");
    }

    #[test]
    fn test_slugify_only_replaces_spaces() {
        assert_eq!(slugify("Rust  Blog!"), "rust--blog!");
    }

    #[test]
    fn test_parse_feed_with_and_without_slash() {
        assert_eq!(Route::parse("/10-example-feed"), Route::Feed(10));
        assert_eq!(Route::parse("10-example-feed"), Route::Feed(10));
        // Slug text is not checked against the title.
        assert_eq!(Route::parse("/10-renamed"), Route::Feed(10));
        assert_eq!(Route::parse("/10-"), Route::Feed(10));
    }

    #[test]
    fn test_route_path_parses_back() {
        for route in [
            Route::Home,
            Route::Feed(42),
            Route::Search("rust & go".to_string()),
        ] {
            assert_eq!(Route::parse(&route.path()), route);
        }
    }

    #[test]
    fn test_parse_rejects_non_feed_paths() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/10"), Route::Home);
        assert_eq!(Route::parse("/abc-10"), Route::Home);
        assert_eq!(Route::parse("/-10"), Route::Home);
    }

    #[test]
    fn test_parse_search() {
        assert_eq!(
            Route::parse("/search=foo+bar"),
            Route::Search("foo bar".to_string())
        );
        assert_eq!(
            Route::parse("search=foo%20bar"),
            Route::Search("foo bar".to_string())
        );
        assert_eq!(Route::parse("/search="), Route::Home);
    }

    #[test]
    fn test_search_path_encodes() {
        assert_eq!(Route::search_path("foo bar"), "/search=foo+bar");
        assert_eq!(Route::search_path("a&b"), "/search=a%26b");
    }

    #[test]
    fn test_location_ignores_same_path() {
        let mut location = Location::default();
        assert!(location.set("/10-example-feed"));
        assert!(!location.set("10-example-feed"));
        assert_eq!(location.path(), "/10-example-feed");
        assert_eq!(location.back(), Some("/"));
        assert_eq!(location.back(), None);
    }

    #[test]
    fn test_location_replace_keeps_history() {
        let mut location = Location::default();
        location.set("/10-old-title");
        location.replace("/10-example-feed");
        assert_eq!(location.path(), "/10-example-feed");
        assert_eq!(location.back(), Some("/"));
        assert!(!location.can_go_back());
    }

    #[test]
    fn test_location_route() {
        let location = Location::new("search=rust");
        assert_eq!(location.route(), Route::Search("rust".to_string()));
    }

    proptest! {
        #[test]
        fn prop_feed_slug_round_trips_id(id in 1i64..1_000_000, title in "[A-Za-z0-9 ]{0,24}") {
            let path = Route::feed_path(&feed(id, &title, 1, 0));
            prop_assert_eq!(Route::parse(&path), Route::Feed(id));
        }

        #[test]
        fn prop_search_path_round_trips(phrase in "[a-z0-9&%+=/ ]{1,24}") {
            prop_assume!(!phrase.trim().is_empty());
            let path = Route::search_path(&phrase);
            prop_assert_eq!(Route::parse(&path), Route::Search(phrase.trim().to_string()));
        }
    }
}
