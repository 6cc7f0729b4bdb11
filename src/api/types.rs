//! Wire types for the webrss JSON API.
//!
//! Field names follow the backend's JSON encoding (`feed_title`, `un_read`,
//! `read_at`, ...). Deserialization is lenient where the backend has changed
//! encodings over time: `new_entries` may be a bool or a 0/1 integer,
//! timestamps may be `"YYYY-MM-DD HH:MM"` or RFC 3339, and an empty `next`
//! string means there is no next page.
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

pub type CategoryId = i64;
pub type FeedId = i64;
pub type EntryId = i64;

// ============================================================================
// Resources
// ============================================================================

/// A named, user-ordered group of feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    #[serde(default)]
    pub feeds: Vec<Feed>,
}

/// A subscribed feed with its server-computed counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: FeedId,
    pub feed_title: String,
    #[serde(default)]
    pub feed_url: String,
    #[serde(default)]
    pub feed_image: Option<String>,
    #[serde(default)]
    pub feed_subtitle: Option<String>,
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub site_favicon_url: Option<String>,
    #[serde(default)]
    pub category_id: CategoryId,
    /// Unread entry count.
    #[serde(default, rename = "un_read")]
    pub unread: i64,
    #[serde(default, deserialize_with = "bool_or_int")]
    pub new_entries: bool,
}

/// One item of a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    #[serde(default)]
    pub feed_id: FeedId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    /// HTML body; must be sanitized before display.
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, with = "timestamp")]
    pub published_at: Option<NaiveDateTime>,
    #[serde(default, with = "timestamp")]
    pub read_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "bool_or_int")]
    pub new_entry: bool,
}

impl Entry {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Pagination metadata of a listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub next: Option<String>,
}

/// A page of entries: `{objects: [...], meta: {next: ...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryPage {
    #[serde(default)]
    pub objects: Vec<Entry>,
    #[serde(default)]
    pub meta: PageMeta,
}

/// `GET /api/category/` envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CategoryList {
    #[serde(default)]
    pub objects: Vec<Category>,
}

// ============================================================================
// Request Bodies
// ============================================================================

/// Body of category create/update. Only the title is ever sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryForm {
    pub title: String,
}

/// Body of feed creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFeed {
    pub feed_url: String,
    pub category: CategoryId,
}

/// Body of feed update: the feed without its derived counters, with the
/// category flattened to its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedUpdate {
    pub id: FeedId,
    pub feed_title: String,
    pub feed_url: String,
    pub feed_image: Option<String>,
    pub feed_subtitle: Option<String>,
    pub site_url: Option<String>,
    pub site_favicon_url: Option<String>,
    pub category: CategoryId,
}

impl FeedUpdate {
    pub fn from_feed(feed: &Feed) -> Self {
        Self {
            id: feed.id,
            feed_title: feed.feed_title.clone(),
            feed_url: feed.feed_url.clone(),
            feed_image: feed.feed_image.clone(),
            feed_subtitle: feed.feed_subtitle.clone(),
            site_url: feed.site_url.clone(),
            site_favicon_url: feed.site_favicon_url.clone(),
            category: feed.category_id,
        }
    }
}

/// Account settings form (`POST /api/user/`, form encoded).
///
/// An empty password leaves the stored password unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Direction of a category reorder command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl MoveDirection {
    pub fn path_segment(self) -> &'static str {
        match self {
            MoveDirection::Up => "move_up",
            MoveDirection::Down => "move_down",
        }
    }
}

// ============================================================================
// Lenient Decoders
// ============================================================================

fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Null(()),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
        Flag::Null(()) => false,
    })
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

/// Backend timestamps: `"2006-01-02 15:04"` with RFC 3339 as fallback.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M";

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, FORMAT) {
            return Ok(Some(dt));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return Ok(Some(dt));
        }
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| Some(dt.naive_utc()))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_category_list_decodes_nested_feeds() {
        let json = r#"{"objects":[{"id":1,"title":"Tech","feeds":[
            {"id":10,"feed_title":"Example Feed","feed_url":"https://example.com/rss",
             "feed_image":null,"category_id":1,"un_read":3,"new_entries":1}
        ]}]}"#;
        let list: CategoryList = serde_json::from_str(json).unwrap();
        assert_eq!(list.objects.len(), 1);
        let feed = &list.objects[0].feeds[0];
        assert_eq!(feed.id, 10);
        assert_eq!(feed.unread, 3);
        assert!(feed.new_entries);
        assert_eq!(feed.feed_image, None);
    }

    #[test]
    fn test_new_entries_accepts_bool_and_zero() {
        let feed: Feed =
            serde_json::from_str(r#"{"id":1,"feed_title":"a","new_entries":false}"#).unwrap();
        assert!(!feed.new_entries);
        let feed: Feed =
            serde_json::from_str(r#"{"id":1,"feed_title":"a","new_entries":0}"#).unwrap();
        assert!(!feed.new_entries);
    }

    #[test]
    fn test_entry_timestamps_backend_format() {
        let entry: Entry = serde_json::from_str(
            r#"{"id":5,"feed_id":10,"title":"Hello","published_at":"2024-03-01 12:30","read_at":null}"#,
        )
        .unwrap();
        assert!(!entry.is_read());
        let published = entry.published_at.unwrap();
        assert_eq!(published.format("%Y-%m-%d %H:%M").to_string(), "2024-03-01 12:30");
    }

    #[test]
    fn test_entry_timestamps_rfc3339() {
        let entry: Entry =
            serde_json::from_str(r#"{"id":5,"read_at":"2024-03-01T12:30:00Z"}"#).unwrap();
        assert!(entry.is_read());
    }

    #[test]
    fn test_page_meta_empty_next_is_none() {
        let page: EntryPage = serde_json::from_str(r#"{"objects":[],"meta":{"next":""}}"#).unwrap();
        assert_eq!(page.meta.next, None);
        let page: EntryPage =
            serde_json::from_str(r#"{"objects":[],"meta":{"next":"/api/entry/?feed=1&page=2"}}"#)
                .unwrap();
        assert_eq!(page.meta.next.as_deref(), Some("/api/entry/?feed=1&page=2"));
    }

    #[test]
    fn test_feed_update_strips_derived_fields() {
        let feed = Feed {
            id: 10,
            feed_title: "Example".to_string(),
            feed_url: "https://example.com/rss".to_string(),
            feed_image: None,
            feed_subtitle: None,
            site_url: Some("https://example.com".to_string()),
            site_favicon_url: None,
            category_id: 2,
            unread: 7,
            new_entries: true,
        };
        let body = serde_json::to_value(FeedUpdate::from_feed(&feed)).unwrap();
        assert_eq!(body["category"], 2);
        assert!(body.get("un_read").is_none());
        assert!(body.get("new_entries").is_none());
        assert!(body.get("category_id").is_none());
    }
}
