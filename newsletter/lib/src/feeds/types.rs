//! Core types for feed entries and fetch options.
//!
//! [`ReleaseEntry`] is the unit record that flows from the fetcher into the
//! reconciler and, after summarisation, into the rendered document.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for feed fetching.
///
/// Both variants wrap the underlying error rather than flattening it to a
/// string, so callers can still inspect timeouts or status codes.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network failure, timeout, or non-success HTTP status
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The body was not a recognisable Atom or RSS document
    #[error("Failed to parse feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// A single release, changelog item, or blog post taken from a feed.
///
/// Entries are plain values. The reconciler never mutates an input entry; it
/// clones and extends into a fresh collection instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    /// Raw title or tag text, e.g. `go/v0.1.26-preview.0: Add E2E tests`
    pub version: String,
    /// Calendar date the entry was published (time of day is dropped)
    pub published_at: NaiveDate,
    /// Normalised and filtered body text; may be empty
    pub plain_text: String,
    /// Canonical link to the entry; empty when the feed provides none
    pub url: String,
}

impl ReleaseEntry {
    /// Creates a new entry without a link.
    ///
    /// ## Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use newsletter_lib::feeds::types::ReleaseEntry;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    /// let entry = ReleaseEntry::new("v1.0.0", date, "Initial release");
    /// assert_eq!(entry.version, "v1.0.0");
    /// assert!(entry.url.is_empty());
    /// ```
    pub fn new(
        version: impl Into<String>,
        published_at: NaiveDate,
        plain_text: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            published_at,
            plain_text: plain_text.into(),
            url: String::new(),
        }
    }

    /// Returns the entry with its link set.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Options controlling which feed items are kept and how their text is shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    /// First day of the window (inclusive)
    pub start: NaiveDate,
    /// Last day of the window (inclusive)
    pub end: NaiveDate,
    /// When non-empty, an item must carry a category containing one of these
    pub category_keywords: Vec<String>,
    /// Use the short summary field instead of the full content body
    pub prefer_short_summary: bool,
    /// Truncate text longer than this many characters; `0` disables truncation
    pub max_content_chars: usize,
}

impl FeedQuery {
    /// Creates a query for the inclusive window `[start, end]` with default options.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            category_keywords: vec![],
            prefer_short_summary: false,
            max_content_chars: 0,
        }
    }

    /// Restricts results to items whose categories contain one of `keywords`.
    #[must_use]
    pub fn with_categories<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Selects the short summary field rather than the full content.
    #[must_use]
    pub fn with_short_summary(mut self, prefer: bool) -> Self {
        self.prefer_short_summary = prefer;
        self
    }

    /// Sets the truncation limit (`0` disables truncation).
    #[must_use]
    pub fn with_max_content_chars(mut self, max: usize) -> Self {
        self.max_content_chars = max;
        self
    }

    /// Returns true when `date` falls inside the inclusive window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Marker appended to text cut short by [`FeedQuery::max_content_chars`].
pub const TRUNCATION_MARKER: &str = "...";

/// Truncates `text` to `max_chars` characters, trimming trailing whitespace and
/// appending [`TRUNCATION_MARKER`]. A limit of `0` leaves the text untouched.
///
/// ## Examples
///
/// ```
/// use newsletter_lib::feeds::types::truncate_content;
///
/// assert_eq!(truncate_content("hello world", 6), "hello...");
/// assert_eq!(truncate_content("short", 10), "short");
/// assert_eq!(truncate_content("anything", 0), "anything");
/// ```
pub fn truncate_content(text: &str, max_chars: usize) -> String {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    format!("{}{}", cut.trim_end(), TRUNCATION_MARKER)
}
