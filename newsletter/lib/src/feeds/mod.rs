//! Feed normalisation and release consolidation.
//!
//! This module turns syndication feeds into clean, consolidated release
//! records ready for summarisation.
//!
//! ## Pipeline
//!
//! ```text
//! fetch ──► normalize ──► filter ──► ReleaseEntry ──► reconcile
//!   (HTTP + Atom/RSS)  (HTML→text) (noise lines)        (release feeds only)
//! ```
//!
//! ## Module Structure
//!
//! - [`types`]: [`ReleaseEntry`](types::ReleaseEntry), [`FeedQuery`](types::FeedQuery), [`FetchError`](types::FetchError)
//! - [`normalize`]: HTML fragment to plain text
//! - [`filter`]: low-value line removal
//! - [`fetch`]: HTTP retrieval and Atom/RSS parsing
//! - [`reconcile`]: merging prefixed and pre-release entries into base releases
//! - [`markdown`]: release notes from raw Markdown changelogs

pub mod fetch;
pub mod filter;
pub mod markdown;
pub mod normalize;
pub mod reconcile;
pub mod types;

pub use fetch::{fetch_feed, parse_feed, parse_feed_in};
pub use filter::filter_low_value_lines;
pub use markdown::{fetch_markdown_release_notes, parse_markdown_release_notes};
pub use normalize::normalize_html;
pub use reconcile::consolidate_prereleases;
pub use types::{FeedQuery, FetchError, ReleaseEntry};
