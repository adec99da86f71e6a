//! Newsletter Library - release digests from product feeds
//!
//! Polls release, changelog, and blog feeds, cleans their HTML bodies into
//! plain text, drops low-value lines, folds pre-release and per-language
//! entries into their base releases, and renders the result as Markdown.
//!
//! ## Flow
//!
//! 1. [`config::NewsletterConfig`] lists the sources to poll
//! 2. [`feeds`] fetches and normalises each source concurrently
//! 3. [`feeds::reconcile`] consolidates release sources per product
//! 4. [`summarize::Summarizer`] summarises each entry, memoised by [`cache::SummaryCache`]
//! 5. [`render::render_markdown`] produces the final document

pub mod cache;
pub mod config;
pub mod digest;
pub mod feeds;
pub mod render;
pub mod summarize;

pub use config::{NewsletterConfig, SourceConfig, SourceKind};
pub use digest::{Digest, DigestWindow, build_digest};
pub use render::render_markdown;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by digest generation.
#[derive(Error, Debug)]
pub enum NewsletterError {
    #[error(transparent)]
    Fetch(#[from] feeds::FetchError),

    #[error(transparent)]
    Cache(#[from] cache::CacheError),

    #[error(transparent)]
    Summarize(#[from] summarize::SummarizeError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("Invalid date window: {start} is after {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("All {0} sources failed")]
    AllSourcesFailed(usize),
}
