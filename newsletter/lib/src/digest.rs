//! Digest orchestration.
//!
//! [`build_digest`] fans out one fetch per configured source, waits for all of
//! them, consolidates release sources per product, and summarises every entry
//! through the [`SummaryCache`].
//!
//! A failing source never aborts the run. It is logged, recorded in
//! [`Digest::failed_sources`], and the remaining sources carry on.

use crate::NewsletterError;
use crate::cache::SummaryCache;
use crate::config::{NewsletterConfig, SourceConfig, SourceKind};
use crate::feeds::types::{FetchError, ReleaseEntry};
use crate::feeds::{consolidate_prereleases, fetch_feed, fetch_markdown_release_notes};
use crate::summarize::Summarizer;
use chrono::{Days, NaiveDate};
use futures::future::join_all;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Inclusive calendar-date window a digest covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DigestWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days` calendar days ending at `end`, inclusive. Zero is treated as one.
    ///
    /// ## Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use newsletter_lib::DigestWindow;
    ///
    /// let end = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
    /// let window = DigestWindow::last_days(end, 7);
    /// assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
    /// assert_eq!(window.end, end);
    /// ```
    pub fn last_days(end: NaiveDate, days: u32) -> Self {
        let back = u64::from(days.max(1) - 1);
        let start = end.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }
}

/// A fetched entry together with its summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestItem {
    /// Name of the source the entry came from
    pub source: String,
    pub entry: ReleaseEntry,
    /// Empty when the entry has no text
    pub summary: String,
}

/// Consolidated releases of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReleases {
    pub product: String,
    pub releases: Vec<DigestItem>,
}

/// A source that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedSource {
    pub name: String,
    pub url: String,
    pub error: String,
}

/// Everything a rendered newsletter needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub title: String,
    pub window: DigestWindow,
    /// Release and Markdown release-note sources, grouped by product in config order
    pub products: Vec<ProductReleases>,
    pub changelog: Vec<DigestItem>,
    pub blog: Vec<DigestItem>,
    pub failed_sources: Vec<FailedSource>,
}

impl Digest {
    /// True when no source produced an entry.
    pub fn is_empty(&self) -> bool {
        self.products.iter().all(|p| p.releases.is_empty())
            && self.changelog.is_empty()
            && self.blog.is_empty()
    }
}

/// Builds a digest for `window` from every source in `config`.
///
/// ## Errors
///
/// - `NewsletterError::InvalidWindow` if `window.start` is after `window.end`
/// - `NewsletterError::AllSourcesFailed` if not a single source could be fetched
///
/// Individual source failures, summariser failures, and cache write failures
/// are logged and do not fail the run. An entry whose summary could not be
/// produced keeps its cleaned text as the summary.
#[instrument(skip_all, fields(start = %window.start, end = %window.end, sources = config.sources.len(), summarizer = summarizer.name()))]
pub async fn build_digest<S: Summarizer>(
    client: &HttpClient,
    config: &NewsletterConfig,
    window: DigestWindow,
    summarizer: &S,
    cache: &SummaryCache,
) -> Result<Digest, NewsletterError> {
    if window.start > window.end {
        return Err(NewsletterError::InvalidWindow {
            start: window.start,
            end: window.end,
        });
    }

    let fetches = config
        .sources
        .iter()
        .map(|source| async move { (source, fetch_source(client, source, window).await) });
    let results = join_all(fetches).await;

    let mut failed_sources = Vec::new();
    let mut products: Vec<(String, Vec<ReleaseEntry>, Vec<String>)> = Vec::new();
    let mut changelog = Vec::new();
    let mut blog = Vec::new();

    for (source, result) in results {
        let entries = match result {
            Ok(entries) => entries,
            Err(e) => {
                warn!(source = %source.name, url = %source.url, error = %e, "Source failed, continuing without it");
                failed_sources.push(FailedSource {
                    name: source.name.clone(),
                    url: source.url.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        debug!(source = %source.name, entries = entries.len(), "Source fetched");

        match source.kind {
            SourceKind::Release | SourceKind::MarkdownReleaseNotes => {
                let product = source.product();
                match products.iter_mut().find(|(name, _, _)| name.as_str() == product) {
                    Some((_, combined, names)) => {
                        combined.extend(entries);
                        names.push(source.name.clone());
                    }
                    None => products.push((
                        product.to_string(),
                        entries,
                        vec![source.name.clone()],
                    )),
                }
            }
            SourceKind::Changelog => {
                changelog.extend(entries.into_iter().map(|e| (source.name.clone(), e)));
            }
            SourceKind::Blog => {
                blog.extend(entries.into_iter().map(|e| (source.name.clone(), e)));
            }
        }
    }

    if !config.sources.is_empty() && failed_sources.len() == config.sources.len() {
        return Err(NewsletterError::AllSourcesFailed(failed_sources.len()));
    }

    let mut product_releases = Vec::with_capacity(products.len());
    for (product, mut combined, names) in products {
        combined.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        let consolidated = consolidate_prereleases(&combined);
        debug!(%product, before = combined.len(), after = consolidated.len(), "Consolidated releases");

        let source_label = names.join(", ");
        let items = consolidated
            .into_iter()
            .map(|entry| (source_label.clone(), entry))
            .collect();
        product_releases.push(ProductReleases {
            product,
            releases: summarize_items(items, summarizer, cache).await,
        });
    }

    let digest = Digest {
        title: config.title.clone(),
        window,
        products: product_releases,
        changelog: summarize_items(changelog, summarizer, cache).await,
        blog: summarize_items(blog, summarizer, cache).await,
        failed_sources,
    };

    info!(
        products = digest.products.len(),
        changelog = digest.changelog.len(),
        blog = digest.blog.len(),
        failed = digest.failed_sources.len(),
        "Digest built"
    );

    Ok(digest)
}

async fn fetch_source(
    client: &HttpClient,
    source: &SourceConfig,
    window: DigestWindow,
) -> Result<Vec<ReleaseEntry>, FetchError> {
    let query = source.query(window.start, window.end);
    match source.kind {
        SourceKind::MarkdownReleaseNotes => {
            fetch_markdown_release_notes(client, &source.url, &query).await
        }
        SourceKind::Release | SourceKind::Changelog | SourceKind::Blog => {
            fetch_feed(client, &source.url, &query).await
        }
    }
}

async fn summarize_items<S: Summarizer>(
    items: Vec<(String, ReleaseEntry)>,
    summarizer: &S,
    cache: &SummaryCache,
) -> Vec<DigestItem> {
    let summaries = join_all(
        items
            .iter()
            .map(|(_, entry)| summarize_entry(entry, summarizer, cache)),
    )
    .await;

    items
        .into_iter()
        .zip(summaries)
        .map(|((source, entry), summary)| DigestItem {
            source,
            entry,
            summary,
        })
        .collect()
}

async fn summarize_entry<S: Summarizer>(
    entry: &ReleaseEntry,
    summarizer: &S,
    cache: &SummaryCache,
) -> String {
    if entry.plain_text.trim().is_empty() {
        return String::new();
    }

    let result = cache
        .get_or_compute(&entry.plain_text, |text| async move {
            summarizer.summarize(&text).await
        })
        .await;

    match result {
        Ok(summary) => summary,
        Err(e) => {
            warn!(version = %entry.version, summarizer = summarizer.name(), error = %e, "Summary unavailable, using cleaned text");
            entry.plain_text.clone()
        }
    }
}
