//! Syndication feed fetching.
//!
//! Retrieves an Atom or RSS 2.0 feed over HTTP and turns each item inside the
//! requested date window into a [`ReleaseEntry`] whose body has been through
//! [`normalize_html`] and [`filter_low_value_lines`].
//!
//! ## Examples
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use newsletter_lib::feeds::fetch::fetch_feed;
//! use newsletter_lib::feeds::types::FeedQuery;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = reqwest::Client::new();
//! let query = FeedQuery::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
//! );
//! let releases = fetch_feed(&client, "https://github.com/cli/cli/releases.atom", &query).await?;
//! for release in releases {
//!     println!("{} ({})", release.version, release.published_at);
//! }
//! # Ok(())
//! # }
//! ```

use super::filter::filter_low_value_lines;
use super::normalize::normalize_html;
use super::types::{FeedQuery, FetchError, ReleaseEntry, truncate_content};
use chrono::{Local, NaiveDate, TimeZone};
use feed_rs::model::{Category, Entry, Link};
use reqwest::Client as HttpClient;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// User agent sent with every feed request.
pub const USER_AGENT: &str = concat!("newsletter-lib/", env!("CARGO_PKG_VERSION"));

/// HTTP timeout for a single feed request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch a feed and return the entries inside the query window, newest first.
///
/// ## Errors
///
/// - `FetchError::Http` - network failure, timeout, or non-success status
/// - `FetchError::Parse` - the body is not a valid Atom/RSS document
#[instrument(skip(client, query), fields(start = %query.start, end = %query.end))]
pub async fn fetch_feed(
    client: &HttpClient,
    url: &str,
    query: &FeedQuery,
) -> Result<Vec<ReleaseEntry>, FetchError> {
    let body = client
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    parse_feed(&body, query)
}

/// Parse a feed document and return the entries inside the query window, newest first.
///
/// This is the network-free half of [`fetch_feed`].
///
/// ## Errors
///
/// Returns `FetchError::Parse` if the document is neither Atom nor RSS.
///
/// ## Examples
///
/// ```
/// use chrono::NaiveDate;
/// use newsletter_lib::feeds::fetch::parse_feed;
/// use newsletter_lib::feeds::types::FeedQuery;
///
/// let rss = r#"<?xml version="1.0"?>
/// <rss version="2.0"><channel><title>Blog</title>
///   <item>
///     <title>Hello</title>
///     <link>https://example.com/hello</link>
///     <pubDate>Mon, 15 Jan 2024 12:00:00 GMT</pubDate>
///     <description>&lt;p&gt;First post&lt;/p&gt;</description>
///   </item>
/// </channel></rss>"#;
///
/// let query = FeedQuery::new(
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
/// );
/// let entries = parse_feed(rss.as_bytes(), &query).unwrap();
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].plain_text, "First post");
/// ```
pub fn parse_feed(body: &[u8], query: &FeedQuery) -> Result<Vec<ReleaseEntry>, FetchError> {
    parse_feed_in(body, query, &Local)
}

/// [`parse_feed`] with publish timestamps converted to calendar dates in `tz`.
///
/// ## Errors
///
/// Returns `FetchError::Parse` if the document is neither Atom nor RSS.
pub fn parse_feed_in<Tz: TimeZone>(
    body: &[u8],
    query: &FeedQuery,
    tz: &Tz,
) -> Result<Vec<ReleaseEntry>, FetchError> {
    let feed = feed_rs::parser::parse(body)?;
    let total = feed.entries.len();

    let mut entries: Vec<ReleaseEntry> = feed
        .entries
        .into_iter()
        .filter_map(|entry| to_release_entry(entry, query, tz))
        .collect();

    entries.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    info!(kept = entries.len(), total, "Parsed feed");
    Ok(entries)
}

fn to_release_entry<Tz: TimeZone>(entry: Entry, query: &FeedQuery, tz: &Tz) -> Option<ReleaseEntry> {
    let version = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default();

    let Some(published_at) = publish_date_in(&entry, tz) else {
        debug!(title = %version, "Skipping item without a date");
        return None;
    };

    if !query.contains(published_at) {
        debug!(title = %version, %published_at, "Skipping item outside window");
        return None;
    }

    if !query.category_keywords.is_empty()
        && !matches_categories(&entry.categories, &query.category_keywords)
    {
        debug!(title = %version, "Skipping item without a matching category");
        return None;
    }

    let raw = select_content(&entry, query.prefer_short_summary);
    let text = filter_low_value_lines(&normalize_html(&raw));
    let plain_text = truncate_content(&text, query.max_content_chars);

    Some(ReleaseEntry {
        version,
        published_at,
        plain_text,
        url: select_link(&entry.links),
    })
}

/// RSS publish time first, Atom update time second; converted to a calendar date in `tz`.
fn publish_date_in<Tz: TimeZone>(entry: &Entry, tz: &Tz) -> Option<NaiveDate> {
    entry
        .published
        .or(entry.updated)
        .map(|timestamp| timestamp.with_timezone(tz).date_naive())
}

/// True when any category term or label contains one of `keywords` (case-insensitive).
fn matches_categories(categories: &[Category], keywords: &[String]) -> bool {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    categories
        .iter()
        .flat_map(|category| std::iter::once(category.term.as_str()).chain(category.label.as_deref()))
        .map(str::to_lowercase)
        .any(|label| keywords.iter().any(|keyword| label.contains(keyword.as_str())))
}

/// Short summary when preferred, otherwise the full body (Atom `<content>` or
/// RSS `content:encoded`) with the summary as fallback.
fn select_content(entry: &Entry, prefer_short_summary: bool) -> String {
    let summary = entry.summary.as_ref().map(|s| s.content.clone());

    if prefer_short_summary {
        return summary.unwrap_or_default();
    }

    entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .or(summary)
        .unwrap_or_default()
}

/// The `alternate` link, else the first link, else an empty string.
///
/// A link without `rel` counts as `alternate`, as Atom defines.
fn select_link(links: &[Link]) -> String {
    links
        .iter()
        .find(|link| {
            link.rel
                .as_deref()
                .is_none_or(|rel| rel.eq_ignore_ascii_case("alternate"))
        })
        .or_else(|| links.first())
        .map(|link| link.href.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn january() -> FeedQuery {
        FeedQuery::new(date(2024, 1, 1), date(2024, 1, 31))
    }

    const ATOM_RELEASES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>tag:github.com,2008:https://github.com/acme/cli/releases</id>
  <title>Release notes from cli</title>
  <updated>2024-01-20T12:00:00Z</updated>
  <entry>
    <id>tag:github.com,2008:Repository/1/v0.1.25</id>
    <updated>2024-01-15T12:00:00Z</updated>
    <link rel="alternate" type="text/html" href="https://github.com/acme/cli/releases/tag/v0.1.25"/>
    <title>v0.1.25</title>
    <content type="html">&lt;h2&gt;What's Changed&lt;/h2&gt;&lt;ul&gt;&lt;li&gt;Add offline mode by @alice in #12&lt;/li&gt;&lt;li&gt;chore: bump serde&lt;/li&gt;&lt;/ul&gt;</content>
  </entry>
  <entry>
    <id>tag:github.com,2008:Repository/1/v0.1.24</id>
    <updated>2024-01-08T12:00:00Z</updated>
    <link rel="alternate" type="text/html" href="https://github.com/acme/cli/releases/tag/v0.1.24"/>
    <title>v0.1.24</title>
    <content type="html">&lt;p&gt;Support proxies&lt;/p&gt;</content>
  </entry>
  <entry>
    <id>tag:github.com,2008:Repository/1/v0.1.20</id>
    <updated>2023-12-01T12:00:00Z</updated>
    <link rel="alternate" type="text/html" href="https://github.com/acme/cli/releases/tag/v0.1.20"/>
    <title>v0.1.20</title>
    <content type="html">&lt;p&gt;Old&lt;/p&gt;</content>
  </entry>
</feed>"#;

    const RSS_CHANGELOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Changelog</title>
    <link>https://example.com/changelog</link>
    <description>Product changelog</description>
    <item>
      <title>Agents in the terminal</title>
      <link>https://example.com/changelog/agents</link>
      <pubDate>Wed, 10 Jan 2024 12:00:00 GMT</pubDate>
      <category>Copilot</category>
      <category>Improvement</category>
      <description>&lt;p&gt;Short teaser&lt;/p&gt;</description>
      <content:encoded><![CDATA[<p>Full body with <strong>details</strong></p>]]></content:encoded>
    </item>
    <item>
      <title>Billing page refresh</title>
      <link>https://example.com/changelog/billing</link>
      <pubDate>Thu, 11 Jan 2024 12:00:00 GMT</pubDate>
      <category>Account management</category>
      <description>&lt;p&gt;New billing page&lt;/p&gt;</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_atom_filters_window_and_sorts() {
        let entries = parse_feed_in(ATOM_RELEASES.as_bytes(), &january(), &Utc).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].version, "v0.1.25");
        assert_eq!(entries[0].published_at, date(2024, 1, 15));
        assert_eq!(entries[0].plain_text, "### What's Changed\n\n- Add offline mode");
        assert_eq!(
            entries[0].url,
            "https://github.com/acme/cli/releases/tag/v0.1.25"
        );
        assert_eq!(entries[1].version, "v0.1.24");
        assert_eq!(entries[1].plain_text, "Support proxies");
    }

    #[test]
    fn test_parse_rss_prefers_full_content() {
        let entries = parse_feed_in(RSS_CHANGELOG.as_bytes(), &january(), &Utc).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].version, "Billing page refresh");
        assert_eq!(entries[1].plain_text, "Full body with details");
        assert_eq!(entries[1].url, "https://example.com/changelog/agents");
    }

    #[test]
    fn test_parse_rss_short_summary() {
        let query = january().with_short_summary(true);
        let entries = parse_feed_in(RSS_CHANGELOG.as_bytes(), &query, &Utc).unwrap();

        let agents = entries
            .iter()
            .find(|e| e.version == "Agents in the terminal")
            .unwrap();
        assert_eq!(agents.plain_text, "Short teaser");
    }

    #[test]
    fn test_parse_rss_category_filter_is_substring_and_case_insensitive() {
        let query = january().with_categories(["copilot"]);
        let entries = parse_feed_in(RSS_CHANGELOG.as_bytes(), &query, &Utc).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version, "Agents in the terminal");

        let query = january().with_categories(["ACCOUNT"]);
        let entries = parse_feed_in(RSS_CHANGELOG.as_bytes(), &query, &Utc).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version, "Billing page refresh");

        let query = january().with_categories(["security"]);
        assert!(parse_feed_in(RSS_CHANGELOG.as_bytes(), &query, &Utc).unwrap().is_empty());
    }

    #[test]
    fn test_parse_truncates_long_content() {
        let query = january().with_max_content_chars(9);
        let entries = parse_feed_in(RSS_CHANGELOG.as_bytes(), &query, &Utc).unwrap();
        let agents = entries
            .iter()
            .find(|e| e.version == "Agents in the terminal")
            .unwrap();
        assert_eq!(agents.plain_text, "Full body...");
    }

    #[test]
    fn test_parse_window_is_inclusive() {
        let query = FeedQuery::new(date(2024, 1, 8), date(2024, 1, 8));
        let entries = parse_feed_in(ATOM_RELEASES.as_bytes(), &query, &Utc).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version, "v0.1.24");
    }

    #[test]
    fn test_parse_invalid_document() {
        let result = parse_feed(b"this is not xml", &january());
        assert!(matches!(result.unwrap_err(), FetchError::Parse(_)));
    }

    #[test]
    fn test_link_prefers_alternate_then_first() {
        let atom = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>urn:feed</id>
  <title>Links</title>
  <updated>2024-01-20T12:00:00Z</updated>
  <entry>
    <id>urn:one</id>
    <title>one</title>
    <updated>2024-01-10T12:00:00Z</updated>
    <link rel="related" href="https://example.com/related"/>
    <link rel="alternate" href="https://example.com/one"/>
  </entry>
  <entry>
    <id>urn:two</id>
    <title>two</title>
    <updated>2024-01-09T12:00:00Z</updated>
    <link rel="related" href="https://example.com/two-related"/>
  </entry>
  <entry>
    <id>urn:three</id>
    <title>three</title>
    <updated>2024-01-08T12:00:00Z</updated>
  </entry>
</feed>"#;

        let entries = parse_feed_in(atom.as_bytes(), &january(), &Utc).unwrap();
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://example.com/one", "https://example.com/two-related", ""]
        );
        assert!(entries.iter().all(|e| e.plain_text.is_empty()));
    }

    #[test]
    fn test_link_without_rel_counts_as_alternate() {
        let atom = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>urn:feed</id>
  <title>Links</title>
  <updated>2024-01-20T12:00:00Z</updated>
  <entry>
    <id>urn:one</id>
    <title>one</title>
    <updated>2024-01-10T12:00:00Z</updated>
    <link rel="related" href="https://example.com/related"/>
    <link href="https://example.com/one"/>
  </entry>
</feed>"#;

        let entries = parse_feed_in(atom.as_bytes(), &january(), &Utc).unwrap();
        assert_eq!(entries[0].url, "https://example.com/one");
    }

    #[test]
    fn test_publish_date_follows_timezone() {
        let atom = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>urn:feed</id>
  <title>Late</title>
  <updated>2024-01-08T20:00:00Z</updated>
  <entry>
    <id>urn:late</id>
    <title>late</title>
    <updated>2024-01-08T20:00:00Z</updated>
  </entry>
</feed>"#;
        let jan_8 = FeedQuery::new(date(2024, 1, 8), date(2024, 1, 8));

        let utc = parse_feed_in(atom.as_bytes(), &jan_8, &Utc).unwrap();
        assert_eq!(utc.len(), 1);
        assert_eq!(utc[0].published_at, date(2024, 1, 8));

        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert!(parse_feed_in(atom.as_bytes(), &jan_8, &tokyo).unwrap().is_empty());

        let january = parse_feed_in(atom.as_bytes(), &january(), &tokyo).unwrap();
        assert_eq!(january[0].published_at, date(2024, 1, 9));
    }

    #[tokio::test]
    async fn test_fetch_feed_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/releases.atom"))
            .and(header("User-Agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string(ATOM_RELEASES))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/releases.atom", mock_server.uri());
        let entries = fetch_feed(&client, &url, &january()).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].version, "v0.1.25");
    }

    #[tokio::test]
    async fn test_fetch_feed_http_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing.atom"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/missing.atom", mock_server.uri());
        let result = fetch_feed(&client, &url, &january()).await;

        assert!(matches!(result.unwrap_err(), FetchError::Http(_)));
    }

    #[tokio::test]
    async fn test_fetch_feed_network_error() {
        let client = HttpClient::new();
        let result = fetch_feed(&client, "http://127.0.0.1:1/feed.xml", &january()).await;

        assert!(matches!(result.unwrap_err(), FetchError::Http(_)));
    }

    #[tokio::test]
    async fn test_fetch_feed_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope"))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/feed.xml", mock_server.uri());
        let result = fetch_feed(&client, &url, &january()).await;

        assert!(matches!(result.unwrap_err(), FetchError::Parse(_)));
    }
}
