//! Release notes from raw Markdown changelogs.
//!
//! Some products publish a `CHANGELOG.md` instead of a feed. This module splits
//! such a document on its level-2 version headings and produces the same
//! [`ReleaseEntry`] records as the feed path, with the body run through
//! [`filter_low_value_lines`].
//!
//! ## Supported Headings
//!
//! - Conventional Changelog: `## 1.2.3 (2024-01-15)`
//! - Keep a Changelog: `## [1.2.3] - 2024-01-15`
//! - Plain: `## v1.2.3 - 2024-01-15`
//!
//! Headings without a date, and `Unreleased` sections, are skipped.

use super::filter::filter_low_value_lines;
use super::types::{FeedQuery, FetchError, ReleaseEntry, truncate_content};
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client as HttpClient;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// HTTP timeout for changelog file fetching (15 seconds)
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum lines to parse from a changelog file
const MAX_LINES_TO_PARSE: usize = 5000;

/// `## 1.2.3 (2024-01-15)`, `## [1.2.3] - 2024-01-15`, `## v1.2.3 - 2024-01-15`
static VERSION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^##\s+\[?(?P<version>[^\]\s(]+)\]?\s*(?:-\s*|\()(?P<date>\d{4}-\d{2}-\d{2})\)?\s*$",
    )
    .expect("valid regex")
});

/// Fetch a raw Markdown changelog and return the releases inside the query window.
///
/// ## Errors
///
/// Returns `FetchError::Http` for network failures or non-success statuses.
#[instrument(skip(client, query), fields(start = %query.start, end = %query.end))]
pub async fn fetch_markdown_release_notes(
    client: &HttpClient,
    url: &str,
    query: &FeedQuery,
) -> Result<Vec<ReleaseEntry>, FetchError> {
    let content = client
        .get(url)
        .header(reqwest::header::USER_AGENT, super::fetch::USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    Ok(parse_markdown_release_notes(&content, query))
}

/// Parse a Markdown changelog into release entries inside the query window, newest first.
///
/// Only [`FeedQuery::start`], [`FeedQuery::end`], and
/// [`FeedQuery::max_content_chars`] apply; Markdown has no categories or
/// summaries. The `url` of each entry is left empty.
///
/// ## Examples
///
/// ```
/// use chrono::NaiveDate;
/// use newsletter_lib::feeds::markdown::parse_markdown_release_notes;
/// use newsletter_lib::feeds::types::FeedQuery;
///
/// let changelog = "# Changelog\n\n## [Unreleased]\n- wip\n\n## [1.1.0] - 2024-01-12\n- Add export\n- chore: bump deps\n";
/// let query = FeedQuery::new(
///     NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
/// );
///
/// let releases = parse_markdown_release_notes(changelog, &query);
/// assert_eq!(releases.len(), 1);
/// assert_eq!(releases[0].version, "1.1.0");
/// assert_eq!(releases[0].plain_text, "- Add export");
/// ```
pub fn parse_markdown_release_notes(content: &str, query: &FeedQuery) -> Vec<ReleaseEntry> {
    let mut releases = Vec::new();
    let mut current: Option<(String, NaiveDate, Vec<&str>)> = None;

    for line in content.lines().take(MAX_LINES_TO_PARSE) {
        let trimmed = line.trim();

        if trimmed.starts_with("## ") || trimmed == "##" {
            if let Some(section) = current.take() {
                releases.push(section);
            }
            current = parse_heading(trimmed).map(|(version, date)| (version, date, Vec::new()));
            continue;
        }

        if let Some((_, _, body)) = current.as_mut() {
            body.push(line);
        }
    }

    if let Some(section) = current {
        releases.push(section);
    }

    let total = releases.len();
    let mut entries: Vec<ReleaseEntry> = releases
        .into_iter()
        .filter(|(version, date, _)| {
            let keep = query.contains(*date);
            if !keep {
                debug!(%version, %date, "Skipping release outside window");
            }
            keep
        })
        .map(|(version, date, body)| {
            let text = filter_low_value_lines(&body.join("\n"));
            let plain_text = truncate_content(text.trim(), query.max_content_chars);
            ReleaseEntry::new(version, date, plain_text)
        })
        .collect();

    entries.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    info!(kept = entries.len(), total, "Parsed markdown release notes");
    entries
}

fn parse_heading(heading: &str) -> Option<(String, NaiveDate)> {
    let captures = VERSION_HEADING.captures(heading)?;
    let version = captures.name("version")?.as_str();

    if version.eq_ignore_ascii_case("unreleased") {
        return None;
    }

    let date = NaiveDate::parse_from_str(captures.name("date")?.as_str(), "%Y-%m-%d").ok()?;
    Some((version.to_string(), date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const CHANGELOG: &str = "# Changelog

## 2.1.0 (2024-01-14)

### Features

- Add streaming responses
- docs: clarify setup

## [2.0.1] - 2024-01-10
- Handle empty prompts by @octo in #88

## v2.0.0 - 2024-01-02

- Rewrite the engine

## 1.9.0

- Undated section is ignored
";

    #[test]
    fn test_parse_heading_formats() {
        assert_eq!(
            parse_heading("## 1.2.3 (2024-01-15)"),
            Some(("1.2.3".to_string(), date(2024, 1, 15)))
        );
        assert_eq!(
            parse_heading("## [1.2.3] - 2024-01-15"),
            Some(("1.2.3".to_string(), date(2024, 1, 15)))
        );
        assert_eq!(
            parse_heading("## v1.2.3-beta.1 - 2024-01-15"),
            Some(("v1.2.3-beta.1".to_string(), date(2024, 1, 15)))
        );
        assert_eq!(parse_heading("## [Unreleased] - 2024-01-15"), None);
        assert_eq!(parse_heading("## 1.2.3"), None);
        assert_eq!(parse_heading("## Features"), None);
        assert_eq!(parse_heading("## 1.2.3 (2024-13-45)"), None);
    }

    #[test]
    fn test_parse_changelog_in_window() {
        let query = FeedQuery::new(date(2024, 1, 8), date(2024, 1, 14));
        let entries = parse_markdown_release_notes(CHANGELOG, &query);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].version, "2.1.0");
        assert_eq!(entries[0].published_at, date(2024, 1, 14));
        assert_eq!(entries[0].plain_text, "### Features\n\n- Add streaming responses");
        assert_eq!(entries[1].version, "2.0.1");
        assert_eq!(entries[1].plain_text, "- Handle empty prompts");
    }

    #[test]
    fn test_parse_changelog_truncates() {
        let query = FeedQuery::new(date(2024, 1, 1), date(2024, 1, 31)).with_max_content_chars(6);
        let entries = parse_markdown_release_notes(CHANGELOG, &query);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].version, "v2.0.0");
        assert_eq!(entries[2].plain_text, "- Rewr...");
    }

    #[test]
    fn test_parse_changelog_without_headings() {
        let query = FeedQuery::new(date(2024, 1, 1), date(2024, 1, 31));
        assert!(parse_markdown_release_notes("just some text", &query).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_markdown_release_notes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/CHANGELOG.md"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CHANGELOG))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/CHANGELOG.md", mock_server.uri());
        let query = FeedQuery::new(date(2024, 1, 1), date(2024, 1, 31));
        let entries = fetch_markdown_release_notes(&client, &url, &query)
            .await
            .unwrap();

        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_markdown_release_notes_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/CHANGELOG.md"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/CHANGELOG.md", mock_server.uri());
        let query = FeedQuery::new(date(2024, 1, 1), date(2024, 1, 31));
        let result = fetch_markdown_release_notes(&client, &url, &query).await;

        assert!(matches!(result.unwrap_err(), FetchError::Http(_)));
    }
}
