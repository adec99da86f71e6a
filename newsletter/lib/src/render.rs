//! Markdown rendering of a [`Digest`].

use crate::digest::{Digest, DigestItem};
use std::fmt::Write;

/// Renders a digest as a Markdown document.
///
/// Sections without entries are omitted. A digest with no entries at all
/// renders a single "Nothing to report" line under the header.
///
/// ## Examples
///
/// ```
/// use chrono::NaiveDate;
/// use newsletter_lib::digest::{Digest, DigestWindow};
/// use newsletter_lib::render_markdown;
///
/// let window = DigestWindow::new(
///     NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
/// );
/// let digest = Digest {
///     title: "Weekly".into(),
///     window,
///     products: vec![],
///     changelog: vec![],
///     blog: vec![],
///     failed_sources: vec![],
/// };
///
/// let markdown = render_markdown(&digest);
/// assert!(markdown.starts_with("# Weekly\n"));
/// assert!(markdown.contains("Nothing to report"));
/// ```
pub fn render_markdown(digest: &Digest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", digest.title);
    let _ = writeln!(
        out,
        "_{} to {}_\n",
        digest.window.start.format("%Y-%m-%d"),
        digest.window.end.format("%Y-%m-%d")
    );

    if digest.is_empty() {
        out.push_str("Nothing to report for this period.\n");
    }

    for product in digest.products.iter().filter(|p| !p.releases.is_empty()) {
        render_section(&mut out, &format!("{} releases", product.product), &product.releases);
    }
    render_section(&mut out, "Changelog", &digest.changelog);
    render_section(&mut out, "From the blog", &digest.blog);

    if !digest.failed_sources.is_empty() {
        out.push_str("---\n\n");
        out.push_str("_Some sources could not be fetched:_\n\n");
        for failed in &digest.failed_sources {
            let _ = writeln!(out, "- {} (<{}>): {}", failed.name, failed.url, failed.error);
        }
        out.push('\n');
    }

    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

fn render_section(out: &mut String, heading: &str, items: &[DigestItem]) {
    if items.is_empty() {
        return;
    }

    let _ = writeln!(out, "## {heading}\n");
    for item in items {
        let entry = &item.entry;
        let date = entry.published_at.format("%Y-%m-%d");
        if entry.url.is_empty() {
            let _ = writeln!(out, "### {} — {}\n", entry.version, date);
        } else {
            let _ = writeln!(out, "### [{}]({}) — {}\n", entry.version, entry.url, date);
        }

        if !item.summary.is_empty() {
            let _ = writeln!(out, "{}\n", item.summary.trim_end());
        }
    }
}
