//! HTML-to-text normalisation for feed bodies.
//!
//! Feed content arrives as HTML fragments. This module rewrites the handful of
//! block tags that carry structure (list items, breaks, headings, paragraphs)
//! into Markdown-ish markers, strips everything else, and decodes entities.
//!
//! The rules are ordered find/replace passes over the whole string, not an HTML
//! parser. Malformed or unclosed markup degrades by being removed.
//!
//! ## Examples
//!
//! ```
//! use newsletter_lib::feeds::normalize::normalize_html;
//!
//! let html = "<h2>New</h2><ul><li>Faster &amp; smaller</li></ul>";
//! assert_eq!(normalize_html(html), "### New\n\n- Faster & smaller");
//! ```

use regex::Regex;
use std::sync::LazyLock;

static LIST_ITEM_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<li\b[^>]*>").expect("valid regex"));
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?\s*>").expect("valid regex"));
static HEADING_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h[1-6]\b[^>]*>").expect("valid regex"));
static HEADING_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</h[1-6]\s*>").expect("valid regex"));
static PARAGRAPH_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<p\b[^>]*>").expect("valid regex"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Converts an HTML fragment into clean plain text.
///
/// Rules, each applied to the whole string before the next:
///
/// 1. `<li ...>` becomes a newline and `"- "`
/// 2. `<br>`, `<br/>`, `<br />` become a newline
/// 3. `<h1>`..`<h6>` become a newline and `"### "` (levels are flattened)
/// 4. `</h1>`..`</h6>` become a newline
/// 5. `<p ...>` becomes a newline
/// 6. any remaining tag is removed
/// 7. HTML entities are decoded
/// 8. runs of three or more newlines collapse to two
/// 9. the result is trimmed
///
/// Empty or whitespace-only input returns an empty string.
pub fn normalize_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let text = LIST_ITEM_OPEN.replace_all(html, "\n- ");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = HEADING_OPEN.replace_all(&text, "\n### ");
    let text = HEADING_CLOSE.replace_all(&text, "\n");
    let text = PARAGRAPH_OPEN.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = html_escape::decode_html_entities(&text);
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");

    text.trim().to_string()
}
