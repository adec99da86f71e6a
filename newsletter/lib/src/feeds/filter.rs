//! Low-value line filtering for release notes.
//!
//! Release notes generated from commit messages are full of dependency bumps,
//! CI tweaks, and formatting-only changes. This filter drops those lines so the
//! remaining text is worth summarising.
//!
//! The classifier is a deliberately broad keyword heuristic. A line that merely
//! mentions "test" is dropped even if it describes a testing feature.
//!
//! ## Examples
//!
//! ```
//! use newsletter_lib::feeds::filter::filter_low_value_lines;
//!
//! let notes = "- Add offline mode by @octo in #42\n- chore: bump serde\n- Fix typo in README";
//! assert_eq!(filter_low_value_lines(notes), "- Add offline mode");
//! ```

use regex::Regex;
use std::sync::LazyLock;

/// Trailing GitHub attribution, e.g. `by @octo in #42` or `by @octo in https://github.com/o/r/pull/42`.
static ATTRIBUTION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\bby\s+@[\w.-]+\s+in\s+(?:#\d+|https?://\S+/pull/\d+)\s*$")
        .expect("valid regex")
});

static CONVENTIONAL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:fix|docs|chore|style|test|refactor|ci|build|perf)(?:\([^)]*\))?:")
        .expect("valid regex")
});

static LOW_VALUE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:fix|fixes|fixed|improve|improves|improved|improvement|bump|upgrade|upgrades|upgraded|refactor|refactors|refactored|clean|cleans|cleaned|cleanup|revert|reverts|reverted|minor|misc|test|tests|lint|format|formats|formatted|formatting|build fix)\b",
    )
    .expect("valid regex")
});

static HOUSEKEEPING_UPDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bupdate[sd]\s+(?:deps|dependencies|packages|changelog|readme|ci|tests|lock)\b")
        .expect("valid regex")
});

/// Removes a trailing `by @user in #123` attribution and right-trims the line.
///
/// ## Examples
///
/// ```
/// use newsletter_lib::feeds::filter::strip_attribution;
///
/// assert_eq!(strip_attribution("- Add search by @octo in #7"), "- Add search");
/// assert_eq!(strip_attribution("- Add search"), "- Add search");
/// ```
pub fn strip_attribution(line: &str) -> String {
    ATTRIBUTION_SUFFIX
        .replace(line, "")
        .trim_end()
        .to_string()
}

/// Returns true when a line is editorial noise (chores, bumps, CI, formatting).
///
/// A leading `-` bullet and surrounding whitespace are ignored. Matching is
/// case-insensitive.
///
/// ## Examples
///
/// ```
/// use newsletter_lib::feeds::filter::is_low_value_line;
///
/// assert!(is_low_value_line("- docs(readme): clarify install"));
/// assert!(is_low_value_line("Bump tokio from 1.40 to 1.41"));
/// assert!(is_low_value_line("Updated dependencies"));
/// assert!(!is_low_value_line("- Add support for proxies"));
/// ```
pub fn is_low_value_line(line: &str) -> bool {
    let content = line.trim_start().trim_start_matches('-').trim();
    let lower = content.to_lowercase();

    CONVENTIONAL_PREFIX.is_match(content)
        || LOW_VALUE_WORDS.is_match(content)
        || HOUSEKEEPING_UPDATE.is_match(content)
        || lower.contains(" ci ")
        || lower.contains("ci:")
}

/// Strips attribution footers and drops low-value lines from `text`.
///
/// Remaining lines are rejoined with `\n` and the result is trimmed. Empty or
/// whitespace-only input is returned unchanged.
pub fn filter_low_value_lines(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    text.lines()
        .map(strip_attribution)
        .filter(|line| !is_low_value_line(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
