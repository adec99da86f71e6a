//! Consolidation of fragmented release entries.
//!
//! Release feeds for multi-language SDKs publish one entry per tag, so a
//! single release shows up as `v0.1.25`, `go/v0.1.25`, `python/v0.1.25`, plus
//! any `v0.1.25-preview.N` builds that came before it. This module folds those
//! fragments into the base release they belong to.
//!
//! ## Classification
//!
//! Each entry's version tag (the title up to the first `:`) is split into an
//! optional `<lang>/` prefix and the remaining version, which is then checked
//! for a `-preview`, `-alpha`, `-beta`, or `-rc` suffix:
//!
//! | Prefix | Suffix | Kind |
//! |--------|--------|------|
//! | no | no | base release, kept in input order |
//! | yes | no | prefixed release, merged into the base or promoted |
//! | any | yes | pre-release, merged into the base or dropped |
//!
//! Version matching is case-insensitive string equality, not semver ordering.
//!
//! ## Examples
//!
//! ```
//! use chrono::NaiveDate;
//! use newsletter_lib::feeds::reconcile::consolidate_prereleases;
//! use newsletter_lib::feeds::types::ReleaseEntry;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! let releases = vec![
//!     ReleaseEntry::new("v0.1.25", date, "Full release notes"),
//!     ReleaseEntry::new("v0.1.25-preview.0", date, "Preview feature"),
//! ];
//!
//! let consolidated = consolidate_prereleases(&releases);
//! assert_eq!(consolidated.len(), 1);
//! assert_eq!(
//!     consolidated[0].plain_text,
//!     "Full release notes\n\nAdditional features from prerelease (v0.1.25-preview.0):\nPreview feature"
//! );
//! ```

use super::types::ReleaseEntry;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

static LANGUAGE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9._]*)/(.*)$").expect("valid regex"));

static PRERELEASE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)-(?:preview|alpha|beta|rc)(?:\.\d+)?$").expect("valid regex")
});

/// How a version tag relates to a base release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionKind {
    /// No language prefix and no pre-release suffix
    Full,
    /// `<lang>/<version>` without a pre-release suffix
    Prefixed {
        /// Language prefix as written, e.g. `go`
        language: String,
        /// Version after the prefix
        version: String,
    },
    /// Any version ending in `-preview`, `-alpha`, `-beta`, or `-rc` (optionally `.N`)
    Prerelease {
        /// Language prefix as written, when present
        language: Option<String>,
        /// Version with prefix and suffix removed
        base: String,
    },
}

/// Returns the version tag: everything before the first `:`, trimmed.
///
/// ## Examples
///
/// ```
/// use newsletter_lib::feeds::reconcile::extract_version_tag;
///
/// assert_eq!(extract_version_tag("go/v0.1.26-preview.0: Add E2E tests"), "go/v0.1.26-preview.0");
/// assert_eq!(extract_version_tag("v1.0.0"), "v1.0.0");
/// ```
pub fn extract_version_tag(version: &str) -> &str {
    version
        .split_once(':')
        .map_or(version, |(tag, _)| tag)
        .trim()
}

/// Classifies a version tag (see [`extract_version_tag`]).
///
/// ## Examples
///
/// ```
/// use newsletter_lib::feeds::reconcile::{classify_version, VersionKind};
///
/// assert_eq!(classify_version("v1.2.0"), VersionKind::Full);
/// assert_eq!(
///     classify_version("python/v1.2.0-beta.1"),
///     VersionKind::Prerelease { language: Some("python".into()), base: "v1.2.0".into() }
/// );
/// ```
pub fn classify_version(tag: &str) -> VersionKind {
    let (language, version) = match LANGUAGE_PREFIX.captures(tag) {
        Some(captures) => (
            captures.get(1).map(|m| m.as_str().to_string()),
            captures.get(2).map_or("", |m| m.as_str()),
        ),
        None => (None, tag),
    };

    if let Some(suffix) = PRERELEASE_SUFFIX.find(version) {
        return VersionKind::Prerelease {
            language,
            base: version[..suffix.start()].to_string(),
        };
    }

    match language {
        Some(language) => VersionKind::Prefixed {
            language,
            version: version.to_string(),
        },
        None => VersionKind::Full,
    }
}

/// Display name for a language prefix.
///
/// Known ecosystems get their conventional casing; anything else is returned
/// unchanged.
///
/// ## Examples
///
/// ```
/// use newsletter_lib::feeds::reconcile::language_label;
///
/// assert_eq!(language_label("dotnet"), ".NET");
/// assert_eq!(language_label("TS"), "TypeScript");
/// assert_eq!(language_label("rust"), "rust");
/// ```
pub fn language_label(language: &str) -> String {
    match language.to_lowercase().as_str() {
        "go" => "Go".to_string(),
        "python" => "Python".to_string(),
        "dotnet" | ".net" => ".NET".to_string(),
        "csharp" | "cs" => "C#".to_string(),
        "typescript" | "ts" => "TypeScript".to_string(),
        "javascript" | "js" => "JavaScript".to_string(),
        _ => language.to_string(),
    }
}

/// Ordered set of base releases addressable by lowercased version tag.
///
/// Merges go through this collection instead of aliasing into the input, so
/// the caller's entries are never touched.
#[derive(Debug, Default)]
struct BaseReleases {
    entries: Vec<ReleaseEntry>,
    index: HashMap<String, usize>,
}

impl BaseReleases {
    fn push(&mut self, entry: ReleaseEntry) {
        let key = extract_version_tag(&entry.version).to_lowercase();
        self.index.entry(key).or_insert(self.entries.len());
        self.entries.push(entry);
    }

    fn find_mut(&mut self, version: &str) -> Option<&mut ReleaseEntry> {
        let position = *self.index.get(&version.to_lowercase())?;
        self.entries.get_mut(position)
    }

    fn into_entries(self) -> Vec<ReleaseEntry> {
        self.entries
    }
}

struct Prefixed<'a> {
    entry: &'a ReleaseEntry,
    language: String,
    version: String,
}

struct Prerelease<'a> {
    entry: &'a ReleaseEntry,
    tag: &'a str,
    language: Option<String>,
    base: String,
}

/// Folds prefixed releases and pre-releases into their base releases.
///
/// 1. Base releases are kept in input order.
/// 2. A prefixed release with notes is appended to the matching base as a
///    `"<Lang> changes:"` block. Without a match it is promoted to a standalone
///    entry at the end.
/// 3. A pre-release with notes is appended to the matching base (matched on
///    its version without language prefix) as an `"Additional features from
///    prerelease"` block. Without a match it is dropped.
///
/// Prefixed releases and pre-releases with empty notes are skipped. The input
/// is not modified.
pub fn consolidate_prereleases(releases: &[ReleaseEntry]) -> Vec<ReleaseEntry> {
    let mut bases = BaseReleases::default();
    let mut prefixed = Vec::new();
    let mut prereleases = Vec::new();

    for entry in releases {
        let tag = extract_version_tag(&entry.version);
        match classify_version(tag) {
            VersionKind::Full => bases.push(entry.clone()),
            VersionKind::Prefixed { language, version } => prefixed.push(Prefixed {
                entry,
                language,
                version,
            }),
            VersionKind::Prerelease { language, base } => prereleases.push(Prerelease {
                entry,
                tag,
                language,
                base,
            }),
        }
    }

    merge_prefixed(&mut bases, prefixed);
    merge_prereleases(&mut bases, prereleases);

    bases.into_entries()
}

fn merge_prefixed(bases: &mut BaseReleases, prefixed: Vec<Prefixed<'_>>) {
    for release in prefixed {
        if release.entry.plain_text.is_empty() {
            debug!(version = %release.entry.version, "Skipping prefixed release without notes");
            continue;
        }

        match bases.find_mut(&release.version) {
            Some(base) => {
                debug!(
                    from = %release.entry.version,
                    into = %base.version,
                    "Merging prefixed release"
                );
                base.plain_text.push_str(&format!(
                    "\n\n{} changes:\n{}",
                    language_label(&release.language),
                    release.entry.plain_text
                ));
            }
            None => {
                debug!(version = %release.entry.version, "Promoting orphan prefixed release");
                bases.push(release.entry.clone());
            }
        }
    }
}

fn merge_prereleases(bases: &mut BaseReleases, prereleases: Vec<Prerelease<'_>>) {
    for release in prereleases {
        if release.entry.plain_text.is_empty() {
            debug!(version = %release.entry.version, "Skipping pre-release without notes");
            continue;
        }

        match bases.find_mut(&release.base) {
            Some(base) => {
                debug!(
                    from = %release.entry.version,
                    into = %base.version,
                    "Merging pre-release"
                );
                let language = release
                    .language
                    .as_deref()
                    .map(|l| format!(" ({})", language_label(l)))
                    .unwrap_or_default();
                base.plain_text.push_str(&format!(
                    "\n\nAdditional features from prerelease{} ({}):\n{}",
                    language, release.tag, release.entry.plain_text
                ));
            }
            None => {
                debug!(version = %release.entry.version, "Dropping orphan pre-release");
            }
        }
    }
}
