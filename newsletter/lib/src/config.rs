//! Digest configuration.
//!
//! A digest is described by a YAML document listing the sources to poll:
//!
//! ```yaml
//! title: Weekly AI Tooling Digest
//! cache_dir: /var/cache/newsletter
//! sources:
//!   - name: Codex CLI
//!     url: https://github.com/openai/codex/releases.atom
//!     kind: release
//!     max_content_chars: 4000
//!   - name: Claude blog
//!     url: https://www.anthropic.com/news/rss.xml
//!     kind: blog
//!     categories: [claude, agents]
//!     prefer_short_summary: true
//! ```

use crate::feeds::types::FeedQuery;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides the summary cache location.
pub const CACHE_DIR_ENV: &str = "NEWSLETTER_CACHE_DIR";

const DEFAULT_TITLE: &str = "Release Digest";

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid YAML for the expected schema
    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Config parsed but failed validation
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// How a source's entries are treated when building a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Release feed; entries are consolidated per product
    Release,
    /// Changelog feed; entries are listed as-is
    Changelog,
    /// Blog feed
    Blog,
    /// Raw Markdown `CHANGELOG.md`; consolidated like a release feed
    MarkdownReleaseNotes,
}

impl SourceKind {
    /// Returns true for kinds whose entries go through release consolidation.
    pub fn is_release(self) -> bool {
        matches!(self, SourceKind::Release | SourceKind::MarkdownReleaseNotes)
    }
}

/// One polled source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
    /// Release grouping key; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub prefer_short_summary: bool,
    /// 0 disables truncation
    #[serde(default)]
    pub max_content_chars: usize,
}

impl SourceConfig {
    /// The product this source's releases are grouped under.
    pub fn product(&self) -> &str {
        self.product.as_deref().unwrap_or(&self.name)
    }

    /// Builds the fetch query for this source over `[start, end]`.
    pub fn query(&self, start: NaiveDate, end: NaiveDate) -> FeedQuery {
        FeedQuery::new(start, end)
            .with_categories(self.categories.clone())
            .with_short_summary(self.prefer_short_summary)
            .with_max_content_chars(self.max_content_chars)
    }
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

/// Top-level digest configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsletterConfig {
    #[serde(default = "default_title")]
    pub title: String,
    pub sources: Vec<SourceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl NewsletterConfig {
    /// Reads and validates a YAML config file.
    ///
    /// ## Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise the
    /// errors of [`NewsletterConfig::from_yaml`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&raw)
    }

    /// Parses and validates a YAML config document.
    ///
    /// ## Errors
    ///
    /// - `ConfigError::Yaml` if the document does not match the schema
    /// - `ConfigError::Invalid` if there are no sources, or a source has an
    ///   empty name or url
    ///
    /// ## Examples
    ///
    /// ```
    /// use newsletter_lib::config::{NewsletterConfig, SourceKind};
    ///
    /// let config = NewsletterConfig::from_yaml(
    ///     "sources:\n  - name: Codex\n    url: https://example.com/releases.atom\n    kind: release\n",
    /// )
    /// .unwrap();
    /// assert_eq!(config.title, "Release Digest");
    /// assert_eq!(config.sources[0].kind, SourceKind::Release);
    /// assert_eq!(config.sources[0].product(), "Codex");
    /// ```
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let config: NewsletterConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("at least one source is required".into()));
        }

        for (i, source) in self.sources.iter().enumerate() {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("source #{} has an empty name", i + 1)));
            }
            if source.url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "source '{}' has an empty url",
                    source.name
                )));
            }
        }

        Ok(())
    }

    /// Resolves where summaries are cached.
    ///
    /// `NEWSLETTER_CACHE_DIR` wins, then `cache_dir` from the config, then the
    /// platform cache directory. Returns `None` when none is available.
    pub fn resolve_cache_dir(&self) -> Option<PathBuf> {
        if let Ok(dir) = std::env::var(CACHE_DIR_ENV)
            && !dir.trim().is_empty()
        {
            return Some(PathBuf::from(dir));
        }

        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join("newsletter")))
    }
}
