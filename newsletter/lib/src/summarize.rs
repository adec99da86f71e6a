//! Summarisation seam.
//!
//! The digest builder hands every non-empty release body to a [`Summarizer`].
//! Model-backed implementations live outside this crate; the crate ships only
//! [`PassthroughSummarizer`], which returns the cleaned text as its own summary.

use thiserror::Error;

/// Errors reported by a summarisation backend.
#[derive(Error, Debug)]
pub enum SummarizeError {
    /// The backend failed to produce a summary
    #[error("Summarizer backend failed: {0}")]
    Backend(String),
}

/// Produces a short summary of cleaned release text.
///
/// Uses native async functions in traits; implementations must be
/// `Send + Sync` so digests can be built from any task.
///
/// ## Examples
///
/// ```
/// use newsletter_lib::summarize::{SummarizeError, Summarizer};
///
/// struct FirstLine;
///
/// impl Summarizer for FirstLine {
///     async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
///         Ok(text.lines().next().unwrap_or_default().to_string())
///     }
///
///     fn name(&self) -> &str {
///         "first-line"
///     }
/// }
/// ```
pub trait Summarizer: Send + Sync {
    /// Summarise `text`.
    ///
    /// ## Errors
    ///
    /// Returns `SummarizeError::Backend` when no summary can be produced.
    fn summarize(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<String, SummarizeError>> + Send;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}

/// Returns the input text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSummarizer;

impl Summarizer for PassthroughSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}
