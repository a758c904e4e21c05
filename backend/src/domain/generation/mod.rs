//! Pure building blocks of the generation pipeline.
//!
//! The orchestrator in [`crate::domain::generation_service`] drives these:
//! [`build_context`] assembles history for the backend and
//! [`normalize_output`] turns raw backend text into a servable document.

mod context;
mod normalize;

use std::fmt;

use serde::Serialize;

pub use context::{DEFAULT_HISTORY_DEPTH, build_context};
pub use normalize::{escape_html, normalize_output, strip_code_fence};

/// Longest backend failure excerpt surfaced to clients.
pub const EXCERPT_MAX: usize = 160;

/// Pipeline stage, reported in logs and failure details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Received,
    Validated,
    QuotaChecked,
    Generating,
    Normalizing,
    Committed,
    /// Refused before any side effect.
    Rejected,
    /// Failed after validation; nothing was committed.
    Failed,
}

impl GenerationStage {
    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::QuotaChecked => "quota_checked",
            Self::Generating => "generating",
            Self::Normalizing => "normalizing",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-line prefix of `message`, at most [`EXCERPT_MAX`] characters.
///
/// # Examples
/// ```
/// use siteulation::domain::generation::{bounded_excerpt, EXCERPT_MAX};
///
/// let long = "x".repeat(500);
/// assert_eq!(bounded_excerpt(&long).chars().count(), EXCERPT_MAX + 1);
/// assert_eq!(bounded_excerpt("line one\nline two"), "line one line two");
/// ```
#[must_use]
pub fn bounded_excerpt(message: &str) -> String {
    let flattened: String = message
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect();
    let trimmed = flattened.trim();
    if trimmed.chars().count() <= EXCERPT_MAX {
        return trimmed.to_owned();
    }
    let mut excerpt: String = trimmed.chars().take(EXCERPT_MAX).collect();
    excerpt.push('…');
    excerpt
}
