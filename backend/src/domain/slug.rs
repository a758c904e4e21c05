//! Slug derivation and validation.
//!
//! Slugs address a project under its owner (`/@{username}/{slug}`). They are
//! lowercase ASCII letters, digits and hyphens, 3 to 50 characters long.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Slug used when a hint reduces to nothing.
pub const FALLBACK_SLUG: &str = "untitled";
/// Shortest well-formed slug.
pub const SLUG_MIN: usize = 3;
/// Longest well-formed slug.
pub const SLUG_MAX: usize = 50;

/// Derive a URL-safe slug from free text.
///
/// Total and deterministic. The result may still be too short to be
/// well-formed (`"ab"`); callers validate with [`Slug::parse`].
///
/// # Examples
/// ```
/// use siteulation::domain::derive_slug;
///
/// assert_eq!(derive_slug("My Site!"), "my-site");
/// assert_eq!(derive_slug("  --Hello,   World--  "), "hello-world");
/// assert_eq!(derive_slug("!!!"), "untitled");
/// ```
#[must_use]
pub fn derive_slug(hint: &str) -> String {
    let mut slug = String::with_capacity(hint.len());
    for ch in hint.trim().to_lowercase().chars() {
        let mapped = if is_slug_char(ch) { ch } else { '-' };
        if mapped == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(mapped);
    }

    let truncated: String = slug.trim_matches('-').chars().take(SLUG_MAX).collect();
    let trimmed = truncated.trim_end_matches('-');
    if trimmed.is_empty() {
        FALLBACK_SLUG.to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn is_slug_char(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-'
}

/// Reasons a slug is not well-formed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlugError {
    #[error("slug must be at least {min} characters")]
    TooShort { min: usize },
    #[error("slug must be at most {max} characters")]
    TooLong { max: usize },
    #[error("slug may only contain lowercase letters, digits, or hyphens")]
    InvalidCharacters,
}

/// A well-formed slug matching `^[a-z0-9-]{3,50}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Validate `raw` without coercing it.
    pub fn parse(raw: impl Into<String>) -> Result<Self, SlugError> {
        let raw = raw.into();
        if !raw.chars().all(is_slug_char) {
            return Err(SlugError::InvalidCharacters);
        }
        let length = raw.len();
        if length < SLUG_MIN {
            return Err(SlugError::TooShort { min: SLUG_MIN });
        }
        if length > SLUG_MAX {
            return Err(SlugError::TooLong { max: SLUG_MAX });
        }
        Ok(Self(raw))
    }

    /// Derive from a hint and validate the result.
    pub fn derive(hint: &str) -> Result<Self, SlugError> {
        Self::parse(derive_slug(hint))
    }

    /// The slug a remix of this project is created under.
    pub fn remix(&self) -> Result<Self, SlugError> {
        Self::derive(&format!("{}-remix", self.0))
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Slug> for String {
    fn from(value: Slug) -> Self {
        value.0
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
