//! Projects ("carts") and their immutable versions.
//!
//! A project is owned by one user and addressed by `(owner, slug)`. Its
//! content lives in an append-only sequence of versions numbered from 1.
//! `pinned_version` is a weak reference by number, not an owning pointer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::slug::Slug;
use super::user::{UserId, Username};

/// Stable project identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Generate a new random [`ProjectId`].
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ProjectId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Longest accepted project title, in characters.
pub const TITLE_MAX: usize = 200;
/// Title used when the caller supplies none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Owned container for an ordered history of generated pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: ProjectId,
    pub owner_id: UserId,
    pub title: String,
    pub slug: Slug,
    pub views: u64,
    pub pinned_version: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Whether `user` may modify this project.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }
}

/// Insert payload for a new project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub id: ProjectId,
    pub owner_id: UserId,
    pub title: String,
    pub slug: Slug,
}

/// One immutable snapshot of generated HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub id: Uuid,
    pub project_id: ProjectId,
    pub version_number: u32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Catalog read model joining a project with its owner's handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub owner: Username,
    pub title: String,
    pub slug: Slug,
    pub views: u64,
    pub pinned_version: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl ProjectSummary {
    /// Build a summary from a project and its owner's username.
    #[must_use]
    pub fn from_project(project: &Project, owner: Username) -> Self {
        Self {
            id: project.id,
            owner,
            title: project.title.clone(),
            slug: project.slug.clone(),
            views: project.views,
            pinned_version: project.pinned_version,
            created_at: project.created_at,
        }
    }

    /// Canonical page path for this project.
    #[must_use]
    pub fn url(&self) -> String {
        page_url(&self.owner, &self.slug)
    }
}

/// Project with its owner and version history, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDetail {
    pub project: Project,
    pub owner: Username,
    pub versions: Vec<Version>,
}

/// An owner's aggregate standing in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopularUser {
    pub username: Username,
    /// Sum of views over the owner's projects.
    pub total_views: u64,
    pub project_count: u64,
}

/// Canonical page path `/@{username}/{slug}`.
///
/// # Examples
/// ```
/// use siteulation::domain::{page_url, Slug, Username};
///
/// let owner = Username::new("alice").unwrap();
/// let slug = Slug::parse("my-site").unwrap();
/// assert_eq!(page_url(&owner, &slug), "/@alice/my-site");
/// ```
#[must_use]
pub fn page_url(owner: &Username, slug: &Slug) -> String {
    format!("/@{owner}/{slug}")
}

/// Which version of a project to serve.
///
/// An explicit request wins, then the pin, then the newest version.
#[must_use]
pub fn version_to_serve(requested: Option<u32>, pinned: Option<u32>) -> Option<u32> {
    requested.or(pinned)
}
