//! Port abstraction for the project and version store.
//!
//! Adapters uphold the store invariants:
//! - `(owner_id, slug)` is unique; creation rejects on conflict.
//! - Version numbers per project are strictly increasing from 1, with no
//!   duplicates under concurrent appends.
//! - [`ProjectRepository::commit_generation`] is all-or-nothing.

use async_trait::async_trait;

use crate::domain::{
    NewProject, PopularUser, Project, ProjectId, ProjectSummary, Slug, UserId, Username, Version,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by project repository adapters.
    pub enum ProjectPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "project repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "project repository query failed: {message}",
        /// The owner already has a project with this slug.
        SlugTaken { slug: String } => "a project with slug '{slug}' already exists",
        /// The project does not exist.
        ProjectNotFound => "project not found",
        /// The project has no version with this number.
        VersionNotFound { version_number: u32 } => "version {version_number} not found",
        /// The committing user does not exist.
        UserNotFound => "user not found",
        /// The balance does not cover the generation cost.
        InsufficientTokens { available: u32, required: u32 } =>
            "insufficient tokens: {available} available, {required} required",
    }
}

/// Where a committed version lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitTarget {
    /// Create the project in the same transaction.
    Create(NewProject),
    /// Append to an existing project.
    Append(ProjectId),
}

/// One atomic unit: optional project creation, version append and debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationCommit {
    pub user_id: UserId,
    pub target: CommitTarget,
    pub content: String,
    pub cost: u32,
}

/// Result of a successful [`GenerationCommit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedVersion {
    pub project: Project,
    pub version: Version,
    pub tokens_remaining: u32,
}

/// Port for project, version and catalog persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Create an empty project, failing with `SlugTaken` on conflict.
    async fn create_project(&self, project: &NewProject)
    -> Result<Project, ProjectPersistenceError>;

    /// Fetch a project by id.
    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>, ProjectPersistenceError>;

    /// Fetch a project by its owner's username and slug.
    async fn find_by_owner_slug(
        &self,
        owner: &Username,
        slug: &Slug,
    ) -> Result<Option<Project>, ProjectPersistenceError>;

    /// Append a version numbered one past the current maximum.
    async fn append_version(
        &self,
        id: ProjectId,
        content: &str,
    ) -> Result<Version, ProjectPersistenceError>;

    /// Versions newest first, optionally capped at `limit`.
    async fn list_versions(
        &self,
        id: ProjectId,
        limit: Option<usize>,
    ) -> Result<Vec<Version>, ProjectPersistenceError>;

    /// Fetch one version by number.
    async fn find_version(
        &self,
        id: ProjectId,
        version_number: u32,
    ) -> Result<Option<Version>, ProjectPersistenceError>;

    /// Point the project at an existing version. Idempotent.
    async fn set_pinned(
        &self,
        id: ProjectId,
        version_number: u32,
    ) -> Result<(), ProjectPersistenceError>;

    /// Bump the view counter. Concurrent increments may be lost.
    async fn increment_views(&self, id: ProjectId) -> Result<(), ProjectPersistenceError>;

    /// Most viewed projects, ties broken by recency.
    async fn ranked(&self, limit: usize) -> Result<Vec<ProjectSummary>, ProjectPersistenceError>;

    /// All projects of one owner, newest first.
    async fn list_by_owner(
        &self,
        owner: UserId,
    ) -> Result<Vec<ProjectSummary>, ProjectPersistenceError>;

    /// Most recently created projects.
    async fn recent(&self, limit: usize) -> Result<Vec<ProjectSummary>, ProjectPersistenceError>;

    /// Owners with at least one project, by total views, then project count,
    /// then username.
    async fn popular_users(&self, limit: usize)
    -> Result<Vec<PopularUser>, ProjectPersistenceError>;

    /// Apply a generation commit atomically.
    async fn commit_generation(
        &self,
        commit: &GenerationCommit,
    ) -> Result<CommittedVersion, ProjectPersistenceError>;
}
