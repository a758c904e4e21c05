//! Driving port for owner-side project mutations.

use async_trait::async_trait;

use crate::domain::{Error, Project, ProjectId, UserId};

/// Project use-cases exposed to inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectCommand: Send + Sync {
    /// Create an empty project titled `title` for `caller`.
    async fn create(&self, caller: UserId, title: &str) -> Result<Project, Error>;

    /// Pin `version_number` as the canonical version. Owner only.
    async fn pin(
        &self,
        caller: UserId,
        project_id: ProjectId,
        version_number: u32,
    ) -> Result<Project, Error>;
}
