//! Driving port for listings, project detail and page serving.

use async_trait::async_trait;

use crate::domain::{Error, PopularUser, ProjectDetail, ProjectId, ProjectSummary, Username};

/// A page ready to send to a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedPage {
    pub html: String,
    /// `None` when the page came from the mirror.
    pub version_number: Option<u32>,
    /// Whether the page was read from the mirror because the store was down.
    pub from_mirror: bool,
}

/// Read-side use-cases exposed to inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogQuery: Send + Sync {
    /// Top projects by views, ties broken by recency.
    async fn ranked(&self, limit: usize) -> Result<Vec<ProjectSummary>, Error>;

    /// An owner's projects, newest first.
    async fn by_owner(&self, username: &str) -> Result<(Username, Vec<ProjectSummary>), Error>;

    /// Most recently created projects.
    async fn recent(&self, limit: usize) -> Result<Vec<ProjectSummary>, Error>;

    /// Owners ranked by the total views of their projects.
    async fn popular_users(&self, limit: usize) -> Result<Vec<PopularUser>, Error>;

    /// A project with its owner and full version history.
    async fn detail(&self, project_id: ProjectId) -> Result<ProjectDetail, Error>;

    /// Resolve and count a page view.
    async fn serve(
        &self,
        username: &str,
        slug: &str,
        version: Option<u32>,
    ) -> Result<ServedPage, Error>;
}
