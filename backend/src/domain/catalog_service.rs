//! Read side: listings, project detail and page serving.
//!
//! Page serving prefers the store. Only when the store is unreachable does
//! it fall back to the filesystem mirror, and mirrored serves do not count
//! as views.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::identity_service::map_user_error;
use crate::domain::ports::{
    CatalogQuery, PageMirror, ProjectRepository, ServedPage, UserRepository,
};
use crate::domain::project_service::map_project_error;
use crate::domain::{
    Error, ErrorCode, PopularUser, Project, ProjectDetail, ProjectId, ProjectSummary, Slug,
    Username, Version,
};

/// Size of the front-page and recent listings.
pub const LISTING_LIMIT: usize = 24;

/// Catalog service implementing [`CatalogQuery`].
#[derive(Clone)]
pub struct CatalogService {
    projects: Arc<dyn ProjectRepository>,
    users: Arc<dyn UserRepository>,
    mirror: Arc<dyn PageMirror>,
}

impl CatalogService {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        users: Arc<dyn UserRepository>,
        mirror: Arc<dyn PageMirror>,
    ) -> Self {
        Self {
            projects,
            users,
            mirror,
        }
    }

    async fn newest_version(&self, id: ProjectId) -> Result<Option<Version>, Error> {
        Ok(self
            .projects
            .list_versions(id, Some(1))
            .await
            .map_err(map_project_error)?
            .into_iter()
            .next())
    }

    async fn resolve_version(
        &self,
        project: &Project,
        requested: Option<u32>,
    ) -> Result<Version, Error> {
        if let Some(number) = requested {
            return self
                .projects
                .find_version(project.id, number)
                .await
                .map_err(map_project_error)?
                .ok_or_else(|| Error::not_found(format!("version {number} not found")));
        }
        if let Some(number) = project.pinned_version {
            let pinned = self
                .projects
                .find_version(project.id, number)
                .await
                .map_err(map_project_error)?;
            if let Some(version) = pinned {
                return Ok(version);
            }
            warn!(project_id = %project.id, number, "pinned version missing; serving newest");
        }
        self.newest_version(project.id)
            .await?
            .ok_or_else(|| Error::not_found("project has no versions"))
    }

    async fn serve_from_store(
        &self,
        owner: &Username,
        slug: &Slug,
        requested: Option<u32>,
    ) -> Result<ServedPage, Error> {
        let project = self
            .projects
            .find_by_owner_slug(owner, slug)
            .await
            .map_err(map_project_error)?
            .ok_or_else(|| Error::not_found("page not found"))?;
        let version = self.resolve_version(&project, requested).await?;

        if let Err(error) = self.projects.increment_views(project.id).await {
            warn!(project_id = %project.id, %error, "view count not recorded");
        }
        Ok(ServedPage {
            html: version.content,
            version_number: Some(version.version_number),
            from_mirror: false,
        })
    }
}

#[async_trait]
impl CatalogQuery for CatalogService {
    async fn ranked(&self, limit: usize) -> Result<Vec<ProjectSummary>, Error> {
        self.projects.ranked(limit).await.map_err(map_project_error)
    }

    async fn by_owner(&self, username: &str) -> Result<(Username, Vec<ProjectSummary>), Error> {
        let not_found = || Error::not_found("user not found");
        let username = Username::new(username).map_err(|_| not_found())?;
        let user = self
            .users
            .find_by_username(&username)
            .await
            .map_err(map_user_error)?
            .ok_or_else(not_found)?;
        let projects = self
            .projects
            .list_by_owner(user.id())
            .await
            .map_err(map_project_error)?;
        Ok((username, projects))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ProjectSummary>, Error> {
        self.projects.recent(limit).await.map_err(map_project_error)
    }

    async fn popular_users(&self, limit: usize) -> Result<Vec<PopularUser>, Error> {
        self.projects
            .popular_users(limit)
            .await
            .map_err(map_project_error)
    }

    async fn detail(&self, project_id: ProjectId) -> Result<ProjectDetail, Error> {
        let project = self
            .projects
            .find_by_id(project_id)
            .await
            .map_err(map_project_error)?
            .ok_or_else(|| Error::not_found("project not found"))?;
        let owner = self
            .users
            .find_by_id(project.owner_id)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found("project owner not found"))?;
        let versions = self
            .projects
            .list_versions(project_id, None)
            .await
            .map_err(map_project_error)?;
        Ok(ProjectDetail {
            project,
            owner: owner.username().clone(),
            versions,
        })
    }

    async fn serve(
        &self,
        username: &str,
        slug: &str,
        version: Option<u32>,
    ) -> Result<ServedPage, Error> {
        let (Ok(owner), Ok(slug)) = (Username::new(username), Slug::parse(slug)) else {
            return Err(Error::not_found("page not found"));
        };

        match self.serve_from_store(&owner, &slug, version).await {
            Err(error) if error.code() == ErrorCode::ServiceUnavailable => {
                match self.mirror.load(&owner, &slug).await {
                    Ok(Some(html)) => {
                        warn!(%owner, %slug, "store unreachable; serving mirrored page");
                        Ok(ServedPage {
                            html,
                            version_number: None,
                            from_mirror: true,
                        })
                    }
                    Ok(None) => Err(error),
                    Err(mirror_error) => {
                        debug!(%owner, %slug, error = %mirror_error, "mirror read failed");
                        Err(error)
                    }
                }
            }
            other => other,
        }
    }
}
