//! Owner-side project mutations: creation and pinning.
//!
//! Pinning changes the page readers are served, so the mirror is refreshed
//! with the pinned version afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::mirroring::mirror_served_page;
use crate::domain::ports::{
    PageMirror, ProjectCommand, ProjectPersistenceError, ProjectRepository, UserRepository,
};
use crate::domain::{
    DEFAULT_TITLE, Error, NewProject, Project, ProjectId, Slug, TITLE_MAX, UserId,
};

pub(crate) fn map_project_error(error: ProjectPersistenceError) -> Error {
    match error {
        ProjectPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("project repository unavailable: {message}"))
        }
        ProjectPersistenceError::Query { message } => {
            Error::internal(format!("project repository error: {message}"))
        }
        ProjectPersistenceError::SlugTaken { slug } => {
            Error::slug_exists(format!("a project with slug '{slug}' already exists"))
                .with_details(json!({ "slug": slug }))
        }
        ProjectPersistenceError::ProjectNotFound => Error::not_found("project not found"),
        ProjectPersistenceError::VersionNotFound { version_number } => {
            Error::not_found(format!("version {version_number} not found"))
                .with_details(json!({ "version": version_number }))
        }
        ProjectPersistenceError::UserNotFound => Error::not_found("user not found"),
        ProjectPersistenceError::InsufficientTokens {
            available,
            required,
        } => Error::insufficient_tokens("not enough tokens for this generation")
            .with_details(json!({ "tokens": available, "required": required })),
    }
}

/// Trim `raw`, default it when blank and enforce [`TITLE_MAX`].
pub(crate) fn normalize_title(raw: Option<&str>) -> Result<String, Error> {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(DEFAULT_TITLE.to_owned());
    }
    if trimmed.chars().count() > TITLE_MAX {
        return Err(
            Error::invalid_request(format!("title must be at most {TITLE_MAX} characters"))
                .with_details(json!({ "field": "title" })),
        );
    }
    Ok(trimmed.to_owned())
}

/// Derive a slug from `hint`, surfacing malformed results as `invalid_slug`.
pub(crate) fn slug_from_hint(hint: &str) -> Result<Slug, Error> {
    Slug::derive(hint).map_err(|err| {
        Error::invalid_slug(err.to_string()).with_details(json!({ "hint": hint }))
    })
}

/// Project command service backed by a [`ProjectRepository`].
#[derive(Clone)]
pub struct ProjectService {
    projects: Arc<dyn ProjectRepository>,
    users: Arc<dyn UserRepository>,
    mirror: Arc<dyn PageMirror>,
}

impl ProjectService {
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

    async fn refresh_mirror(&self, project: &Project) {
        let owner = match self.users.find_by_id(project.owner_id).await {
            Ok(Some(owner)) => owner,
            Ok(None) => return,
            Err(error) => {
                warn!(project_id = %project.id, %error, "owner lookup for mirror failed");
                return;
            }
        };
        mirror_served_page(
            self.projects.as_ref(),
            self.mirror.as_ref(),
            owner.username(),
            project,
            None,
        )
        .await;
    }

    async fn owned_project(&self, caller: UserId, id: ProjectId) -> Result<Project, Error> {
        let project = self
            .projects
            .find_by_id(id)
            .await
            .map_err(map_project_error)?
            .ok_or_else(|| Error::not_found("project not found"))?;
        if !project.is_owned_by(caller) {
            return Err(Error::forbidden("only the owner may modify this project"));
        }
        Ok(project)
    }
}

#[async_trait]
impl ProjectCommand for ProjectService {
    async fn create(&self, caller: UserId, title: &str) -> Result<Project, Error> {
        let title = normalize_title(Some(title))?;
        let slug = slug_from_hint(&title)?;
        let project = self
            .projects
            .create_project(&NewProject {
                id: ProjectId::random(),
                owner_id: caller,
                title,
                slug,
            })
            .await
            .map_err(map_project_error)?;
        info!(project_id = %project.id, slug = %project.slug, "project created");
        Ok(project)
    }

    async fn pin(
        &self,
        caller: UserId,
        project_id: ProjectId,
        version_number: u32,
    ) -> Result<Project, Error> {
        let mut project = self.owned_project(caller, project_id).await?;
        self.projects
            .set_pinned(project_id, version_number)
            .await
            .map_err(map_project_error)?;
        project.pinned_version = Some(version_number);
        info!(%project_id, version_number, "version pinned");
        self.refresh_mirror(&project).await;
        Ok(project)
    }
}
