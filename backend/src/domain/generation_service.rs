//! Generation orchestrator.
//!
//! Drives a prompt through validation, the quota gate, the backend call and
//! normalisation, then commits the version and the debit as one unit. The
//! backend is awaited outside any store transaction; nothing is written
//! until the final commit, so an abandoned or failed request leaves the
//! store untouched.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::generation::{
    DEFAULT_HISTORY_DEPTH, GenerationStage, bounded_excerpt, build_context, normalize_output,
};
use crate::domain::identity_service::map_user_error;
use crate::domain::mirroring::mirror_served_page;
use crate::domain::ports::{
    CommitTarget, CommittedVersion, GenerateRequest, GenerationBackend, GenerationCommand,
    GenerationCommit, GenerationReceipt, GenerationRequest, GenerationTarget, PageMirror,
    ProjectRepository, UserRepository,
};
use crate::domain::project_service::{map_project_error, normalize_title, slug_from_hint};
use crate::domain::{
    Error, ModelTier, NewProject, Project, ProjectId, Slug, TITLE_MAX, TokenPolicy, User, UserId,
    Version, page_url, version_to_serve,
};

/// Longest accepted prompt, in characters.
pub const PROMPT_MAX: usize = 8000;
/// Default upper bound on a single backend call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Tunable bounds for the generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationLimits {
    pub prompt_max: usize,
    pub history_depth: usize,
    pub timeout: Duration,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            prompt_max: PROMPT_MAX,
            history_depth: DEFAULT_HISTORY_DEPTH,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

/// Resolved destination of a generation.
struct Destination {
    title: String,
    slug: Slug,
    existing: Option<ProjectId>,
}

fn generation_failed(stage: GenerationStage, message: &str) -> Error {
    Error::generation_failed(format!("generation failed: {}", bounded_excerpt(message)))
        .with_details(json!({ "stage": stage }))
}

/// Orchestrator implementing [`GenerationCommand`].
#[derive(Clone)]
pub struct GenerationService {
    users: Arc<dyn UserRepository>,
    projects: Arc<dyn ProjectRepository>,
    backend: Arc<dyn GenerationBackend>,
    mirror: Arc<dyn PageMirror>,
    clock: Arc<dyn Clock>,
    policy: TokenPolicy,
    limits: GenerationLimits,
}

impl GenerationService {
    /// Create an orchestrator with default quota rules and limits.
    pub fn new(
        users: Arc<dyn UserRepository>,
        projects: Arc<dyn ProjectRepository>,
        backend: Arc<dyn GenerationBackend>,
        mirror: Arc<dyn PageMirror>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            projects,
            backend,
            mirror,
            clock,
            policy: TokenPolicy::default(),
            limits: GenerationLimits::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: TokenPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: GenerationLimits) -> Self {
        self.limits = limits;
        self
    }

    fn validate_prompt(&self, raw: &str) -> Result<String, Error> {
        let prompt = raw.trim();
        if prompt.is_empty() {
            return Err(Error::missing_fields("prompt is required")
                .with_details(json!({ "field": "prompt" })));
        }
        if prompt.chars().count() > self.limits.prompt_max {
            return Err(Error::invalid_request(format!(
                "prompt must be at most {} characters",
                self.limits.prompt_max
            ))
            .with_details(json!({ "field": "prompt" })));
        }
        Ok(prompt.to_owned())
    }

    async fn resolve_destination(
        &self,
        caller: UserId,
        target: &GenerationTarget,
    ) -> Result<Destination, Error> {
        match target {
            GenerationTarget::New { title, slug_hint } => {
                let title = normalize_title(title.as_deref())?;
                let hint = slug_hint
                    .as_deref()
                    .map(str::trim)
                    .filter(|hint| !hint.is_empty())
                    .unwrap_or(title.as_str());
                let slug = slug_from_hint(hint)?;
                Ok(Destination {
                    title,
                    slug,
                    existing: None,
                })
            }
            GenerationTarget::Existing { project_id } => {
                let project = self.owned_project(caller, *project_id).await?;
                Ok(Destination {
                    title: project.title,
                    slug: project.slug,
                    existing: Some(project.id),
                })
            }
        }
    }

    async fn owned_project(&self, caller: UserId, id: ProjectId) -> Result<Project, Error> {
        let project = self
            .projects
            .find_by_id(id)
            .await
            .map_err(map_project_error)?
            .ok_or_else(|| Error::not_found("project not found"))?;
        if !project.is_owned_by(caller) {
            return Err(Error::forbidden("only the owner may generate for this project"));
        }
        Ok(project)
    }

    async fn check_quota(&self, caller: UserId, cost: u32) -> Result<User, Error> {
        let user = self
            .users
            .apply_refill(caller, self.clock.utc(), self.policy)
            .await
            .map_err(map_user_error)?;
        if user.tokens() < cost {
            return Err(Error::insufficient_tokens("not enough tokens for this generation")
                .with_details(json!({ "tokens": user.tokens(), "required": cost })));
        }
        Ok(user)
    }

    async fn ensure_slug_free(&self, user: &User, slug: &Slug) -> Result<(), Error> {
        let existing = self
            .projects
            .find_by_owner_slug(user.username(), slug)
            .await
            .map_err(map_project_error)?;
        if existing.is_some() {
            return Err(Error::slug_exists(format!(
                "a project with slug '{slug}' already exists"
            ))
            .with_details(json!({ "slug": slug })));
        }
        Ok(())
    }

    async fn history(&self, existing: Option<ProjectId>) -> Result<Vec<Version>, Error> {
        let Some(id) = existing else {
            return Ok(Vec::new());
        };
        self.projects
            .list_versions(id, Some(self.limits.history_depth))
            .await
            .map_err(map_project_error)
    }

    async fn call_backend(&self, request: &GenerationRequest) -> Result<String, Error> {
        match tokio::time::timeout(self.limits.timeout, self.backend.generate(request)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(error)) => {
                warn!(stage = %GenerationStage::Failed, %error, "generation backend failed");
                Err(generation_failed(GenerationStage::Generating, &error.to_string()))
            }
            Err(_) => {
                let secs = self.limits.timeout.as_secs_f64();
                warn!(stage = %GenerationStage::Failed, timeout_secs = secs, "generation timed out");
                Err(generation_failed(
                    GenerationStage::Generating,
                    &format!("backend did not answer within {secs}s"),
                ))
            }
        }
    }

    async fn mirror_best_effort(&self, user: &User, committed: &CommittedVersion) {
        mirror_served_page(
            self.projects.as_ref(),
            self.mirror.as_ref(),
            user.username(),
            &committed.project,
            Some(&committed.version),
        )
        .await;
    }

    fn receipt(user: &User, committed: CommittedVersion) -> GenerationReceipt {
        GenerationReceipt {
            project_id: committed.project.id,
            url: page_url(user.username(), &committed.project.slug),
            slug: committed.project.slug,
            version_number: committed.version.version_number,
            tokens_remaining: committed.tokens_remaining,
            content: committed.version.content,
        }
    }

    async fn served_version(&self, project: &Project) -> Result<Version, Error> {
        let version = match version_to_serve(None, project.pinned_version) {
            Some(number) => self
                .projects
                .find_version(project.id, number)
                .await
                .map_err(map_project_error)?,
            None => self
                .projects
                .list_versions(project.id, Some(1))
                .await
                .map_err(map_project_error)?
                .into_iter()
                .next(),
        };
        version.ok_or_else(|| Error::not_found("source project has no versions"))
    }
}

#[async_trait]
impl GenerationCommand for GenerationService {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerationReceipt, Error> {
        let Some(caller) = request.caller else {
            return Err(Error::auth_required("login required"));
        };
        debug!(user_id = %caller, stage = %GenerationStage::Received, tier = %request.tier);

        let prompt = self.validate_prompt(&request.prompt)?;
        let destination = self.resolve_destination(caller, &request.target).await?;
        debug!(user_id = %caller, stage = %GenerationStage::Validated, slug = %destination.slug);

        let cost = self.policy.cost(request.tier);
        let user = self.check_quota(caller, cost).await?;
        if destination.existing.is_none() {
            self.ensure_slug_free(&user, &destination.slug).await?;
        }
        debug!(user_id = %caller, stage = %GenerationStage::QuotaChecked, tokens = user.tokens(), cost);

        let history = self.history(destination.existing).await?;
        let backend_request = GenerationRequest {
            tier: request.tier,
            title: destination.title.clone(),
            context: build_context(&history, &prompt),
            prompt,
        };
        debug!(user_id = %caller, stage = %GenerationStage::Generating, history = history.len());
        let raw = self.call_backend(&backend_request).await?;

        debug!(user_id = %caller, stage = %GenerationStage::Normalizing, bytes = raw.len());
        let content = normalize_output(&raw, &destination.title).ok_or_else(|| {
            warn!(user_id = %caller, stage = %GenerationStage::Failed, "generation returned empty output");
            generation_failed(GenerationStage::Normalizing, "backend returned empty output")
        })?;

        let target = match destination.existing {
            Some(id) => CommitTarget::Append(id),
            None => CommitTarget::Create(NewProject {
                id: ProjectId::random(),
                owner_id: caller,
                title: destination.title,
                slug: destination.slug,
            }),
        };
        let committed = self
            .projects
            .commit_generation(&GenerationCommit {
                user_id: caller,
                target,
                content,
                cost,
            })
            .await
            .map_err(map_project_error)?;
        info!(
            user_id = %caller,
            project_id = %committed.project.id,
            version_number = committed.version.version_number,
            tokens_remaining = committed.tokens_remaining,
            stage = %GenerationStage::Committed,
            "generation committed"
        );

        self.mirror_best_effort(&user, &committed).await;
        Ok(Self::receipt(&user, committed))
    }

    async fn remix(&self, caller: UserId, source: ProjectId) -> Result<GenerationReceipt, Error> {
        let project = self
            .projects
            .find_by_id(source)
            .await
            .map_err(map_project_error)?
            .ok_or_else(|| Error::not_found("project not found"))?;
        let version = self.served_version(&project).await?;
        let user = self
            .users
            .find_by_id(caller)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::auth_required("login required"))?;

        let slug = project.slug.remix().map_err(|err| Error::invalid_slug(err.to_string()))?;
        let title: String = format!("{} (remix)", project.title)
            .chars()
            .take(TITLE_MAX)
            .collect();
        let committed = self
            .projects
            .commit_generation(&GenerationCommit {
                user_id: caller,
                target: CommitTarget::Create(NewProject {
                    id: ProjectId::random(),
                    owner_id: caller,
                    title,
                    slug,
                }),
                content: version.content,
                cost: 0,
            })
            .await
            .map_err(map_project_error)?;
        info!(
            user_id = %caller,
            source_project_id = %source,
            project_id = %committed.project.id,
            "project remixed"
        );

        self.mirror_best_effort(&user, &committed).await;
        Ok(Self::receipt(&user, committed))
    }
}

/// Parse an optional wire tier name, defaulting to [`ModelTier::Fast`].
pub fn parse_tier(raw: Option<&str>) -> Result<ModelTier, Error> {
    match raw.map(str::trim).filter(|tier| !tier.is_empty()) {
        None => Ok(ModelTier::default()),
        Some(name) => name.parse().map_err(|err: crate::domain::UnknownModelTier| {
            Error::invalid_request(err.to_string()).with_details(json!({ "field": "model" }))
        }),
    }
}

#[cfg(test)]
#[path = "generation_service_tests.rs"]
mod tests;
