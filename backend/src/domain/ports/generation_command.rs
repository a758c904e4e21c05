//! Driving port for generating and remixing project versions.

use async_trait::async_trait;

use crate::domain::{Error, ModelTier, ProjectId, Slug, UserId};

/// Where a generation request lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationTarget {
    /// A new project; `slug_hint` falls back to the title when absent.
    New {
        title: Option<String>,
        slug_hint: Option<String>,
    },
    /// An existing project owned by the caller.
    Existing { project_id: ProjectId },
}

/// Generation request as accepted from an inbound adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Authenticated caller, if any.
    pub caller: Option<UserId>,
    pub target: GenerationTarget,
    pub prompt: String,
    pub tier: ModelTier,
}

/// Outcome of a committed generation or remix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReceipt {
    pub project_id: ProjectId,
    pub slug: Slug,
    pub version_number: u32,
    /// Canonical page path `/@{username}/{slug}`.
    pub url: String,
    pub tokens_remaining: u32,
    pub content: String,
}

/// Generation use-cases exposed to inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationCommand: Send + Sync {
    /// Run the full pipeline and commit a new version.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerationReceipt, Error>;

    /// Copy another project's served version into a new project for `caller`.
    async fn remix(&self, caller: UserId, source: ProjectId) -> Result<GenerationReceipt, Error>;
}
