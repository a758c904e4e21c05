//! Request and response bodies for the HTTP API.
//!
//! Domain types stay free of serde wire concerns; these DTOs own the JSON
//! shape and the OpenAPI schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::ports::GenerationReceipt;
use crate::domain::{PopularUser, Project, ProjectDetail, ProjectSummary, User, Version};

/// Body for `POST /api/signup` and `POST /api/login`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CredentialsRequest {
    #[serde(default)]
    #[schema(example = "alice")]
    pub username: Option<String>,
    #[serde(default)]
    #[schema(example = "hunter22")]
    pub password: Option<String>,
}

/// Signed-in account summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub ok: bool,
    pub user_id: Uuid,
    pub username: String,
    pub tokens: u32,
}

impl From<&User> for AccountResponse {
    fn from(user: &User) -> Self {
        Self {
            ok: true,
            user_id: *user.id().as_uuid(),
            username: user.username().to_string(),
            tokens: user.tokens(),
        }
    }
}

/// Bare acknowledgement.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

/// Current token balance after any due refill.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokensResponse {
    pub tokens: u32,
}

/// Body for `POST /api/generate`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct GenerateBody {
    #[serde(default)]
    #[schema(example = "My Site")]
    pub title: Option<String>,
    #[serde(default)]
    #[schema(example = "my-site")]
    pub slug: Option<String>,
    #[serde(default)]
    #[schema(example = "A landing page for an otter sanctuary")]
    pub prompt: Option<String>,
    #[serde(default)]
    #[schema(example = "fast")]
    pub model: Option<String>,
}

/// Body for `POST /api/cart/{id}/generate`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct RegenerateBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Outcome of a committed generation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateResponse {
    pub ok: bool,
    #[schema(example = "/@alice/my-site")]
    pub url: String,
    pub slug: String,
    pub version_number: u32,
    pub tokens_remaining: u32,
    pub project_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl GenerateResponse {
    /// Response without the page body.
    #[must_use]
    pub fn from_receipt(receipt: GenerationReceipt) -> Self {
        Self {
            ok: true,
            url: receipt.url,
            slug: receipt.slug.into(),
            version_number: receipt.version_number,
            tokens_remaining: receipt.tokens_remaining,
            project_id: *receipt.project_id.as_uuid(),
            content: None,
        }
    }

    /// Response echoing the generated page.
    #[must_use]
    pub fn with_content(receipt: GenerationReceipt) -> Self {
        let content = receipt.content.clone();
        Self {
            content: Some(content),
            ..Self::from_receipt(receipt)
        }
    }
}

/// Body for `POST /api/cart/create`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateCartBody {
    #[serde(default)]
    #[schema(example = "My Site")]
    pub name: Option<String>,
}

/// Newly created project.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCartResponse {
    pub ok: bool,
    pub cart_id: Uuid,
    pub slug: String,
    pub url: String,
}

/// Project metadata as shown on its detail view.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartDto {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner: String,
    pub title: String,
    pub slug: String,
    pub views: u64,
    pub pinned_version: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl CartDto {
    fn from_project(project: &Project, owner: String) -> Self {
        Self {
            id: *project.id.as_uuid(),
            owner_id: *project.owner_id.as_uuid(),
            owner,
            title: project.title.clone(),
            slug: project.slug.to_string(),
            views: project.views,
            pinned_version: project.pinned_version,
            created_at: project.created_at,
        }
    }
}

/// One stored version.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VersionDto {
    pub version_number: u32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Version> for VersionDto {
    fn from(version: Version) -> Self {
        Self {
            version_number: version.version_number,
            content: version.content,
            created_at: version.created_at,
        }
    }
}

/// `GET /api/cart/{id}` payload; versions newest first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartDetailResponse {
    pub cart: CartDto,
    pub versions: Vec<VersionDto>,
}

impl From<ProjectDetail> for CartDetailResponse {
    fn from(detail: ProjectDetail) -> Self {
        Self {
            cart: CartDto::from_project(&detail.project, detail.owner.to_string()),
            versions: detail.versions.into_iter().map(VersionDto::from).collect(),
        }
    }
}

/// Acknowledgement of a pin.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PinResponse {
    pub ok: bool,
    pub pinned_version: u32,
}

/// Project created by remixing another.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RemixResponse {
    pub ok: bool,
    pub cart_id: Uuid,
    pub slug: String,
    pub url: String,
    pub version_number: u32,
}

impl From<GenerationReceipt> for RemixResponse {
    fn from(receipt: GenerationReceipt) -> Self {
        Self {
            ok: true,
            cart_id: *receipt.project_id.as_uuid(),
            slug: receipt.slug.into(),
            url: receipt.url,
            version_number: receipt.version_number,
        }
    }
}

/// Catalog entry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectSummaryDto {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub views: u64,
    pub pinned_version: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl From<ProjectSummary> for ProjectSummaryDto {
    fn from(summary: ProjectSummary) -> Self {
        Self {
            id: *summary.id.as_uuid(),
            url: summary.url(),
            owner: summary.owner.into(),
            title: summary.title,
            slug: summary.slug.into(),
            views: summary.views,
            pinned_version: summary.pinned_version,
            created_at: summary.created_at,
        }
    }
}

pub(crate) fn summaries(items: Vec<ProjectSummary>) -> Vec<ProjectSummaryDto> {
    items.into_iter().map(ProjectSummaryDto::from).collect()
}

/// `GET /api/carts/recent` payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecentCartsResponse {
    pub carts: Vec<ProjectSummaryDto>,
}

/// `GET /@{username}` payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OwnerListingResponse {
    pub username: String,
    pub projects: Vec<ProjectSummaryDto>,
}

/// `GET /` payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RankedListingResponse {
    pub projects: Vec<ProjectSummaryDto>,
}

/// Owner ranked by total views.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PopularUserDto {
    pub username: String,
    /// Sum of views over the owner's projects.
    pub views: u64,
    /// Number of projects the owner has.
    pub projects: u64,
}

impl From<PopularUser> for PopularUserDto {
    fn from(user: PopularUser) -> Self {
        Self {
            username: user.username.into(),
            views: user.total_views,
            projects: user.project_count,
        }
    }
}

/// `GET /api/popular-users` payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PopularUsersResponse {
    pub users: Vec<PopularUserDto>,
}

/// Query string for page serving.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Serve this version instead of the pinned or newest one.
    pub version: Option<u32>,
}
