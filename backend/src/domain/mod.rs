//! Domain primitives, aggregates and services.
//!
//! Purpose: define the strongly typed entities shared by the HTTP surface
//! and the persistence adapters, plus the services that implement the
//! driving ports. Invariants and serialisation contracts are documented on
//! each type.
//!
//! Public surface:
//! - Error and ErrorCode: API error payload and stable identifier.
//! - User, Username, Credentials: identity records and login input.
//! - TokenBalance, TokenPolicy, ModelTier: the generation quota.
//! - Project, Version, Slug: the project and version store model.
//! - IdentityService, GenerationService, ProjectService, CatalogService.

pub mod auth;
pub mod catalog_service;
pub mod error;
pub mod generation;
pub mod generation_service;
pub mod identity_service;
mod mirroring;
pub mod password;
pub mod ports;
pub mod project;
pub mod project_service;
pub mod quota;
pub mod slug;
pub mod trace_id;
pub mod user;

pub use self::auth::{Credentials, CredentialsValidationError, PASSWORD_MAX, PASSWORD_MIN};
pub use self::catalog_service::CatalogService;
pub use self::error::{Error, ErrorCode};
pub use self::generation_service::{GenerationLimits, GenerationService, parse_tier};
pub use self::identity_service::IdentityService;
pub use self::project::{
    DEFAULT_TITLE, NewProject, PopularUser, Project, ProjectDetail, ProjectId, ProjectSummary,
    TITLE_MAX, Version, page_url, version_to_serve,
};
pub use self::project_service::ProjectService;
pub use self::quota::{ModelTier, TokenBalance, TokenPolicy, UnknownModelTier};
pub use self::slug::{FALLBACK_SLUG, Slug, SlugError, derive_slug};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{NewUser, User, UserId, UserValidationError, Username};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use siteulation::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
