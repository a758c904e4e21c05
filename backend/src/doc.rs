//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint from the inbound layer together
//! with the session cookie security scheme. The document backs Swagger UI in
//! debug builds and is exported with `cargo run --bin openapi-dump`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::dto::{
    AccountResponse, CartDetailResponse, CartDto, CreateCartBody, CreateCartResponse,
    CredentialsRequest, GenerateBody, GenerateResponse, OkResponse, OwnerListingResponse,
    PinResponse, PopularUserDto, PopularUsersResponse, ProjectSummaryDto, RankedListingResponse,
    RecentCartsResponse, RegenerateBody, RemixResponse, TokensResponse, VersionDto,
};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/signup or POST /api/login.",
            ))),
        );
    }
}

/// OpenAPI document for the HTTP surface.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Siteulation API",
        description = "Prompt-to-website generation with owner-scoped projects, versions and a public catalog."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::signup,
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::current_user,
        crate::inbound::http::auth::tokens,
        crate::inbound::http::generate::generate,
        crate::inbound::http::generate::regenerate,
        crate::inbound::http::carts::create_cart,
        crate::inbound::http::carts::get_cart,
        crate::inbound::http::carts::pin_version,
        crate::inbound::http::carts::remix_cart,
        crate::inbound::http::carts::recent_carts,
        crate::inbound::http::users::popular_users,
        crate::inbound::http::pages::serve_page,
        crate::inbound::http::pages::owner_listing,
        crate::inbound::http::pages::ranked_listing,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        CredentialsRequest,
        AccountResponse,
        OkResponse,
        TokensResponse,
        GenerateBody,
        RegenerateBody,
        GenerateResponse,
        CreateCartBody,
        CreateCartResponse,
        CartDto,
        VersionDto,
        CartDetailResponse,
        PinResponse,
        RemixResponse,
        ProjectSummaryDto,
        RecentCartsResponse,
        OwnerListingResponse,
        RankedListingResponse,
        PopularUserDto,
        PopularUsersResponse,
    )),
    tags(
        (name = "account", description = "Signup, login and token balance"),
        (name = "generation", description = "Prompt-driven page generation"),
        (name = "carts", description = "Projects and their versions"),
        (name = "users", description = "Owner leaderboard"),
        (name = "pages", description = "Public pages and listings"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
