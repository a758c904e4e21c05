//! Project ("cart") handlers.
//!
//! ```text
//! POST /api/cart/create                {"name":"My Site"}
//! GET  /api/cart/{id}
//! POST /api/cart/{id}/pin/{version_number}
//! POST /api/cart/{id}/remix
//! GET  /api/carts/recent
//! ```

use actix_web::{HttpResponse, get, post, web};
use uuid::Uuid;

use crate::domain::catalog_service::LISTING_LIMIT;
use crate::domain::{DEFAULT_TITLE, Error, ProjectId, page_url};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{
    CartDetailResponse, CreateCartBody, CreateCartResponse, PinResponse, RecentCartsResponse,
    RemixResponse, summaries,
};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Create an empty project owned by the caller.
#[utoipa::path(
    post,
    path = "/api/cart/create",
    request_body = CreateCartBody,
    responses(
        (status = 201, description = "Project created", body = CreateCartResponse),
        (status = 400, description = "Invalid title", body = Error),
        (status = 401, description = "Not signed in", body = Error),
        (status = 409, description = "Slug already used by this owner", body = Error)
    ),
    tags = ["carts"],
    operation_id = "createCart"
)]
#[post("/cart/create")]
pub async fn create_cart(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateCartBody>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user()?;
    let title = payload.into_inner().name.unwrap_or_default();
    let title = match title.trim() {
        "" => DEFAULT_TITLE,
        trimmed => trimmed,
    };
    let project = state.projects.create(user.id, title).await?;
    Ok(HttpResponse::Created().json(CreateCartResponse {
        ok: true,
        cart_id: *project.id.as_uuid(),
        url: page_url(&user.username, &project.slug),
        slug: project.slug.into(),
    }))
}

/// A project with every stored version, newest first.
#[utoipa::path(
    get,
    path = "/api/cart/{id}",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project detail", body = CartDetailResponse),
        (status = 404, description = "Unknown project", body = Error)
    ),
    tags = ["carts"],
    operation_id = "getCart"
)]
#[get("/cart/{id}")]
pub async fn get_cart(
    state: web::Data<HttpState>,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<CartDetailResponse>> {
    let detail = state
        .catalog
        .detail(ProjectId::from(path.into_inner()))
        .await?;
    Ok(web::Json(CartDetailResponse::from(detail)))
}

/// Pin a version as the one served by default.
#[utoipa::path(
    post,
    path = "/api/cart/{id}/pin/{version_number}",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("version_number" = u32, Path, description = "Version to pin")
    ),
    responses(
        (status = 200, description = "Pinned", body = PinResponse),
        (status = 401, description = "Not signed in", body = Error),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "Unknown project or version", body = Error)
    ),
    tags = ["carts"],
    operation_id = "pinVersion"
)]
#[post("/cart/{id}/pin/{version_number}")]
pub async fn pin_version(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(Uuid, u32)>,
) -> ApiResult<web::Json<PinResponse>> {
    let user = session.require_user()?;
    let (id, version_number) = path.into_inner();
    let project = state
        .projects
        .pin(user.id, ProjectId::from(id), version_number)
        .await?;
    Ok(web::Json(PinResponse {
        ok: true,
        pinned_version: project.pinned_version.unwrap_or(version_number),
    }))
}

/// Copy another project's served version into a new project of the caller.
#[utoipa::path(
    post,
    path = "/api/cart/{id}/remix",
    params(("id" = Uuid, Path, description = "Source project id")),
    responses(
        (status = 201, description = "Remix created", body = RemixResponse),
        (status = 400, description = "Insufficient tokens", body = Error),
        (status = 401, description = "Not signed in", body = Error),
        (status = 404, description = "Unknown or empty source", body = Error)
    ),
    tags = ["carts"],
    operation_id = "remixCart"
)]
#[post("/cart/{id}/remix")]
pub async fn remix_cart(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user()?;
    let receipt = state
        .generation
        .remix(user.id, ProjectId::from(path.into_inner()))
        .await?;
    Ok(HttpResponse::Created().json(RemixResponse::from(receipt)))
}

/// Most recently created projects.
#[utoipa::path(
    get,
    path = "/api/carts/recent",
    responses((status = 200, description = "Recent projects", body = RecentCartsResponse)),
    tags = ["carts"],
    operation_id = "recentCarts"
)]
#[get("/carts/recent")]
pub async fn recent_carts(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<RecentCartsResponse>> {
    let carts = state.catalog.recent(LISTING_LIMIT).await?;
    Ok(web::Json(RecentCartsResponse {
        carts: summaries(carts),
    }))
}

#[cfg(test)]
#[path = "carts_tests.rs"]
mod tests;
