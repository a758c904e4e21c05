//! Public pages and listings, served outside `/api`.
//!
//! ```text
//! GET /@alice/my-site?version=2
//! GET /@alice
//! GET /
//! ```

use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, get, web};

use crate::domain::Error;
use crate::domain::catalog_service::LISTING_LIMIT;
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{
    OwnerListingResponse, PageQuery, RankedListingResponse, summaries,
};
use crate::inbound::http::state::HttpState;

/// Serve a project's page: the requested version, else the pin, else the newest.
#[utoipa::path(
    get,
    path = "/@{username}/{slug}",
    params(
        ("username" = String, Path, description = "Owner's username"),
        ("slug" = String, Path, description = "Project slug"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Generated page", content_type = "text/html", body = String),
        (status = 404, description = "Unknown owner, project or version", body = Error),
        (status = 503, description = "Store unavailable and no mirror copy", body = Error)
    ),
    tags = ["pages"],
    operation_id = "servePage"
)]
#[get("/@{username}/{slug}")]
pub async fn serve_page(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let (username, slug) = path.into_inner();
    let page = state
        .catalog
        .serve(&username, &slug, query.into_inner().version)
        .await?;
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page.html))
}

/// An owner's projects, newest first.
#[utoipa::path(
    get,
    path = "/@{username}",
    params(("username" = String, Path, description = "Owner's username")),
    responses(
        (status = 200, description = "Owner listing", body = OwnerListingResponse),
        (status = 404, description = "Unknown owner", body = Error)
    ),
    tags = ["pages"],
    operation_id = "ownerListing"
)]
#[get("/@{username}")]
pub async fn owner_listing(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<OwnerListingResponse>> {
    let (owner, projects) = state.catalog.by_owner(&path.into_inner()).await?;
    Ok(web::Json(OwnerListingResponse {
        username: owner.into(),
        projects: summaries(projects),
    }))
}

/// Most viewed projects, ties broken by recency.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Ranked listing", body = RankedListingResponse)),
    tags = ["pages"],
    operation_id = "rankedListing"
)]
#[get("/")]
pub async fn ranked_listing(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<RankedListingResponse>> {
    let projects = state.catalog.ranked(LISTING_LIMIT).await?;
    Ok(web::Json(RankedListingResponse {
        projects: summaries(projects),
    }))
}
