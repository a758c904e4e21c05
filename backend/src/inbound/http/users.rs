//! Owner leaderboard.
//!
//! ```text
//! GET /api/popular-users
//! ```

use actix_web::{get, web};

use crate::domain::catalog_service::LISTING_LIMIT;
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{PopularUserDto, PopularUsersResponse};
use crate::inbound::http::state::HttpState;

/// Owners ranked by the summed views of their projects.
#[utoipa::path(
    get,
    path = "/api/popular-users",
    responses((status = 200, description = "Popular owners", body = PopularUsersResponse)),
    tags = ["users"],
    operation_id = "popularUsers"
)]
#[get("/popular-users")]
pub async fn popular_users(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<PopularUsersResponse>> {
    let users = state.catalog.popular_users(LISTING_LIMIT).await?;
    Ok(web::Json(PopularUsersResponse {
        users: users.into_iter().map(PopularUserDto::from).collect(),
    }))
}
