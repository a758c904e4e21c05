//! Generation handlers.
//!
//! ```text
//! POST /api/generate           {"title":"My Site","prompt":"...","model":"fast"}
//! POST /api/cart/{id}/generate {"prompt":"make it blue"}
//! ```

use actix_web::{post, web};
use uuid::Uuid;

use crate::domain::ports::{GenerateRequest, GenerationTarget};
use crate::domain::{Error, ProjectId, parse_tier};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{GenerateBody, GenerateResponse, RegenerateBody};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Generate the first version of a new project.
#[utoipa::path(
    post,
    path = "/api/generate",
    request_body = GenerateBody,
    responses(
        (status = 200, description = "Version committed", body = GenerateResponse),
        (status = 400, description = "Invalid input, slug or balance", body = Error),
        (status = 401, description = "Not signed in", body = Error),
        (status = 409, description = "Slug already used by this owner", body = Error),
        (status = 500, description = "Generation failed", body = Error)
    ),
    tags = ["generation"],
    operation_id = "generate"
)]
#[post("/generate")]
pub async fn generate(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<GenerateBody>,
) -> ApiResult<web::Json<GenerateResponse>> {
    let caller = session.user_id()?;
    let body = payload.into_inner();
    let tier = parse_tier(body.model.as_deref())?;
    let receipt = state
        .generation
        .generate(GenerateRequest {
            caller,
            target: GenerationTarget::New {
                title: body.title,
                slug_hint: body.slug,
            },
            prompt: body.prompt.unwrap_or_default(),
            tier,
        })
        .await?;
    Ok(web::Json(GenerateResponse::from_receipt(receipt)))
}

/// Append a new version to an owned project.
#[utoipa::path(
    post,
    path = "/api/cart/{id}/generate",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = RegenerateBody,
    responses(
        (status = 200, description = "Version committed", body = GenerateResponse),
        (status = 400, description = "Invalid input or balance", body = Error),
        (status = 401, description = "Not signed in", body = Error),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "Unknown project", body = Error),
        (status = 500, description = "Generation failed", body = Error)
    ),
    tags = ["generation"],
    operation_id = "regenerate"
)]
#[post("/cart/{id}/generate")]
pub async fn regenerate(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
    payload: web::Json<RegenerateBody>,
) -> ApiResult<web::Json<GenerateResponse>> {
    let caller = session.user_id()?;
    let body = payload.into_inner();
    let tier = parse_tier(body.model.as_deref())?;
    let receipt = state
        .generation
        .generate(GenerateRequest {
            caller,
            target: GenerationTarget::Existing {
                project_id: ProjectId::from(path.into_inner()),
            },
            prompt: body.prompt.unwrap_or_default(),
            tier,
        })
        .await?;
    Ok(web::Json(GenerateResponse::with_content(receipt)))
}
