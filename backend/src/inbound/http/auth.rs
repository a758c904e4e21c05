//! Account handlers: signup, login, logout and token balance.
//!
//! ```text
//! POST /api/signup {"username":"alice","password":"hunter22"}
//! POST /api/login  {"username":"alice","password":"hunter22"}
//! POST /api/logout
//! GET  /api/user
//! GET  /api/user/tokens
//! ```

use actix_web::{HttpResponse, get, post, web};
use tracing::info;

use crate::domain::identity_service::map_credentials_error;
use crate::domain::{Credentials, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{AccountResponse, CredentialsRequest, OkResponse, TokensResponse};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

fn credentials_from(body: CredentialsRequest) -> Result<Credentials, Error> {
    Credentials::try_from_parts(
        body.username.as_deref().unwrap_or_default(),
        body.password.as_deref().unwrap_or_default(),
    )
    .map_err(|err| map_credentials_error(&err))
}

/// Register an account and sign it in.
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Missing or invalid fields", body = Error),
        (status = 409, description = "Username taken", body = Error)
    ),
    tags = ["account"],
    operation_id = "signup"
)]
#[post("/signup")]
pub async fn signup(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CredentialsRequest>,
) -> ApiResult<HttpResponse> {
    let credentials = credentials_from(payload.into_inner())?;
    let user = state.accounts.signup(&credentials).await?;
    session.persist_user(&user)?;
    Ok(HttpResponse::Created().json(AccountResponse::from(&user)))
}

/// Authenticate and establish a session.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Signed in", body = AccountResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Missing fields", body = Error),
        (status = 401, description = "Invalid credentials", body = Error)
    ),
    tags = ["account"],
    operation_id = "login"
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CredentialsRequest>,
) -> ApiResult<web::Json<AccountResponse>> {
    let credentials = credentials_from(payload.into_inner())?;
    let user = state.accounts.authenticate(&credentials).await?;
    session.persist_user(&user)?;
    info!(user_id = %user.id(), "user signed in");
    Ok(web::Json(AccountResponse::from(&user)))
}

/// End the session.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Signed out", body = OkResponse)),
    tags = ["account"],
    operation_id = "logout"
)]
#[post("/logout")]
pub async fn logout(session: SessionContext) -> web::Json<OkResponse> {
    session.purge();
    web::Json(OkResponse { ok: true })
}

/// Describe the signed-in account.
#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "Current account", body = AccountResponse),
        (status = 401, description = "Not signed in", body = Error)
    ),
    tags = ["account"],
    operation_id = "currentUser"
)]
#[get("/user")]
pub async fn current_user(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<AccountResponse>> {
    let user = session.require_user()?;
    let balance = state.accounts.token_balance(user.id).await?;
    Ok(web::Json(AccountResponse {
        ok: true,
        user_id: *user.id.as_uuid(),
        username: user.username.into(),
        tokens: balance,
    }))
}

/// Report the token balance, applying any due refill first.
#[utoipa::path(
    get,
    path = "/api/user/tokens",
    responses(
        (status = 200, description = "Token balance", body = TokensResponse),
        (status = 401, description = "Not signed in", body = Error)
    ),
    tags = ["account"],
    operation_id = "tokenBalance"
)]
#[get("/user/tokens")]
pub async fn tokens(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<TokensResponse>> {
    let user = session.require_user()?;
    let balance = state.accounts.token_balance(user.id).await?;
    Ok(web::Json(TokensResponse { tokens: balance }))
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
