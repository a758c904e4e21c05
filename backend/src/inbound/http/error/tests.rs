//! Tests for HTTP error mapping.

use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn internal_error() -> Error {
    Error::internal("connection string leaked: postgres://secret")
        .with_trace_id(TRACE_ID)
        .with_details(json!({"secret": "x"}))
}

async fn render(error: Error) -> (StatusCode, Option<String>, Error) {
    let response = ResponseError::error_response(&error);
    let status = response.status();
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let payload = serde_json::from_slice(&bytes).expect("error JSON decodes");
    (status, header, payload)
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::missing_fields("prompt"), StatusCode::BAD_REQUEST)]
#[case(Error::invalid_slug("x"), StatusCode::BAD_REQUEST)]
#[case(Error::insufficient_tokens("broke"), StatusCode::BAD_REQUEST)]
#[case(Error::auth_required("login"), StatusCode::UNAUTHORIZED)]
#[case(Error::invalid_credentials("nope"), StatusCode::UNAUTHORIZED)]
#[case(Error::forbidden("mine"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("gone"), StatusCode::NOT_FOUND)]
#[case(Error::slug_exists("dup"), StatusCode::CONFLICT)]
#[case(Error::username_taken("dup"), StatusCode::CONFLICT)]
#[case(Error::generation_failed("model down"), StatusCode::INTERNAL_SERVER_ERROR)]
#[case(Error::service_unavailable("db down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] expected: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), expected);
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted_but_keep_trace_id(internal_error: Error) {
    let (status, header, payload) = render(internal_error).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header.as_deref(), Some(TRACE_ID));
    assert_eq!(payload.code(), ErrorCode::InternalError);
    assert_eq!(payload.message(), "Internal server error");
    assert_eq!(payload.trace_id(), Some(TRACE_ID));
    assert!(payload.details().is_none());
}

#[rstest]
#[actix_web::test]
async fn generation_failures_keep_their_excerpt() {
    let error = Error::generation_failed("generation failed: upstream returned 502")
        .with_details(json!({"stage": "generating"}));

    let (status, header, payload) = render(error).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(header.is_none());
    assert_eq!(payload.code(), ErrorCode::GenerationFailed);
    assert_eq!(payload.message(), "generation failed: upstream returned 502");
    assert_eq!(payload.details(), Some(&json!({"stage": "generating"})));
}

#[rstest]
#[actix_web::test]
async fn client_errors_pass_details_through() {
    let error = Error::insufficient_tokens("not enough tokens")
        .with_details(json!({"tokens": 1, "required": 2}));

    let (status, _, payload) = render(error).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload.details(), Some(&json!({"tokens": 1, "required": 2})));
}

#[test]
fn from_actix_error_is_redacted_internal_error() {
    let err: Error = actix_web::error::ErrorBadRequest("boom").into();

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(err.message(), "Internal server error");
    assert_eq!(err.details(), None);
}
