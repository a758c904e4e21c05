//! Tests for the identity service.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ErrorCode;
use crate::domain::password::{PasswordHash, hash_password};
use crate::domain::ports::MockUserRepository;
use crate::test_support::MutableClock;

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn clock_at(now: DateTime<Utc>) -> Arc<dyn Clock> {
    Arc::new(MutableClock::new(now))
}

fn stored_user(password: &str, tokens: u32, now: DateTime<Utc>) -> User {
    User::new(
        UserId::random(),
        Username::new("alice").expect("valid username"),
        hash_password(password).expect("hash password"),
        TokenBalance::new(tokens, now),
        now,
    )
}

fn service(repo: MockUserRepository, now: DateTime<Utc>) -> IdentityService {
    IdentityService::new(Arc::new(repo), clock_at(now), TokenPolicy::default())
}

#[rstest]
#[tokio::test]
async fn signup_grants_initial_tokens_and_hashes_password(now: DateTime<Utc>) {
    let mut repo = MockUserRepository::new();
    repo.expect_create()
        .times(1)
        .returning(|new_user| Ok(User::from(new_user.clone())));

    let creds = Credentials::try_from_parts("alice", "hunter22").expect("credentials");
    let user = service(repo, now).signup(&creds).await.expect("signup succeeds");

    assert_eq!(user.username().as_ref(), "alice");
    assert_eq!(user.tokens(), 16);
    assert_eq!(user.balance().last_refill(), now);
    assert!(verify_password("hunter22", user.password_hash()));
}

#[rstest]
#[tokio::test]
async fn signup_maps_duplicate_username_to_conflict(now: DateTime<Utc>) {
    let mut repo = MockUserRepository::new();
    repo.expect_create()
        .times(1)
        .returning(|_| Err(UserPersistenceError::username_taken("alice")));

    let creds = Credentials::try_from_parts("alice", "hunter22").expect("credentials");
    let err = service(repo, now).signup(&creds).await.expect_err("duplicate");
    assert_eq!(err.code(), ErrorCode::UsernameTaken);
}

#[rstest]
#[case("alice", "short", ErrorCode::InvalidRequest)]
#[case("a!", "hunter22", ErrorCode::InvalidRequest)]
#[case("this_name_is_way_too_long", "hunter22", ErrorCode::InvalidRequest)]
#[tokio::test]
async fn signup_rejects_invalid_input_before_touching_store(
    now: DateTime<Utc>,
    #[case] username: &str,
    #[case] password: &str,
    #[case] expected: ErrorCode,
) {
    let repo = MockUserRepository::new();
    let creds = Credentials::try_from_parts(username, password).expect("credentials");
    let err = service(repo, now).signup(&creds).await.expect_err("invalid");
    assert_eq!(err.code(), expected);
}

#[rstest]
#[tokio::test]
async fn authenticate_applies_refill_on_success(now: DateTime<Utc>) {
    let user = stored_user("hunter22", 3, now);
    let refilled = User::new(
        user.id(),
        user.username().clone(),
        user.password_hash().clone(),
        TokenBalance::new(19, now),
        user.created_at(),
    );

    let mut repo = MockUserRepository::new();
    let found = user.clone();
    repo.expect_find_by_username()
        .times(1)
        .returning(move |_| Ok(Some(found.clone())));
    let expected_id = user.id();
    repo.expect_apply_refill()
        .withf(move |id, at, _| *id == expected_id && *at == now)
        .times(1)
        .returning(move |_, _, _| Ok(refilled.clone()));

    let creds = Credentials::try_from_parts("alice", "hunter22").expect("credentials");
    let authed = service(repo, now)
        .authenticate(&creds)
        .await
        .expect("login succeeds");
    assert_eq!(authed.tokens(), 19);
}

#[rstest]
#[tokio::test]
async fn authenticate_rejects_wrong_password(now: DateTime<Utc>) {
    let user = stored_user("hunter22", 3, now);
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_username()
        .returning(move |_| Ok(Some(user.clone())));
    repo.expect_apply_refill().never();

    let creds = Credentials::try_from_parts("alice", "wrong-password").expect("credentials");
    let err = service(repo, now)
        .authenticate(&creds)
        .await
        .expect_err("wrong password");
    assert_eq!(err.code(), ErrorCode::InvalidCredentials);
}

#[rstest]
#[tokio::test]
async fn authenticate_hides_unknown_users(now: DateTime<Utc>) {
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_username().returning(|_| Ok(None));

    let creds = Credentials::try_from_parts("nobody", "hunter22").expect("credentials");
    let err = service(repo, now)
        .authenticate(&creds)
        .await
        .expect_err("unknown user");
    assert_eq!(err.code(), ErrorCode::InvalidCredentials);
    assert_eq!(err.message(), "invalid username or password");
}

#[rstest]
#[tokio::test]
async fn malformed_stored_hash_never_authenticates(now: DateTime<Utc>) {
    let user = User::new(
        UserId::random(),
        Username::new("alice").expect("valid username"),
        PasswordHash::from_stored("garbage"),
        TokenBalance::new(3, now),
        now,
    );
    let mut repo = MockUserRepository::new();
    repo.expect_find_by_username()
        .returning(move |_| Ok(Some(user.clone())));

    let creds = Credentials::try_from_parts("alice", "garbage").expect("credentials");
    let err = service(repo, now)
        .authenticate(&creds)
        .await
        .expect_err("bad hash");
    assert_eq!(err.code(), ErrorCode::InvalidCredentials);
}

#[rstest]
#[tokio::test]
async fn token_balance_reports_refilled_value(now: DateTime<Utc>) {
    let user = stored_user("hunter22", 21, now);
    let mut repo = MockUserRepository::new();
    repo.expect_apply_refill()
        .times(1)
        .returning(move |_, _, _| Ok(user.clone()));

    let tokens = service(repo, now)
        .token_balance(UserId::random())
        .await
        .expect("balance");
    assert_eq!(tokens, 21);
}

#[rstest]
#[case(UserPersistenceError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(UserPersistenceError::query("syntax"), ErrorCode::InternalError)]
#[case(UserPersistenceError::not_found(), ErrorCode::NotFound)]
#[case(UserPersistenceError::insufficient_tokens(1_u32, 2_u32), ErrorCode::InsufficientTokens)]
#[tokio::test]
async fn debit_maps_repository_errors(
    now: DateTime<Utc>,
    #[case] failure: UserPersistenceError,
    #[case] expected: ErrorCode,
) {
    let mut repo = MockUserRepository::new();
    repo.expect_debit_tokens()
        .times(1)
        .return_once(move |_, _| Err(failure));

    let err = service(repo, now)
        .debit(UserId::random(), 2)
        .await
        .expect_err("debit fails");
    assert_eq!(err.code(), expected);
}
