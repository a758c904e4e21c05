//! Identity store service: signup, login, lazy refill and debits.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::password::{hash_password, verify_password};
use crate::domain::ports::{AccountService, UserPersistenceError, UserRepository};
use crate::domain::{
    Credentials, CredentialsValidationError, Error, NewUser, TokenBalance, TokenPolicy, User,
    UserId, Username,
};

pub(crate) fn map_user_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserPersistenceError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserPersistenceError::UsernameTaken { username } => {
            Error::username_taken(format!("username '{username}' is already taken"))
        }
        UserPersistenceError::NotFound => Error::not_found("user not found"),
        UserPersistenceError::InsufficientTokens {
            available,
            required,
        } => Error::insufficient_tokens("not enough tokens for this generation")
            .with_details(json!({ "tokens": available, "required": required })),
    }
}

pub(crate) fn map_credentials_error(error: &CredentialsValidationError) -> Error {
    let details = json!({ "field": error.field() });
    match error {
        CredentialsValidationError::EmptyUsername | CredentialsValidationError::EmptyPassword => {
            Error::missing_fields(error.to_string()).with_details(details)
        }
        CredentialsValidationError::PasswordTooShort { .. }
        | CredentialsValidationError::PasswordTooLong { .. } => {
            Error::invalid_request(error.to_string()).with_details(details)
        }
    }
}

/// Identity service backed by a [`UserRepository`].
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
    policy: TokenPolicy,
}

impl IdentityService {
    /// Create a service over `users` with the given quota rules.
    pub fn new(users: Arc<dyn UserRepository>, clock: Arc<dyn Clock>, policy: TokenPolicy) -> Self {
        Self {
            users,
            clock,
            policy,
        }
    }

    /// Apply a due refill to `user_id` and return the fresh record.
    pub async fn refill_if_due(&self, user_id: UserId) -> Result<User, Error> {
        let now = self.clock.utc();
        let user = self
            .users
            .apply_refill(user_id, now, self.policy)
            .await
            .map_err(map_user_error)?;
        if user.balance().last_refill() == now {
            debug!(%user_id, tokens = user.tokens(), "token refill granted");
        }
        Ok(user)
    }

    /// Spend `amount` tokens atomically.
    pub async fn debit(&self, user_id: UserId, amount: u32) -> Result<User, Error> {
        self.users
            .debit_tokens(user_id, amount)
            .await
            .map_err(map_user_error)
    }
}

#[async_trait]
impl AccountService for IdentityService {
    async fn signup(&self, credentials: &Credentials) -> Result<User, Error> {
        credentials
            .check_new_password()
            .map_err(|err| map_credentials_error(&err))?;
        let username = Username::new(credentials.username()).map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({ "field": "username" }))
        })?;
        let password_hash = hash_password(credentials.password())
            .map_err(|err| Error::internal(err.to_string()))?;
        let now = self.clock.utc();

        let user = self
            .users
            .create(&NewUser {
                id: UserId::random(),
                username,
                password_hash,
                balance: TokenBalance::new(self.policy.initial_tokens(), now),
                created_at: now,
            })
            .await
            .map_err(map_user_error)?;
        info!(user_id = %user.id(), username = %user.username(), "user signed up");
        Ok(user)
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<User, Error> {
        let rejected = || Error::invalid_credentials("invalid username or password");
        let Ok(username) = Username::new(credentials.username()) else {
            return Err(rejected());
        };
        let Some(user) = self
            .users
            .find_by_username(&username)
            .await
            .map_err(map_user_error)?
        else {
            return Err(rejected());
        };
        if !verify_password(credentials.password(), user.password_hash()) {
            return Err(rejected());
        }
        self.refill_if_due(user.id()).await
    }

    async fn token_balance(&self, user_id: UserId) -> Result<u32, Error> {
        self.refill_if_due(user_id).await.map(|user| user.tokens())
    }
}

#[cfg(test)]
#[path = "identity_service_tests.rs"]
mod tests;
