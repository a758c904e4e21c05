//! Port abstraction for persisting users and their token balances.
//!
//! Balance mutations are single conditional updates so concurrent requests
//! from one user cannot overdraw or double-grant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{NewUser, TokenPolicy, User, UserId, Username};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// Another account already uses this username.
        UsernameTaken { username: String } => "username '{username}' is already taken",
        /// No user with the given id exists.
        NotFound => "user not found",
        /// The balance does not cover the requested debit.
        InsufficientTokens { available: u32, required: u32 } =>
            "insufficient tokens: {available} available, {required} required",
    }
}

/// Port for reading and mutating user records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user, rejecting duplicate usernames.
    async fn create(&self, user: &NewUser) -> Result<User, UserPersistenceError>;

    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Fetch a user by username.
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserPersistenceError>;

    /// Grant one refill if due at `now`, returning the resulting user.
    ///
    /// The check and the grant are one atomic step; a user refilled by a
    /// concurrent request is returned unchanged.
    async fn apply_refill(
        &self,
        id: UserId,
        now: DateTime<Utc>,
        policy: TokenPolicy,
    ) -> Result<User, UserPersistenceError>;

    /// Decrement the balance by `amount` only if it stays non-negative.
    async fn debit_tokens(&self, id: UserId, amount: u32) -> Result<User, UserPersistenceError>;
}
