//! Driving port for signup, login and balance queries.
//!
//! Inbound adapters call this without knowing how users are stored, so HTTP
//! handler tests can substitute a mock.

use async_trait::async_trait;

use crate::domain::{Credentials, Error, User, UserId};

/// Account use-cases exposed to inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Register a new user with the initial token grant.
    async fn signup(&self, credentials: &Credentials) -> Result<User, Error>;

    /// Verify credentials, applying any due refill on success.
    async fn authenticate(&self, credentials: &Credentials) -> Result<User, Error>;

    /// Current balance after applying any due refill.
    async fn token_balance(&self, user_id: UserId) -> Result<u32, Error>;
}
