//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.
//!
//! Refills and debits are single conditional `UPDATE` statements, so
//! concurrent requests never double-grant or overdraw. Balances live in an
//! `INTEGER` column and are capped at `i32::MAX`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::Integer;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{NewUser, TokenPolicy, User, UserId, Username};

use super::diesel_error_mapping::{
    DieselFailure, classify_diesel_error, pool_error_message, sql_int,
};
use super::models::{NewUserRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the user repository port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserPersistenceError {
    UserPersistenceError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> UserPersistenceError {
    match classify_diesel_error(&error) {
        DieselFailure::Connection => UserPersistenceError::connection("database connection error"),
        DieselFailure::UniqueViolation => UserPersistenceError::query("unique constraint violated"),
        DieselFailure::ForeignKeyViolation => {
            UserPersistenceError::query("foreign key constraint violated")
        }
        DieselFailure::Query(message) => UserPersistenceError::query(message),
    }
}

fn to_user(row: UserRow) -> Result<User, UserPersistenceError> {
    User::try_from(row).map_err(|err| UserPersistenceError::query(err.to_string()))
}

diesel::define_sql_function! {
    /// PostgreSQL `LEAST` over two integers.
    fn least(a: Integer, b: Integer) -> Integer;
}

type TokenExpression = Box<dyn BoxableExpression<users::table, Pg, SqlType = Integer>>;

/// `tokens + amount`, saturating at `i32::MAX` without overflowing in SQL.
fn saturating_grant(amount: i32) -> TokenExpression {
    Box::new(least(users::tokens, i32::MAX - amount) + amount)
}

fn db_amount(amount: u32) -> Result<i32, UserPersistenceError> {
    sql_int(amount).ok_or_else(|| UserPersistenceError::query(format!("amount {amount} overflows")))
}

async fn load_user(
    conn: &mut AsyncPgConnection,
    id: UserId,
) -> Result<Option<User>, UserPersistenceError> {
    users::table
        .find(id.as_uuid())
        .select(UserRow::as_select())
        .first(conn)
        .await
        .optional()
        .map_err(map_diesel_error)?
        .map(to_user)
        .transpose()
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewUserRow {
            id: *user.id.as_uuid(),
            username: user.username.as_ref(),
            password_hash: user.password_hash.as_str(),
            tokens: db_amount(user.balance.tokens())?,
            last_token_refill: user.balance.last_refill(),
            created_at: user.created_at,
        };

        let inserted = diesel::insert_into(users::table)
            .values(&row)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| match classify_diesel_error(&err) {
                DieselFailure::UniqueViolation => {
                    UserPersistenceError::username_taken(user.username.as_ref())
                }
                _ => map_diesel_error(err),
            })?;
        to_user(inserted)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_user(&mut conn, id).await
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .filter(users::username.eq(username.as_ref()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(to_user)
            .transpose()
    }

    async fn apply_refill(
        &self,
        id: UserId,
        now: DateTime<Utc>,
        policy: TokenPolicy,
    ) -> Result<User, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let amount = db_amount(policy.refill_amount())?;

        let refilled = diesel::update(
            users::table
                .filter(users::id.eq(id.as_uuid()))
                .filter(users::last_token_refill.le(policy.refill_cutoff(now))),
        )
        .set((
            users::tokens.eq(saturating_grant(amount)),
            users::last_token_refill.eq(now),
        ))
        .returning(UserRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;

        match refilled {
            Some(row) => to_user(row),
            None => load_user(&mut conn, id)
                .await?
                .ok_or_else(UserPersistenceError::not_found),
        }
    }

    async fn debit_tokens(&self, id: UserId, amount: u32) -> Result<User, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let cost = db_amount(amount)?;

        let debited = diesel::update(
            users::table
                .filter(users::id.eq(id.as_uuid()))
                .filter(users::tokens.ge(cost)),
        )
        .set(users::tokens.eq(users::tokens - cost))
        .returning(UserRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;

        if let Some(row) = debited {
            return to_user(row);
        }
        match load_user(&mut conn, id).await? {
            Some(user) => Err(UserPersistenceError::insufficient_tokens(user.tokens(), amount)),
            None => Err(UserPersistenceError::not_found()),
        }
    }
}
