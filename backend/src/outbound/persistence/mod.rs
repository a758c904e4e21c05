//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the user and project repository ports backed
//! by PostgreSQL through `diesel-async` and a `bb8` pool.
//!
//! - **Thin adapters**: repositories translate between row structs and
//!   domain types and hold no business rules.
//! - **Internal models**: `models.rs` and `schema.rs` never leak into the
//!   domain.
//! - **Atomic writes**: version allocation, debits and generation commits
//!   run as single statements or single transactions.
//!
//! # Example
//!
//! ```no_run
//! use siteulation::outbound::persistence::{
//!     DbPool, DieselProjectRepository, DieselUserRepository, PoolConfig,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/siteulation")).await?;
//! let users = DieselUserRepository::new(pool.clone());
//! let projects = DieselProjectRepository::new(pool);
//! # let _ = (users, projects);
//! # Ok(())
//! # }
//! ```

mod diesel_error_mapping;
mod diesel_project_repository;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_project_repository::DieselProjectRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DEFAULT_MAX_CONNECTIONS, DbPool, PoolConfig, PoolError};
