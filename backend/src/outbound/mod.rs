//! Outbound adapters implementing domain ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel and diesel-async
//! - **memory**: mutex-guarded in-process store for tests and local runs
//! - **generation**: HTTP and template generation backends
//! - **mirror**: `cap_std` filesystem copy of served pages
//!
//! Adapters translate between domain types and infrastructure representations
//! and contain no business rules.

pub mod generation;
pub mod memory;
pub mod mirror;
pub mod persistence;
