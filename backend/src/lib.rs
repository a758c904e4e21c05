//! Siteulation backend: prompt-to-website generation with owner-scoped
//! projects, immutable versions and a public catalog.
//!
//! The crate follows a hexagonal layout. [`domain`] holds the model, ports
//! and services; [`inbound`] adapts HTTP onto the driving ports; [`outbound`]
//! implements the driven ports over PostgreSQL, memory, the generation
//! backend and the filesystem mirror.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
