//! Shared HTTP adapter state.
//!
//! Handlers receive this via `web::Data` and depend only on driving ports, so
//! they can be exercised with mocks and no I/O.

use std::sync::Arc;

use crate::domain::ports::{AccountService, CatalogQuery, GenerationCommand, ProjectCommand};

/// Parameter object bundling the port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub accounts: Arc<dyn AccountService>,
    pub generation: Arc<dyn GenerationCommand>,
    pub projects: Arc<dyn ProjectCommand>,
    pub catalog: Arc<dyn CatalogQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<dyn AccountService>,
    pub generation: Arc<dyn GenerationCommand>,
    pub projects: Arc<dyn ProjectCommand>,
    pub catalog: Arc<dyn CatalogQuery>,
}

impl HttpState {
    /// Build state from the supplied ports.
    #[must_use]
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            accounts,
            generation,
            projects,
            catalog,
        } = ports;
        Self {
            accounts,
            generation,
            projects,
            catalog,
        }
    }
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}
