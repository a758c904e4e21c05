//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`AccountService`, `GenerationCommand`, `ProjectCommand`,
//! `CatalogQuery`) are called by inbound adapters. Driven ports
//! (`UserRepository`, `ProjectRepository`, `GenerationBackend`, `PageMirror`)
//! are implemented by outbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod account_service;
mod catalog_query;
mod generation_backend;
mod generation_command;
mod page_mirror;
mod project_command;
mod project_repository;
mod user_repository;

#[cfg(test)]
pub use account_service::MockAccountService;
pub use account_service::AccountService;
#[cfg(test)]
pub use catalog_query::MockCatalogQuery;
pub use catalog_query::{CatalogQuery, ServedPage};
#[cfg(test)]
pub use generation_backend::MockGenerationBackend;
pub use generation_backend::{GenerationBackend, GenerationBackendError, GenerationRequest};
#[cfg(test)]
pub use generation_command::MockGenerationCommand;
pub use generation_command::{
    GenerateRequest, GenerationCommand, GenerationReceipt, GenerationTarget,
};
#[cfg(test)]
pub use page_mirror::MockPageMirror;
pub use page_mirror::{DisabledPageMirror, PageMirror, PageMirrorError};
#[cfg(test)]
pub use project_command::MockProjectCommand;
pub use project_command::ProjectCommand;
#[cfg(test)]
pub use project_repository::MockProjectRepository;
pub use project_repository::{
    CommitTarget, CommittedVersion, GenerationCommit, ProjectPersistenceError, ProjectRepository,
};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserPersistenceError, UserRepository};
