//! Driven port for the best-effort filesystem copy of served pages.
//!
//! The store is authoritative. A mirror is written after a successful commit
//! and only read when the store cannot be reached.

use async_trait::async_trait;

use crate::domain::{Slug, Username};

use super::define_port_error;

define_port_error! {
    /// Errors raised by page mirror adapters.
    pub enum PageMirrorError {
        /// Reading or writing the mirrored copy failed.
        Io { message: String } => "page mirror i/o failed: {message}",
    }
}

/// Port for storing and reading mirrored pages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageMirror: Send + Sync {
    /// Replace the mirrored copy of `/@{owner}/{slug}`.
    async fn store(&self, owner: &Username, slug: &Slug, html: &str) -> Result<(), PageMirrorError>;

    /// Read the mirrored copy, if one exists.
    async fn load(&self, owner: &Username, slug: &Slug) -> Result<Option<String>, PageMirrorError>;
}

/// Mirror used when no mirror directory is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPageMirror;

#[async_trait]
impl PageMirror for DisabledPageMirror {
    async fn store(&self, _owner: &Username, _slug: &Slug, _html: &str) -> Result<(), PageMirrorError> {
        Ok(())
    }

    async fn load(&self, _owner: &Username, _slug: &Slug) -> Result<Option<String>, PageMirrorError> {
        Ok(None)
    }
}
