//! Driven port for the external text-generation service.
//!
//! The backend is opaque: it receives assembled context plus the new prompt
//! and returns text that is expected, but not guaranteed, to be HTML. Calls
//! are slow and fallible; the orchestrator bounds them with a timeout.

use async_trait::async_trait;

use crate::domain::ModelTier;

use super::define_port_error;

define_port_error! {
    /// Errors raised by generation backend adapters.
    pub enum GenerationBackendError {
        /// The request could not be delivered or the connection dropped.
        Transport { message: String } => "generation transport failed: {message}",
        /// The backend did not answer in time.
        Timeout { message: String } => "generation timed out: {message}",
        /// The backend answered with a non-success status.
        Status { status: u16, message: String } =>
            "generation backend returned {status}: {message}",
        /// The response body could not be interpreted.
        InvalidResponse { message: String } => "generation response invalid: {message}",
    }
}

/// Input for one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Requested model tier.
    pub tier: ModelTier,
    /// Project title, for backends that template around it.
    pub title: String,
    /// Prior versions (oldest first) followed by the new prompt.
    pub context: String,
    /// The raw prompt on its own.
    pub prompt: String,
}

/// Port for turning a prompt and history into a page.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Produce page text for `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationBackendError>;
}
