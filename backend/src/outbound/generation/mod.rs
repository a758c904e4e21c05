//! Generation backend adapters.
//!
//! [`HttpGenerationBackend`] talks to an OpenAI-compatible chat endpoint;
//! [`TemplateGenerationBackend`] renders prompts locally when none is set.

mod dto;
mod http_backend;
mod template_backend;

pub use http_backend::{HttpGenerationBackend, ModelNames, SYSTEM_PROMPT};
pub use template_backend::TemplateGenerationBackend;
