//! Scripted generation backend for end-to-end tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ports::{GenerationBackend, GenerationBackendError, GenerationRequest};

/// Backend that replays queued outcomes and records every request.
///
/// Once the queue is empty it answers with a small page echoing the prompt.
#[derive(Default)]
pub struct ScriptedGenerationBackend {
    outcomes: Mutex<VecDeque<Result<String, GenerationBackendError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerationBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn push_page(&self, html: impl Into<String>) {
        self.lock_outcomes().push_back(Ok(html.into()));
    }

    /// Queue a failure.
    pub fn push_failure(&self, error: GenerationBackendError) {
        self.lock_outcomes().push_back(Err(error));
    }

    /// Requests seen so far, in call order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(_) => panic!("requests mutex"),
        }
    }

    fn lock_outcomes(
        &self,
    ) -> std::sync::MutexGuard<'_, VecDeque<Result<String, GenerationBackendError>>> {
        match self.outcomes.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("outcomes mutex"),
        }
    }
}

#[async_trait]
impl GenerationBackend for ScriptedGenerationBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationBackendError> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request.clone()),
            Err(_) => panic!("requests mutex"),
        }
        let next = self.lock_outcomes().pop_front();
        next.unwrap_or_else(|| Ok(format!("<main><p>{}</p></main>", request.prompt)))
    }
}
