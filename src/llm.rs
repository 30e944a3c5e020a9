//! Completion service abstraction
//!
//! One HTTP gateway serves every model; the model id travels in the request.

mod completion;
mod error;
mod models;
mod types;

pub use completion::CompletionService;
pub use error::{LlmError, LlmErrorKind};
pub use models::{all_models, display_name, find_model, DEFAULT_MODEL_ID};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion backends
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Where requests go, for logs
    fn endpoint(&self) -> &str;
}

/// Logging wrapper for completion services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %request.model,
                    messages = request.messages.len(),
                    images = request.messages.iter().filter(|m| m.has_image()).count(),
                    web_search = request.web_search,
                    duration_ms = %duration.as_millis(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    reply_chars = response.text.chars().count(),
                    "Completion request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %request.model,
                    endpoint = %self.inner.endpoint(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    transient = e.kind.is_transient(),
                    "Completion request failed"
                );
            }
        }

        result
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}
