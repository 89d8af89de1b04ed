//! Completion model adapter
//!
//! Bridges the `LlmBackend` trait to the core `CompletionModel` trait, so
//! any backend can drive the natural-language strategy.

use async_trait::async_trait;
use std::sync::Arc;

use lead_qualifier_core::{Completion, CompletionModel, Result, TranscriptEntry};

use crate::backend::LlmBackend;
use crate::prompt::{build_messages, extract_json_object};

/// Wraps an `LlmBackend` to implement `CompletionModel`.
///
/// # Example
///
/// ```ignore
/// let backend = OpenAIBackend::new(OpenAIConfig::from(&settings.llm))?;
/// let model: Arc<dyn CompletionModel> = Arc::new(CompletionAdapter::new(backend));
/// ```
pub struct CompletionAdapter {
    backend: Arc<dyn LlmBackend>,
    model_name: String,
}

impl CompletionAdapter {
    pub fn new<B: LlmBackend + 'static>(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn LlmBackend>) -> Self {
        let model_name = backend.model_name().to_string();
        Self {
            backend,
            model_name,
        }
    }
}

#[async_trait]
impl CompletionModel for CompletionAdapter {
    async fn complete(&self, prompt: &str, history: &[TranscriptEntry]) -> Result<Completion> {
        let messages = build_messages(prompt, history);
        let result = self.backend.generate(&messages).await?;

        let structured = extract_json_object(&result.text);
        Ok(Completion {
            text: result.text,
            structured,
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
