//! Completion capability

use async_trait::async_trait;
use serde_json::Value;

use crate::conversation::TranscriptEntry;
use crate::Result;

/// Result of a completion request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    /// Parsed JSON object found in the reply, if any
    pub structured: Option<Value>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: None,
        }
    }
}

/// Chat-completion backend
///
/// # Example
///
/// ```ignore
/// let model: Arc<dyn CompletionModel> = Arc::new(OpenAIBackend::new(config)?);
/// let reply = model.complete(&prompt, &context.transcript).await?;
/// ```
#[async_trait]
pub trait CompletionModel: Send + Sync + 'static {
    /// Generate a reply for `prompt` given the prior conversation
    async fn complete(&self, prompt: &str, history: &[TranscriptEntry]) -> Result<Completion>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}
