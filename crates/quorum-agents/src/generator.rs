use async_trait::async_trait;

use crate::error::AgentError;

/// A hosted text-generation service that answers a prompt with structured
/// (JSON) text. Mockable for testing.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Submit `prompt` to `model` and return the raw reply text.
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, AgentError>;
}
