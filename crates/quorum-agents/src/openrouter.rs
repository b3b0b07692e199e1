//! OpenRouter chat-completions backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use quorum_models::config::OpenRouterConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AgentError;
use crate::generator::TextGenerator;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// OpenRouter text generator. The API key never appears in logs or debug output.
pub struct OpenRouterGenerator {
    api_key: SecretString,
    api_base: String,
    referer: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenRouterGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterGenerator")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("referer", &self.referer)
            .finish()
    }
}

impl OpenRouterGenerator {
    pub fn new(config: &OpenRouterConfig, timeout: Duration) -> Result<Self, AgentError> {
        let api_key = resolve_api_key(config.api_key.as_deref(), std::env::var(API_KEY_ENV).ok())
            .ok_or_else(|| {
                AgentError::Config(format!(
                    "OpenRouter API key not found. Set {API_KEY_ENV} or openrouter.api_key"
                ))
            })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            referer: config.referer.clone(),
            client,
        })
    }

    fn build_request(&self, prompt: &str, model: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        }
    }
}

/// The configured key wins over the environment. Blank values count as unset.
fn resolve_api_key(configured: Option<&str>, from_env: Option<String>) -> Option<String> {
    configured
        .map(str::to_string)
        .filter(|k| !k.trim().is_empty())
        .or_else(|| from_env.filter(|k| !k.trim().is_empty()))
}

/// Pull the reply text out of a decoded completion body.
fn completion_content(body: ChatCompletionResponse) -> Result<String, AgentError> {
    if let Some(err) = body.error {
        return Err(AgentError::Http(format!("OpenRouter error: {}", err.message)));
    }
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AgentError::Http("No content in OpenRouter response".to_string()))
}

#[async_trait]
impl TextGenerator for OpenRouterGenerator {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, AgentError> {
        let start = Instant::now();
        let url = format!("{}/chat/completions", self.api_base);
        let request = self.build_request(prompt, model);

        let mut builder = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("X-Title", "quorum")
            .json(&request);
        if let Some(referer) = &self.referer {
            builder = builder.header("HTTP-Referer", referer);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AgentError::Http(format!("OpenRouter request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Http(format!(
                "OpenRouter API error ({status}): {body}"
            )));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Http(format!("Failed to decode OpenRouter response: {e}")))?;

        debug!(
            model = %model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "OpenRouter reply received"
        );
        completion_content(body)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
