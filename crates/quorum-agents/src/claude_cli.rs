use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::generator::TextGenerator;

const JSON_ONLY_SYSTEM_PROMPT: &str = "You are a trading committee member. \
     Respond ONLY with a single JSON object and no other text.";

/// Invoke the `claude` CLI with a system prompt and user prompt.
/// Returns the raw stdout text.
pub async fn invoke_claude(
    binary: &str,
    system_prompt: &str,
    user_prompt: &str,
    model: &str,
    timeout: Duration,
) -> Result<String, AgentError> {
    debug!(model = %model, "Invoking claude CLI");

    let result = tokio::time::timeout(timeout, async {
        Command::new(binary)
            .args([
                "-p",
                user_prompt,
                "--system-prompt",
                system_prompt,
                "--model",
                model,
                "--output-format",
                "text",
            ])
            .kill_on_drop(true)
            .output()
            .await
    })
    .await
    .map_err(|_| AgentError::Timeout(timeout.as_millis() as u64))?
    .map_err(|e| AgentError::Cli(format!("Failed to spawn {binary}: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        warn!(status = %result.status, stderr = %stderr, "Claude CLI failed");
        return Err(AgentError::Cli(format!(
            "{binary} exited {}: {}",
            result.status, stderr
        )));
    }

    let stdout = String::from_utf8_lossy(&result.stdout).to_string();
    if stdout.trim().is_empty() {
        return Err(AgentError::Cli("Claude returned empty response".to_string()));
    }

    Ok(stdout)
}

/// Check if the `claude` CLI is available on the system.
pub async fn check_cli_available() -> bool {
    match Command::new("claude").arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Text generator backed by the local `claude` CLI.
#[derive(Debug, Clone)]
pub struct ClaudeCliGenerator {
    binary: String,
    timeout: Duration,
}

impl ClaudeCliGenerator {
    pub fn new(timeout: Duration) -> Self {
        Self::with_binary("claude", timeout)
    }

    pub fn with_binary(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl TextGenerator for ClaudeCliGenerator {
    fn name(&self) -> &str {
        "claude_cli"
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, AgentError> {
        invoke_claude(
            &self.binary,
            JSON_ONLY_SYSTEM_PROMPT,
            prompt,
            model,
            self.timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_cli_error() {
        let generator = ClaudeCliGenerator::with_binary(
            "quorum-no-such-claude-binary",
            Duration::from_secs(5),
        );
        let err = generator
            .generate("ping", "claude-3-5-haiku-latest")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Cli(msg) if msg.contains("Failed to spawn")));
    }

    #[test]
    fn default_binary_is_claude() {
        let generator = ClaudeCliGenerator::new(Duration::from_secs(45));
        assert_eq!(generator.binary, "claude");
        assert_eq!(generator.name(), "claude_cli");
    }
}
