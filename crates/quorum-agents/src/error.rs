use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Agent response parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Validation(String),

    #[error("Generation timed out after {0} ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
