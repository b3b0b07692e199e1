//! Quorum - a five-persona trading committee
//!
//! Runs five LLM-backed analyst personas over one market concurrently,
//! combines their votes with a weighted consensus, and logs each round to a
//! local SQLite decision log.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use quorum::models::{DecisionRequest, MarketData, AgentContext};
//! use quorum::agents::{AgentRunner, Consensus, ConsensusWeights};
//! use quorum::store::{DecisionLogger, SqliteStore};
//! use quorum::models::config::QuorumConfig;
//! ```

pub mod service;

pub use quorum_agents as agents;
pub use quorum_models as models;
pub use quorum_store as store;

pub use service::{DecisionService, ServiceError};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use quorum_agents::{
    AgentRunner, ClaudeCliGenerator, Consensus, ConsensusWeights, OpenRouterGenerator,
    TextGenerator,
};
use quorum_models::config::{BackendKind, QuorumConfig, StoreConfig};
use quorum_store::{DecisionLogger, SqliteStore};

/// Build the configured text-generation backend.
pub fn build_generator(config: &QuorumConfig) -> Result<Arc<dyn TextGenerator>, anyhow::Error> {
    let timeout = Duration::from_secs(config.agents.timeout_seconds);
    let generator: Arc<dyn TextGenerator> = match config.agents.backend {
        BackendKind::OpenRouter => Arc::new(
            OpenRouterGenerator::new(&config.openrouter, timeout)
                .context("Failed to configure OpenRouter backend")?,
        ),
        BackendKind::ClaudeCli => Arc::new(ClaudeCliGenerator::new(timeout)),
    };
    Ok(generator)
}

/// Build an AgentRunner from configuration.
pub fn build_runner(config: &QuorumConfig) -> Result<AgentRunner, anyhow::Error> {
    Ok(AgentRunner::new(
        build_generator(config)?,
        config.agents.resolved_model(),
        Duration::from_secs(config.agents.timeout_seconds),
    ))
}

/// Open the decision log, creating its directory if needed. `None` when
/// logging is disabled.
pub fn build_logger(config: &StoreConfig) -> Result<Option<Arc<DecisionLogger>>, anyhow::Error> {
    if !config.enabled {
        return Ok(None);
    }
    if let Some(parent) = Path::new(&config.sqlite_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let store = SqliteStore::open(&config.sqlite_path)
        .with_context(|| format!("Failed to open decision log: {}", config.sqlite_path))?;
    Ok(Some(Arc::new(DecisionLogger::new(store))))
}

/// Build a DecisionService from configuration.
pub fn build_service(config: &QuorumConfig) -> Result<DecisionService, anyhow::Error> {
    let runner = build_runner(config)?;
    let weights = ConsensusWeights::from_config(&config.consensus)
        .context("Invalid consensus configuration")?;
    let consensus = Consensus::new(weights);
    let service = DecisionService::new(runner, consensus);
    Ok(match build_logger(&config.store)? {
        Some(logger) => service.with_logger(logger),
        None => service,
    })
}
