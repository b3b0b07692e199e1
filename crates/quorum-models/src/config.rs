use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level configuration for quorum. Every section is optional in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuorumConfig {
    pub agents: AgentsConfig,
    pub openrouter: OpenRouterConfig,
    pub consensus: ConsensusConfig,
    pub store: StoreConfig,
}

/// Which text-generation service the agents talk to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    OpenRouter,
    ClaudeCli,
}

impl BackendKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            BackendKind::OpenRouter => "google/gemini-2.0-flash-lite-001",
            BackendKind::ClaudeCli => "claude-3-5-haiku-latest",
        }
    }
}

/// Configuration for the agent roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentsConfig {
    pub backend: BackendKind,
    /// Model override for every persona. Falls back to the backend's default.
    pub model: Option<String>,
    /// Deadline for a single generation call, in seconds.
    pub timeout_seconds: u64,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            model: None,
            timeout_seconds: 45,
        }
    }
}

impl AgentsConfig {
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.backend.default_model().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenRouterConfig {
    pub api_base: String,
    /// Falls back to the `OPENROUTER_API_KEY` environment variable.
    pub api_key: Option<String>,
    /// Sent as `HTTP-Referer` for OpenRouter attribution.
    pub referer: Option<String>,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_base: "https://openrouter.ai/api/v1".to_string(),
            api_key: None,
            referer: None,
        }
    }
}

/// Relative influence of each persona in the consensus.
///
/// Supplying `weights` replaces the whole table, it is not merged with the
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsensusConfig {
    pub weights: BTreeMap<String, Decimal>,
    /// Weight for agents missing from `weights`.
    pub default_weight: Decimal,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        let weights = [
            ("FundamentalAgent", Decimal::new(25, 2)),
            ("QuantAgent", Decimal::new(30, 2)),
            ("SentimentAgent", Decimal::new(10, 2)),
            ("RiskAgent", Decimal::new(25, 2)),
            ("StrategistAgent", Decimal::new(10, 2)),
        ]
        .into_iter()
        .map(|(name, weight)| (name.to_string(), weight))
        .collect();

        Self {
            weights,
            default_weight: Decimal::new(10, 2),
        }
    }
}

/// Configuration for the decision log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub enabled: bool,
    pub sqlite_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sqlite_path: "data/quorum.db".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn roundtrip_quorum_config() {
        let config = QuorumConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: QuorumConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn default_weights_cover_roster() {
        let consensus = ConsensusConfig::default();
        assert_eq!(consensus.weights.len(), 5);
        assert_eq!(consensus.weights["QuantAgent"], dec!(0.30));
        assert_eq!(consensus.weights["SentimentAgent"], dec!(0.10));
        assert_eq!(consensus.default_weight, dec!(0.10));
    }

    #[test]
    fn resolved_model_falls_back_to_backend() {
        let mut agents = AgentsConfig::default();
        assert_eq!(agents.resolved_model(), "google/gemini-2.0-flash-lite-001");

        agents.backend = BackendKind::ClaudeCli;
        assert_eq!(agents.resolved_model(), "claude-3-5-haiku-latest");

        agents.model = Some("anthropic/claude-3.5-sonnet".to_string());
        assert_eq!(agents.resolved_model(), "anthropic/claude-3.5-sonnet");
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[agents]
backend = "claude_cli"
timeout_seconds = 20

[consensus]
default_weight = 0.05

[consensus.weights]
QuantAgent = 0.5
RiskAgent = 0.5

[store]
sqlite_path = "/tmp/quorum_test.db"
"#;

        let config: QuorumConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agents.backend, BackendKind::ClaudeCli);
        assert_eq!(config.agents.timeout_seconds, 20);
        assert_eq!(config.agents.model, None);
        assert_eq!(config.consensus.weights.len(), 2);
        assert_eq!(config.consensus.weights["QuantAgent"], dec!(0.5));
        assert_eq!(config.consensus.default_weight, dec!(0.05));
        assert_eq!(config.store.sqlite_path, "/tmp/quorum_test.db");
        assert!(config.store.enabled);
        assert_eq!(config.openrouter, OpenRouterConfig::default());
    }

    #[test]
    fn empty_toml_is_default() {
        let config: QuorumConfig = toml::from_str("").unwrap();
        assert_eq!(config, QuorumConfig::default());
    }
}
