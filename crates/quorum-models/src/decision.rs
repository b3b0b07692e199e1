use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Binary call on a market.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Yes,
    No,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Yes => "YES",
            Direction::No => "NO",
        }
    }

    /// Parse the wire form. Only the exact uppercase spellings are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "YES" => Some(Direction::Yes),
            "NO" => Some(Direction::No),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single agent's judgment on a market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDecision {
    pub direction: Direction,
    /// 0 to 100.
    pub confidence: Decimal,
    /// Position size in USD, never negative.
    pub size: Decimal,
    pub reasoning: String,
}

impl AgentDecision {
    /// The fallback used whenever an agent cannot produce a valid decision.
    pub fn conservative(reasoning: impl Into<String>) -> Self {
        Self {
            direction: Direction::No,
            confidence: Decimal::ZERO,
            size: Decimal::ZERO,
            reasoning: reasoning.into(),
        }
    }
}

/// An agent's decision tagged with the agent's name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentOutput {
    pub agent: String,
    pub decision: AgentDecision,
}

impl AgentOutput {
    pub fn new(agent: impl Into<String>, decision: AgentDecision) -> Self {
        Self {
            agent: agent.into(),
            decision,
        }
    }
}

/// The weighted result of one round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsensusDecision {
    pub direction: Direction,
    pub size: Decimal,
    pub reasoning: String,
    /// Accumulated weighted confidence of the YES voters.
    pub yes_confidence: Decimal,
    /// Accumulated weighted confidence of the NO voters.
    pub no_confidence: Decimal,
}
