use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::Direction;

/// Schema of the decision log. Created on open by the store.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS decisions (
///     id                  TEXT PRIMARY KEY,
///     created_at          TEXT NOT NULL,
///     market_id           TEXT NOT NULL,
///     market_question     TEXT,
///     final_direction     TEXT NOT NULL,
///     final_size          TEXT NOT NULL,
///     agent_outputs       TEXT NOT NULL,
///     consensus_reasoning TEXT,
///     raw_market_data     TEXT
/// );
/// ```
///
/// `trade_signals` references a decision by id; `market_snapshots` is keyed
/// by market id only.
pub const DECISION_LOG_DDL: &str = "\
CREATE TABLE IF NOT EXISTS decisions (
    id                  TEXT PRIMARY KEY,
    created_at          TEXT NOT NULL,
    market_id           TEXT NOT NULL,
    market_question     TEXT,
    final_direction     TEXT NOT NULL,
    final_size          TEXT NOT NULL,
    agent_outputs       TEXT NOT NULL,
    consensus_reasoning TEXT,
    raw_market_data     TEXT
);
CREATE TABLE IF NOT EXISTS trade_signals (
    id                  TEXT PRIMARY KEY,
    created_at          TEXT NOT NULL,
    decision_id         TEXT NOT NULL REFERENCES decisions(id),
    market_id           TEXT NOT NULL,
    signal              TEXT NOT NULL,
    size_usd            TEXT NOT NULL,
    solana_tx_hash      TEXT,
    status              TEXT NOT NULL,
    execution_reasoning TEXT
);
CREATE TABLE IF NOT EXISTS market_snapshots (
    id          TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL,
    market_id   TEXT NOT NULL,
    source      TEXT NOT NULL,
    snapshot    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_decisions_created ON decisions(created_at);
CREATE INDEX IF NOT EXISTS idx_trade_signals_status ON trade_signals(status);
CREATE INDEX IF NOT EXISTS idx_market_snapshots_market ON market_snapshots(market_id);
";

/// What the execution layer should do with a decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSignal {
    Buy,
    Sell,
    Skip,
}

impl TradeSignal {
    /// Only a YES with a positive size turns into an order.
    pub fn from_consensus(direction: Direction, size: Decimal) -> Self {
        if direction == Direction::Yes && size > Decimal::ZERO {
            TradeSignal::Buy
        } else {
            TradeSignal::Skip
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSignal::Buy => "BUY",
            TradeSignal::Sell => "SELL",
            TradeSignal::Skip => "SKIP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(TradeSignal::Buy),
            "SELL" => Some(TradeSignal::Sell),
            "SKIP" => Some(TradeSignal::Skip),
            _ => None,
        }
    }
}

impl fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Pending,
    Executed,
    Failed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "PENDING",
            TradeStatus::Executed => "EXECUTED",
            TradeStatus::Failed => "FAILED",
        }
    }

    /// Case-insensitive, so CLI input like `pending` works.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Some(TradeStatus::Pending),
            "EXECUTED" => Some(TradeStatus::Executed),
            "FAILED" => Some(TradeStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged decision round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionRecord {
    pub id: Uuid,
    /// RFC 3339.
    pub created_at: String,
    pub market_id: String,
    pub market_question: Option<String>,
    pub final_direction: Direction,
    pub final_size: Decimal,
    /// JSON array of `AgentOutput`.
    pub agent_outputs: serde_json::Value,
    pub consensus_reasoning: Option<String>,
    pub raw_market_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeSignalRecord {
    pub id: Uuid,
    pub created_at: String,
    pub decision_id: Uuid,
    pub market_id: String,
    pub signal: TradeSignal,
    pub size_usd: Decimal,
    pub solana_tx_hash: Option<String>,
    pub status: TradeStatus,
    pub execution_reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshotRecord {
    pub id: Uuid,
    pub created_at: String,
    pub market_id: String,
    /// Where the snapshot came from (e.g. "decision_request").
    pub source: String,
    pub snapshot: serde_json::Value,
}
