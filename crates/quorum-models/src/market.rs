use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Open-ended fields carried alongside the typed ones.
pub type Extensions = serde_json::Map<String, serde_json::Value>;

/// A quoted instrument, snapshotted once per evaluation round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    pub symbol: String,
    pub price: Decimal,
    #[serde(default, rename = "volume24h", skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Decimal>,
    /// Question text for prediction markets (e.g. "Will SOL close above $200?").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(flatten)]
    pub extra: Extensions,
}

impl MarketData {
    pub fn new(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume_24h: None,
            market_cap: None,
            question: None,
            extra: Extensions::new(),
        }
    }
}

/// An open position inside the portfolio summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub size: Decimal,
    pub pnl: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_value: Decimal,
    #[serde(default)]
    pub positions: Vec<Position>,
    /// Aggregate risk utilization as a percentage.
    pub heat: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub date: String,
    pub price: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SentimentTrend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSummary {
    pub social_score: Decimal,
    pub news_score: Decimal,
    pub trend: SentimentTrend,
}

/// Auxiliary signals handed to every agent. Read-only for the whole round.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<PortfolioSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_data: Option<MarketData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_data: Option<Vec<PricePoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentSummary>,
    #[serde(flatten)]
    pub extra: Extensions,
}
