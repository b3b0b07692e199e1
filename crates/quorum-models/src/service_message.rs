use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::{AgentOutput, ConsensusDecision};
use crate::market::{AgentContext, MarketData};
use crate::records::TradeSignal;

/// Payload accepted by the decision service.
///
/// Both halves are optional on the wire so a missing one can be reported as a
/// structured error instead of a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DecisionRequest {
    #[serde(default)]
    pub market: Option<MarketData>,
    #[serde(default)]
    pub data: Option<AgentContext>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Result of one decision round as returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionResponse {
    pub status: ResponseStatus,
    /// Set when the round was persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<ConsensusDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<AgentOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_signal: Option<TradeSignal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<MarketData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecisionResponse {
    pub fn ok(
        decision: ConsensusDecision,
        agents: Vec<AgentOutput>,
        trade_signal: TradeSignal,
        market: MarketData,
    ) -> Self {
        Self {
            status: ResponseStatus::Ok,
            decision_id: None,
            decision: Some(decision),
            agents: Some(agents),
            trade_signal: Some(trade_signal),
            market: Some(market),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            decision_id: None,
            decision: None,
            agents: None,
            trade_signal: None,
            market: None,
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_with_missing_halves_parses() {
        let request: DecisionRequest = serde_json::from_str(r#"{"market": null}"#).unwrap();
        assert!(request.market.is_none());
        assert!(request.data.is_none());
    }

    #[test]
    fn request_with_both_halves() {
        let request: DecisionRequest = serde_json::from_value(serde_json::json!({
            "market": {"symbol": "SOL", "price": 150},
            "data": {"sentiment": {"socialScore": 0.4, "newsScore": 0.1, "trend": "neutral"}}
        }))
        .unwrap();
        assert_eq!(request.market.unwrap().symbol, "SOL");
        assert!(request.data.unwrap().sentiment.is_some());
    }

    #[test]
    fn error_response_omits_empty_fields() {
        let response = DecisionResponse::error("Missing market");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "Missing market");
        assert!(value.get("decision").is_none());
        assert!(value.get("agents").is_none());
        assert!(!response.is_ok());
    }
}
