use std::sync::Arc;

use quorum_agents::{AgentRunner, Consensus};
use quorum_models::records::TradeSignal;
use quorum_models::{
    AgentContext, AgentOutput, ConsensusDecision, DecisionRequest, DecisionResponse, MarketData,
};
use quorum_store::{DecisionLogger, StoreError};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Persistence task failed: {0}")]
    Persistence(String),
}

/// One decision round end to end: validate, run the committee, aggregate,
/// persist.
pub struct DecisionService {
    runner: AgentRunner,
    consensus: Consensus,
    logger: Option<Arc<DecisionLogger>>,
}

impl DecisionService {
    pub fn new(runner: AgentRunner, consensus: Consensus) -> Self {
        Self {
            runner,
            consensus,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<DecisionLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn logger(&self) -> Option<&Arc<DecisionLogger>> {
        self.logger.as_ref()
    }

    /// Process a raw JSON request body.
    pub async fn process_json(&self, body: &str) -> DecisionResponse {
        match serde_json::from_str::<DecisionRequest>(body) {
            Ok(request) => self.process(request).await,
            Err(e) => {
                let err = ServiceError::MalformedRequest(format!("Invalid JSON: {e}"));
                warn!(error = %err, "Rejected decision request");
                DecisionResponse::error(err.to_string())
            }
        }
    }

    /// Process a decoded request. Errors are reported in the response, never
    /// returned.
    pub async fn process(&self, request: DecisionRequest) -> DecisionResponse {
        let (market, context) = match validate(request) {
            Ok(parts) => parts,
            Err(e) => {
                warn!(error = %e, "Rejected decision request");
                return DecisionResponse::error(e.to_string());
            }
        };

        let outputs = self.runner.run_agents(&market, &context).await;
        let decision = self.consensus.calculate(&outputs);
        let signal = TradeSignal::from_consensus(decision.direction, decision.size);
        info!(
            market = %market.symbol,
            direction = %decision.direction,
            size = %decision.size,
            signal = %signal,
            "Consensus reached"
        );

        let decision_id = self
            .persist(&market, &context, &outputs, &decision, signal)
            .await;

        let mut response = DecisionResponse::ok(decision, outputs, signal, market);
        response.decision_id = decision_id;
        response
    }

    /// Write the round on the blocking pool. A failure is logged and
    /// yields `None`.
    async fn persist(
        &self,
        market: &MarketData,
        context: &AgentContext,
        outputs: &[AgentOutput],
        decision: &ConsensusDecision,
        signal: TradeSignal,
    ) -> Option<Uuid> {
        let logger = Arc::clone(self.logger.as_ref()?);
        let (market_row, context, outputs, decision) = (
            market.clone(),
            context.clone(),
            outputs.to_vec(),
            decision.clone(),
        );

        let written = tokio::task::spawn_blocking(move || {
            logger.record_round(&market_row, &context, &outputs, &decision, signal)
        })
        .await
        .map_err(|e| ServiceError::Persistence(e.to_string()))
        .and_then(|r| r.map_err(ServiceError::from));

        match written {
            Ok(ids) => Some(ids.decision_id),
            Err(err) => {
                warn!(market = %market.symbol, error = %err, "Decision round not persisted");
                None
            }
        }
    }
}

fn validate(request: DecisionRequest) -> Result<(MarketData, AgentContext), ServiceError> {
    let market = request
        .market
        .ok_or_else(|| ServiceError::MalformedRequest("Missing market".to_string()))?;
    let context = request
        .data
        .ok_or_else(|| ServiceError::MalformedRequest("Missing data".to_string()))?;

    if market.symbol.trim().is_empty() {
        return Err(ServiceError::MalformedRequest(
            "Market symbol must not be empty".to_string(),
        ));
    }
    if market.price < Decimal::ZERO {
        return Err(ServiceError::MalformedRequest(
            "Market price must not be negative".to_string(),
        ));
    }
    Ok((market, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(market: Option<MarketData>, data: Option<AgentContext>) -> DecisionRequest {
        DecisionRequest { market, data }
    }

    #[test]
    fn validate_requires_both_halves() {
        let err = validate(request(None, Some(AgentContext::default()))).unwrap_err();
        assert_eq!(err.to_string(), "Malformed request: Missing market");

        let err = validate(request(Some(MarketData::new("SOL", dec!(1))), None)).unwrap_err();
        assert_eq!(err.to_string(), "Malformed request: Missing data");
    }

    #[test]
    fn validate_rejects_blank_symbol_and_negative_price() {
        let err = validate(request(
            Some(MarketData::new("  ", dec!(1))),
            Some(AgentContext::default()),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("symbol must not be empty"));

        let err = validate(request(
            Some(MarketData::new("SOL", dec!(-0.5))),
            Some(AgentContext::default()),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("price must not be negative"));
    }

    #[test]
    fn validate_accepts_zero_price() {
        let (market, _) = validate(request(
            Some(MarketData::new("SOL", dec!(0))),
            Some(AgentContext::default()),
        ))
        .unwrap();
        assert_eq!(market.symbol, "SOL");
    }
}
