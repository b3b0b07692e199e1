use std::sync::{Mutex, MutexGuard};

use quorum_models::records::{
    DecisionRecord, MarketSnapshotRecord, TradeSignal, TradeSignalRecord, TradeStatus,
};
use quorum_models::{AgentContext, AgentOutput, ConsensusDecision, MarketData};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::sqlite::{now_timestamp, SqliteStore};

/// Source tag written on snapshots captured from decision requests.
pub const REQUEST_SNAPSHOT_SOURCE: &str = "decision_request";

/// Ids of the rows written for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggedRound {
    pub decision_id: Uuid,
    pub trade_signal_id: Uuid,
    pub snapshot_id: Uuid,
}

/// Decision logger and dashboard reader over the SQLite log.
///
/// SQLite access is synchronized via `Mutex` since `rusqlite::Connection` is not `Sync`.
pub struct DecisionLogger {
    store: Mutex<SqliteStore>,
}

impl DecisionLogger {
    pub fn new(store: SqliteStore) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SqliteStore>, StoreError> {
        self.store
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }

    /// Persist a completed round: the market snapshot, the decision with every
    /// agent's output, and a PENDING trade signal.
    pub fn record_round(
        &self,
        market: &MarketData,
        context: &AgentContext,
        outputs: &[AgentOutput],
        consensus: &ConsensusDecision,
        signal: TradeSignal,
    ) -> Result<LoggedRound, StoreError> {
        let created_at = now_timestamp();
        let ids = LoggedRound {
            decision_id: Uuid::new_v4(),
            trade_signal_id: Uuid::new_v4(),
            snapshot_id: Uuid::new_v4(),
        };

        let snapshot = MarketSnapshotRecord {
            id: ids.snapshot_id,
            created_at: created_at.clone(),
            market_id: market.symbol.clone(),
            source: REQUEST_SNAPSHOT_SOURCE.to_string(),
            snapshot: serde_json::json!({ "market": market, "data": context }),
        };

        let decision = DecisionRecord {
            id: ids.decision_id,
            created_at: created_at.clone(),
            market_id: market.symbol.clone(),
            market_question: market.question.clone(),
            final_direction: consensus.direction,
            final_size: consensus.size,
            agent_outputs: serde_json::to_value(outputs)?,
            consensus_reasoning: Some(consensus.reasoning.clone()),
            raw_market_data: Some(serde_json::to_value(market)?),
        };

        let trade = TradeSignalRecord {
            id: ids.trade_signal_id,
            created_at,
            decision_id: ids.decision_id,
            market_id: market.symbol.clone(),
            signal,
            size_usd: consensus.size,
            solana_tx_hash: None,
            status: TradeStatus::Pending,
            execution_reasoning: None,
        };

        self.lock()?.insert_round(&snapshot, &decision, &trade)?;

        info!(
            decision_id = %ids.decision_id,
            market = %market.symbol,
            direction = %consensus.direction,
            signal = %signal,
            "Decision logged"
        );
        Ok(ids)
    }

    pub fn log_decision(&self, record: &DecisionRecord) -> Result<(), StoreError> {
        self.lock()?.insert_decision(record)?;
        info!(decision_id = %record.id, market = %record.market_id, "Decision logged");
        Ok(())
    }

    pub fn log_market_snapshot(&self, record: &MarketSnapshotRecord) -> Result<(), StoreError> {
        self.lock()?.insert_market_snapshot(record)?;
        debug!(snapshot_id = %record.id, market = %record.market_id, "Market snapshot logged");
        Ok(())
    }

    /// Open a PENDING trade signal against an existing decision.
    pub fn create_trade_signal(
        &self,
        decision_id: Uuid,
        market_id: &str,
        signal: TradeSignal,
        size_usd: Decimal,
    ) -> Result<Uuid, StoreError> {
        let record = TradeSignalRecord {
            id: Uuid::new_v4(),
            created_at: now_timestamp(),
            decision_id,
            market_id: market_id.to_string(),
            signal,
            size_usd,
            solana_tx_hash: None,
            status: TradeStatus::Pending,
            execution_reasoning: None,
        };
        self.lock()?.insert_trade_signal(&record)?;
        info!(trade_id = %record.id, decision_id = %decision_id, signal = %signal, "Trade signal created");
        Ok(record.id)
    }

    pub fn update_trade_execution(
        &self,
        trade_id: Uuid,
        solana_tx_hash: Option<&str>,
        status: TradeStatus,
        execution_reasoning: Option<&str>,
    ) -> Result<(), StoreError> {
        self.lock()?
            .update_trade_execution(trade_id, solana_tx_hash, status, execution_reasoning)?;
        info!(trade_id = %trade_id, status = %status, "Trade execution updated");
        Ok(())
    }

    pub fn latest_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>, StoreError> {
        let rows = self.lock()?.latest_decisions(limit)?;
        debug!(count = rows.len(), "Retrieved latest decisions");
        Ok(rows)
    }

    pub fn trades_by_status(&self, status: TradeStatus) -> Result<Vec<TradeSignalRecord>, StoreError> {
        let rows = self.lock()?.trades_by_status(status)?;
        debug!(count = rows.len(), status = %status, "Retrieved trades");
        Ok(rows)
    }

    pub fn market_history(&self, market_id: &str) -> Result<Vec<MarketSnapshotRecord>, StoreError> {
        let rows = self.lock()?.market_history(market_id)?;
        debug!(count = rows.len(), market = %market_id, "Retrieved market history");
        Ok(rows)
    }

    pub fn get_decision(&self, id: Uuid) -> Result<Option<DecisionRecord>, StoreError> {
        self.lock()?.get_decision(id)
    }
}
