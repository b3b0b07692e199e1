use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use quorum_models::records::{
    DecisionRecord, MarketSnapshotRecord, TradeSignal, TradeSignalRecord, TradeStatus,
    DECISION_LOG_DDL,
};
use quorum_models::Direction;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::StoreError;

const DECISION_COLUMNS: &str = "id, created_at, market_id, market_question, final_direction, \
     final_size, agent_outputs, consensus_reasoning, raw_market_data";

const TRADE_COLUMNS: &str = "id, created_at, decision_id, market_id, signal, size_usd, \
     solana_tx_hash, status, execution_reasoning";

const SNAPSHOT_COLUMNS: &str = "id, created_at, market_id, source, snapshot";

/// Timestamp format used for every `created_at` column.
///
/// Fixed-width UTC so that lexical order in SQLite matches time order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Read-write SQLite decision log.
///
/// Holds decisions, the trade signals derived from them, and the market
/// snapshots that fed each round.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the log at `path`. Creates the schema and enables WAL
    /// so dashboard reads can run alongside the writer.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(DECISION_LOG_DDL)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Ok(Self { conn })
    }

    /// Open an in-memory database. Useful for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(DECISION_LOG_DDL)?;
        Ok(Self { conn })
    }

    pub fn insert_decision(&self, record: &DecisionRecord) -> Result<(), StoreError> {
        insert_decision(&self.conn, record)
    }

    pub fn insert_trade_signal(&self, record: &TradeSignalRecord) -> Result<(), StoreError> {
        insert_trade_signal(&self.conn, record)
    }

    pub fn insert_market_snapshot(&self, record: &MarketSnapshotRecord) -> Result<(), StoreError> {
        insert_market_snapshot(&self.conn, record)
    }

    /// Write one round's snapshot, decision and trade signal atomically.
    pub fn insert_round(
        &mut self,
        snapshot: &MarketSnapshotRecord,
        decision: &DecisionRecord,
        signal: &TradeSignalRecord,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        insert_market_snapshot(&tx, snapshot)?;
        insert_decision(&tx, decision)?;
        insert_trade_signal(&tx, signal)?;
        tx.commit()?;
        Ok(())
    }

    /// Record the outcome of executing a trade signal.
    pub fn update_trade_execution(
        &self,
        trade_id: Uuid,
        solana_tx_hash: Option<&str>,
        status: TradeStatus,
        execution_reasoning: Option<&str>,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE trade_signals \
             SET solana_tx_hash = ?1, status = ?2, execution_reasoning = ?3 \
             WHERE id = ?4",
            params![
                solana_tx_hash,
                status.as_str(),
                execution_reasoning,
                trade_id.to_string()
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(format!("trade signal {trade_id}")));
        }
        Ok(())
    }

    /// Most recent decisions first.
    pub fn latest_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {DECISION_COLUMNS} FROM decisions \
             ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], decision_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_decision(&self, id: Uuid) -> Result<Option<DecisionRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {DECISION_COLUMNS} FROM decisions WHERE id = ?1"))?;

        match stmt.query_row(params![id.to_string()], decision_from_row) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    pub fn get_trade_signal(&self, id: Uuid) -> Result<Option<TradeSignalRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {TRADE_COLUMNS} FROM trade_signals WHERE id = ?1"))?;

        match stmt.query_row(params![id.to_string()], trade_from_row) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Trade signals in the given status, most recent first.
    pub fn trades_by_status(&self, status: TradeStatus) -> Result<Vec<TradeSignalRecord>, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {TRADE_COLUMNS} FROM trade_signals WHERE status = ?1 \
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map(params![status.as_str()], trade_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Snapshots recorded for a market, most recent first.
    pub fn market_history(&self, market_id: &str) -> Result<Vec<MarketSnapshotRecord>, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM market_snapshots WHERE market_id = ?1 \
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map(params![market_id], snapshot_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn insert_decision(conn: &Connection, record: &DecisionRecord) -> Result<(), StoreError> {
    let raw_market_data = record
        .raw_market_data
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        &format!("INSERT INTO decisions ({DECISION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            record.id.to_string(),
            record.created_at,
            record.market_id,
            record.market_question,
            record.final_direction.as_str(),
            record.final_size.to_string(),
            serde_json::to_string(&record.agent_outputs)?,
            record.consensus_reasoning,
            raw_market_data,
        ],
    )?;
    Ok(())
}

fn insert_trade_signal(conn: &Connection, record: &TradeSignalRecord) -> Result<(), StoreError> {
    conn.execute(
        &format!("INSERT INTO trade_signals ({TRADE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            record.id.to_string(),
            record.created_at,
            record.decision_id.to_string(),
            record.market_id,
            record.signal.as_str(),
            record.size_usd.to_string(),
            record.solana_tx_hash,
            record.status.as_str(),
            record.execution_reasoning,
        ],
    )?;
    Ok(())
}

fn insert_market_snapshot(conn: &Connection, record: &MarketSnapshotRecord) -> Result<(), StoreError> {
    conn.execute(
        &format!("INSERT INTO market_snapshots ({SNAPSHOT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
        params![
            record.id.to_string(),
            record.created_at,
            record.market_id,
            record.source,
            serde_json::to_string(&record.snapshot)?,
        ],
    )?;
    Ok(())
}

fn corrupt(column: usize, detail: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, detail.into())
}

fn uuid_at(row: &Row<'_>, column: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text).map_err(|e| corrupt(column, format!("bad uuid {text:?}: {e}")))
}

fn decimal_at(row: &Row<'_>, column: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(column)?;
    Decimal::from_str(&text).map_err(|e| corrupt(column, format!("bad decimal {text:?}: {e}")))
}

fn json_at(row: &Row<'_>, column: usize) -> rusqlite::Result<Option<serde_json::Value>> {
    let text: Option<String> = row.get(column)?;
    text.map(|t| serde_json::from_str(&t).map_err(|e| corrupt(column, format!("bad json: {e}"))))
        .transpose()
}

fn decision_from_row(row: &Row<'_>) -> rusqlite::Result<DecisionRecord> {
    let direction: String = row.get(4)?;
    Ok(DecisionRecord {
        id: uuid_at(row, 0)?,
        created_at: row.get(1)?,
        market_id: row.get(2)?,
        market_question: row.get(3)?,
        final_direction: Direction::parse(&direction)
            .ok_or_else(|| corrupt(4, format!("unknown direction {direction:?}")))?,
        final_size: decimal_at(row, 5)?,
        agent_outputs: json_at(row, 6)?.unwrap_or(serde_json::Value::Null),
        consensus_reasoning: row.get(7)?,
        raw_market_data: json_at(row, 8)?,
    })
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<TradeSignalRecord> {
    let signal: String = row.get(4)?;
    let status: String = row.get(7)?;
    Ok(TradeSignalRecord {
        id: uuid_at(row, 0)?,
        created_at: row.get(1)?,
        decision_id: uuid_at(row, 2)?,
        market_id: row.get(3)?,
        signal: TradeSignal::parse(&signal)
            .ok_or_else(|| corrupt(4, format!("unknown signal {signal:?}")))?,
        size_usd: decimal_at(row, 5)?,
        solana_tx_hash: row.get(6)?,
        status: TradeStatus::parse(&status)
            .ok_or_else(|| corrupt(7, format!("unknown status {status:?}")))?,
        execution_reasoning: row.get(8)?,
    })
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<MarketSnapshotRecord> {
    Ok(MarketSnapshotRecord {
        id: uuid_at(row, 0)?,
        created_at: row.get(1)?,
        market_id: row.get(2)?,
        source: row.get(3)?,
        snapshot: json_at(row, 4)?.unwrap_or(serde_json::Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_decision(market_id: &str, direction: Direction) -> DecisionRecord {
        DecisionRecord {
            id: Uuid::new_v4(),
            created_at: now_timestamp(),
            market_id: market_id.to_string(),
            market_question: Some("Will SOL close above $150?".to_string()),
            final_direction: direction,
            final_size: dec!(880.00),
            agent_outputs: serde_json::json!([{"agent": "QuantAgent"}]),
            consensus_reasoning: Some("Consensus: YES".to_string()),
            raw_market_data: Some(serde_json::json!({"symbol": market_id, "price": "150"})),
        }
    }

    fn make_trade(decision_id: Uuid, status: TradeStatus) -> TradeSignalRecord {
        TradeSignalRecord {
            id: Uuid::new_v4(),
            created_at: now_timestamp(),
            decision_id,
            market_id: "SOL".to_string(),
            signal: TradeSignal::Buy,
            size_usd: dec!(880),
            solana_tx_hash: None,
            status,
            execution_reasoning: None,
        }
    }

    #[test]
    fn insert_and_get_decision() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = make_decision("SOL", Direction::Yes);
        store.insert_decision(&record).unwrap();

        let loaded = store.get_decision(record.id).unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn get_missing_decision() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get_decision(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn decision_without_optional_fields() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut record = make_decision("BTC", Direction::No);
        record.market_question = None;
        record.consensus_reasoning = None;
        record.raw_market_data = None;
        store.insert_decision(&record).unwrap();

        let loaded = store.get_decision(record.id).unwrap().unwrap();
        assert!(loaded.market_question.is_none());
        assert!(loaded.raw_market_data.is_none());
        assert_eq!(loaded.final_direction, Direction::No);
    }

    #[test]
    fn latest_decisions_newest_first_with_limit() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = make_decision("SOL", Direction::Yes);
        let second = make_decision("BTC", Direction::No);
        let third = make_decision("ETH", Direction::Yes);
        for record in [&first, &second, &third] {
            store.insert_decision(record).unwrap();
        }

        let latest = store.latest_decisions(2).unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].id, third.id);
        assert_eq!(latest[1].id, second.id);
    }

    #[test]
    fn trades_filtered_by_status() {
        let store = SqliteStore::open_in_memory().unwrap();
        let decision = make_decision("SOL", Direction::Yes);
        store.insert_decision(&decision).unwrap();
        store
            .insert_trade_signal(&make_trade(decision.id, TradeStatus::Pending))
            .unwrap();
        store
            .insert_trade_signal(&make_trade(decision.id, TradeStatus::Pending))
            .unwrap();
        store
            .insert_trade_signal(&make_trade(decision.id, TradeStatus::Failed))
            .unwrap();

        assert_eq!(store.trades_by_status(TradeStatus::Pending).unwrap().len(), 2);
        assert_eq!(store.trades_by_status(TradeStatus::Failed).unwrap().len(), 1);
        assert!(store.trades_by_status(TradeStatus::Executed).unwrap().is_empty());
    }

    #[test]
    fn update_trade_execution_sets_fields() {
        let store = SqliteStore::open_in_memory().unwrap();
        let decision = make_decision("SOL", Direction::Yes);
        store.insert_decision(&decision).unwrap();
        let trade = make_trade(decision.id, TradeStatus::Pending);
        store.insert_trade_signal(&trade).unwrap();

        store
            .update_trade_execution(trade.id, Some("5xTxHash"), TradeStatus::Executed, Some("filled"))
            .unwrap();

        let loaded = store.get_trade_signal(trade.id).unwrap().unwrap();
        assert_eq!(loaded.status, TradeStatus::Executed);
        assert_eq!(loaded.solana_tx_hash.as_deref(), Some("5xTxHash"));
        assert_eq!(loaded.execution_reasoning.as_deref(), Some("filled"));
        assert_eq!(loaded.size_usd, dec!(880));
    }

    #[test]
    fn update_unknown_trade_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result =
            store.update_trade_execution(Uuid::new_v4(), None, TradeStatus::Failed, None);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn market_history_only_returns_that_market() {
        let store = SqliteStore::open_in_memory().unwrap();
        for market in ["SOL", "SOL", "BTC"] {
            store
                .insert_market_snapshot(&MarketSnapshotRecord {
                    id: Uuid::new_v4(),
                    created_at: now_timestamp(),
                    market_id: market.to_string(),
                    source: "test".to_string(),
                    snapshot: serde_json::json!({"symbol": market}),
                })
                .unwrap();
        }

        let history = store.market_history("SOL").unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|s| s.market_id == "SOL"));
        assert!(store.market_history("DOGE").unwrap().is_empty());
    }

    #[test]
    fn insert_round_writes_all_three() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let decision = make_decision("SOL", Direction::Yes);
        let trade = make_trade(decision.id, TradeStatus::Pending);
        let snapshot = MarketSnapshotRecord {
            id: Uuid::new_v4(),
            created_at: now_timestamp(),
            market_id: "SOL".to_string(),
            source: "decision_request".to_string(),
            snapshot: serde_json::json!({}),
        };

        store.insert_round(&snapshot, &decision, &trade).unwrap();

        assert!(store.get_decision(decision.id).unwrap().is_some());
        assert!(store.get_trade_signal(trade.id).unwrap().is_some());
        assert_eq!(store.market_history("SOL").unwrap().len(), 1);
    }

    #[test]
    fn insert_round_rolls_back_on_failure() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let decision = make_decision("SOL", Direction::Yes);
        store.insert_decision(&decision).unwrap();

        // Same decision id again violates the primary key.
        let trade = make_trade(decision.id, TradeStatus::Pending);
        let snapshot = MarketSnapshotRecord {
            id: Uuid::new_v4(),
            created_at: now_timestamp(),
            market_id: "SOL".to_string(),
            source: "decision_request".to_string(),
            snapshot: serde_json::json!({}),
        };

        assert!(store.insert_round(&snapshot, &decision, &trade).is_err());
        assert!(store.market_history("SOL").unwrap().is_empty());
        assert!(store.get_trade_signal(trade.id).unwrap().is_none());
    }
}
