//! Decision service tests: request validation, a full round through scripted
//! agents, and persistence of the result.

use std::sync::Arc;
use std::time::Duration;

use quorum::agents::test_support::{decision_json, Script, ScriptedGenerator};
use quorum::agents::{AgentRunner, Consensus, Persona};
use quorum::models::config::{BackendKind, QuorumConfig};
use quorum::models::records::{TradeSignal, TradeStatus};
use quorum::models::{Direction, ResponseStatus};
use quorum::store::{DecisionLogger, SqliteStore};
use quorum::DecisionService;
use rust_decimal_macros::dec;

const REQUEST: &str = r#"{
    "market": {
        "symbol": "SOL",
        "price": 150.25,
        "volume24h": 2100000000,
        "question": "Will SOL close above $160 this week?",
        "venue": "drift"
    },
    "data": {
        "portfolio": {"totalValue": 100000, "positions": [], "heat": 35},
        "sentiment": {"socialScore": 0.4, "newsScore": 0.2, "trend": "bullish"},
        "custom_signal": 3
    }
}"#;

fn committee() -> ScriptedGenerator {
    ScriptedGenerator::new(Script::Fail("unscripted".into()))
        .with(
            Persona::Fundamental,
            Script::Reply(decision_json("YES", 80, 1000, "Undervalued")),
        )
        .with(
            Persona::Quant,
            Script::Reply(decision_json("YES", 70, 2000, "Breakout")),
        )
        .with(
            Persona::Risk,
            Script::Reply(decision_json("NO", 90, 500, "Too volatile")),
        )
        .with(
            Persona::Sentiment,
            Script::Reply(decision_json("NO", 40, 100, "Crowd fading")),
        )
        .with(
            Persona::Strategist,
            Script::Reply(decision_json("YES", 60, 300, "Fits the book")),
        )
}

fn service(generator: Arc<ScriptedGenerator>) -> DecisionService {
    let runner = AgentRunner::new(generator, "test-model", Duration::from_secs(5));
    DecisionService::new(runner, Consensus::default())
}

fn logged_service(generator: Arc<ScriptedGenerator>) -> (DecisionService, Arc<DecisionLogger>) {
    let logger = Arc::new(DecisionLogger::new(SqliteStore::open_in_memory().unwrap()));
    (service(generator).with_logger(Arc::clone(&logger)), logger)
}

#[tokio::test]
async fn full_round_is_decided_and_logged() {
    let generator = Arc::new(committee());
    let (service, logger) = logged_service(Arc::clone(&generator));

    let response = service.process_json(REQUEST).await;

    assert_eq!(response.status, ResponseStatus::Ok);
    assert_eq!(generator.calls(), 5);
    let decision = response.decision.as_ref().unwrap();
    assert_eq!(decision.direction, Direction::Yes);
    assert_eq!(decision.size, dec!(880));
    assert_eq!(response.trade_signal, Some(TradeSignal::Buy));
    assert_eq!(response.agents.as_ref().unwrap().len(), 5);
    assert_eq!(response.market.as_ref().unwrap().extra["venue"], "drift");

    let decision_id = response.decision_id.expect("round should be persisted");
    let stored = logger.get_decision(decision_id).unwrap().unwrap();
    assert_eq!(stored.market_id, "SOL");
    assert_eq!(stored.final_size, dec!(880));
    assert_eq!(
        stored.market_question.as_deref(),
        Some("Will SOL close above $160 this week?")
    );

    let pending = logger.trades_by_status(TradeStatus::Pending).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].decision_id, decision_id);
    assert_eq!(pending[0].signal, TradeSignal::Buy);

    let history = logger.market_history("SOL").unwrap();
    assert_eq!(history[0].snapshot["data"]["custom_signal"], 3);
}

#[tokio::test]
async fn response_serializes_with_wire_names() {
    let response = service(Arc::new(committee())).process_json(REQUEST).await;
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["status"], "ok");
    assert_eq!(json["trade_signal"], "BUY");
    assert_eq!(json["decision"]["direction"], "YES");
    assert_eq!(json["agents"][0]["agent"], "FundamentalAgent");
    assert!(json.get("decision_id").is_none());
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn malformed_json_runs_no_agents() {
    let generator = Arc::new(committee());
    let response = service(Arc::clone(&generator))
        .process_json("{\"market\": ")
        .await;

    assert_eq!(response.status, ResponseStatus::Error);
    assert!(response.error.unwrap().starts_with("Malformed request: Invalid JSON"));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn missing_halves_are_reported() {
    let generator = Arc::new(committee());
    let service = service(Arc::clone(&generator));

    let response = service
        .process_json(r#"{"data": {}}"#)
        .await;
    assert_eq!(response.error.as_deref(), Some("Malformed request: Missing market"));

    let response = service
        .process_json(r#"{"market": {"symbol": "SOL", "price": 1}}"#)
        .await;
    assert_eq!(response.error.as_deref(), Some("Malformed request: Missing data"));

    let response = service
        .process_json(r#"{"market": {"symbol": "", "price": 1}, "data": {}}"#)
        .await;
    assert!(!response.is_ok());

    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn failing_committee_skips_and_still_logs() {
    let generator = Arc::new(ScriptedGenerator::new(Script::Fail("upstream down".into())));
    let (service, logger) = logged_service(generator);

    let response = service.process_json(REQUEST).await;

    assert!(response.is_ok());
    assert_eq!(response.decision.as_ref().unwrap().direction, Direction::No);
    assert_eq!(response.trade_signal, Some(TradeSignal::Skip));
    assert!(response
        .agents
        .unwrap()
        .iter()
        .all(|o| o.decision.reasoning.contains("upstream down")));

    let pending = logger.trades_by_status(TradeStatus::Pending).unwrap();
    assert_eq!(pending[0].signal, TradeSignal::Skip);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_rounds_share_one_log() {
    let (service, logger) = logged_service(Arc::new(committee()));

    let (first, second) = tokio::join!(service.process_json(REQUEST), service.process_json(REQUEST));

    let ids = [first.decision_id.unwrap(), second.decision_id.unwrap()];
    assert_ne!(ids[0], ids[1]);
    assert_eq!(logger.latest_decisions(20).unwrap().len(), 2);
    assert_eq!(logger.trades_by_status(TradeStatus::Pending).unwrap().len(), 2);
    for id in ids {
        assert!(logger.get_decision(id).unwrap().is_some());
    }
}

#[tokio::test]
async fn persistence_failure_does_not_fail_the_round() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quorum.db");
    let path = path.to_str().unwrap();

    let logger = Arc::new(DecisionLogger::new(SqliteStore::open(path).unwrap()));
    rusqlite::Connection::open(path)
        .unwrap()
        .execute_batch("DROP TABLE trade_signals;")
        .unwrap();

    let service = service(Arc::new(committee())).with_logger(Arc::clone(&logger));
    let response = service.process_json(REQUEST).await;

    assert!(response.is_ok());
    assert!(response.decision_id.is_none());
    // The round is written in one transaction, so nothing was kept.
    assert!(logger.latest_decisions(20).unwrap().is_empty());
}

#[test]
fn build_service_opens_log_in_nested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = QuorumConfig::default();
    config.agents.backend = BackendKind::ClaudeCli;
    config.store.sqlite_path = dir
        .path()
        .join("nested/data/quorum.db")
        .to_string_lossy()
        .into_owned();

    let service = quorum::build_service(&config).unwrap();
    let logger = service.logger().expect("store is enabled by default");
    assert!(logger.latest_decisions(20).unwrap().is_empty());
    assert!(dir.path().join("nested/data/quorum.db").exists());
}

#[test]
fn disabled_store_builds_without_logger() {
    let mut config = QuorumConfig::default();
    config.agents.backend = BackendKind::ClaudeCli;
    config.store.enabled = false;

    let service = quorum::build_service(&config).unwrap();
    assert!(service.logger().is_none());
}

#[test]
fn openrouter_backend_accepts_configured_key() {
    let mut config = QuorumConfig::default();
    config.openrouter.api_key = Some("sk-or-test".to_string());
    config.store.enabled = false;

    assert!(quorum::build_service(&config).is_ok());
}

#[test]
fn out_of_range_weight_fails_service_build() {
    let mut config = QuorumConfig::default();
    config.agents.backend = BackendKind::ClaudeCli;
    config.store.enabled = false;
    config
        .consensus
        .weights
        .insert("RiskAgent".to_string(), dec!(3));

    let err = quorum::build_service(&config).err().expect("weight above 1 is rejected");
    assert!(format!("{err:#}").contains("RiskAgent must be between 0 and 1"));
}

#[test]
fn shipped_config_matches_defaults() {
    let shipped: QuorumConfig =
        toml::from_str(include_str!("../../../config/quorum.toml")).unwrap();
    assert_eq!(shipped, QuorumConfig::default());
}
