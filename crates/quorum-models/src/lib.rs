pub mod config;
pub mod decision;
pub mod market;
pub mod records;
pub mod service_message;

pub use config::{
    AgentsConfig, BackendKind, ConsensusConfig, OpenRouterConfig, QuorumConfig, StoreConfig,
};
pub use decision::{AgentDecision, AgentOutput, ConsensusDecision, Direction};
pub use market::{
    AgentContext, MarketData, PortfolioSummary, Position, PricePoint, SentimentSummary,
    SentimentTrend,
};
pub use records::{
    DecisionRecord, MarketSnapshotRecord, TradeSignal, TradeSignalRecord, TradeStatus,
};
pub use service_message::{DecisionRequest, DecisionResponse, ResponseStatus};
