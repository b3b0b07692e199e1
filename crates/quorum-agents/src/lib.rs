pub mod agent;
pub mod claude_cli;
pub mod consensus;
pub mod error;
pub mod generator;
pub mod openrouter;
pub mod parser;
pub mod persona;
pub mod prompts;
pub mod runner;

pub mod test_support;

pub use agent::Agent;
pub use claude_cli::ClaudeCliGenerator;
pub use consensus::{calculate_consensus, Consensus, ConsensusWeights};
pub use error::AgentError;
pub use generator::TextGenerator;
pub use openrouter::OpenRouterGenerator;
pub use persona::Persona;
pub use runner::AgentRunner;
