use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use quorum_models::{AgentContext, AgentDecision, AgentOutput, MarketData};
use tracing::{error, info};

use crate::agent::Agent;
use crate::generator::TextGenerator;
use crate::persona::Persona;

/// Runs the full committee concurrently for one market.
pub struct AgentRunner {
    generator: Arc<dyn TextGenerator>,
    model: String,
    timeout: Duration,
}

impl AgentRunner {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            generator,
            model: model.into(),
            timeout,
        }
    }

    /// One agent per persona, in roster order.
    pub fn roster(&self) -> Vec<Agent> {
        Persona::ROSTER
            .into_iter()
            .map(|persona| {
                Agent::new(
                    persona,
                    Arc::clone(&self.generator),
                    self.model.clone(),
                    self.timeout,
                )
            })
            .collect()
    }

    /// Evaluate the market with every persona in parallel.
    ///
    /// Always returns one output per persona in roster order. A task that
    /// dies is replaced by the conservative default; the others still count.
    pub async fn run_agents(&self, market: &MarketData, context: &AgentContext) -> Vec<AgentOutput> {
        let start = Instant::now();
        let market = Arc::new(market.clone());
        let context = Arc::new(context.clone());
        info!(symbol = %market.symbol, agents = Persona::ROSTER.len(), "Starting agent round");

        let handles: Vec<_> = self
            .roster()
            .into_iter()
            .map(|agent| {
                let market = Arc::clone(&market);
                let context = Arc::clone(&context);
                let persona = agent.persona();
                let handle = tokio::spawn(async move {
                    let agent_start = Instant::now();
                    let decision = agent.evaluate(&market, &context).await;
                    (decision, agent_start.elapsed())
                });
                (persona, handle)
            })
            .collect();

        let mut outputs = Vec::with_capacity(handles.len());
        for (persona, handle) in handles {
            let decision = match handle.await {
                Ok((decision, elapsed)) => {
                    info!(
                        agent = %persona,
                        direction = %decision.direction,
                        confidence = %decision.confidence,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Agent finished"
                    );
                    decision
                }
                Err(e) => {
                    let reason = if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        e.to_string()
                    };
                    error!(agent = %persona, error = %reason, "Agent task failed");
                    AgentDecision::conservative(format!("Error: {reason}"))
                }
            };
            outputs.push(AgentOutput::new(persona.name(), decision));
        }

        info!(
            symbol = %market.symbol,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Agent round complete"
        );
        outputs
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown error".to_string()
    }
}
