use std::sync::Arc;
use std::time::{Duration, Instant};

use quorum_models::{AgentContext, AgentDecision, MarketData};
use tracing::{debug, error};

use crate::error::AgentError;
use crate::generator::TextGenerator;
use crate::parser::parse_decision;
use crate::persona::Persona;
use crate::prompts::build_prompt;

/// One committee member: a persona bound to a generator and model.
#[derive(Clone)]
pub struct Agent {
    persona: Persona,
    generator: Arc<dyn TextGenerator>,
    model: String,
    timeout: Duration,
}

impl Agent {
    pub fn new(
        persona: Persona,
        generator: Arc<dyn TextGenerator>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            persona,
            generator,
            model: model.into(),
            timeout,
        }
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn name(&self) -> &'static str {
        self.persona.name()
    }

    /// Evaluate a market. Never fails: any error becomes the conservative
    /// default with the error in its reasoning.
    pub async fn evaluate(&self, market: &MarketData, context: &AgentContext) -> AgentDecision {
        match self.try_evaluate(market, context).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(agent = %self.persona, error = %e, "Agent evaluation failed");
                AgentDecision::conservative(format!("Error occurred: {e}"))
            }
        }
    }

    /// Evaluate a market, surfacing prompt, generation, and validation errors.
    pub async fn try_evaluate(
        &self,
        market: &MarketData,
        context: &AgentContext,
    ) -> Result<AgentDecision, AgentError> {
        let start = Instant::now();
        let prompt = build_prompt(self.persona, market, context)?;

        let raw = tokio::time::timeout(self.timeout, self.generator.generate(&prompt, &self.model))
            .await
            .map_err(|_| AgentError::Timeout(self.timeout.as_millis() as u64))??;

        let decision = parse_decision(&raw)?;
        debug!(
            agent = %self.persona,
            backend = self.generator.name(),
            direction = %decision.direction,
            confidence = %decision.confidence,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Agent decided"
        );
        Ok(decision)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("persona", &self.persona)
            .field("backend", &self.generator.name())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
