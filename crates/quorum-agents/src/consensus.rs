use std::collections::BTreeMap;

use quorum_models::config::ConsensusConfig;
use quorum_models::{AgentOutput, ConsensusDecision, Direction};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::AgentError;
use crate::persona::Persona;

/// Immutable agent-name → weight table.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusWeights {
    weights: BTreeMap<String, Decimal>,
    default_weight: Decimal,
}

impl Default for ConsensusWeights {
    fn default() -> Self {
        let config = ConsensusConfig::default();
        Self::new(config.weights, config.default_weight)
    }
}

impl ConsensusWeights {
    pub fn new(weights: BTreeMap<String, Decimal>, default_weight: Decimal) -> Self {
        Self {
            weights,
            default_weight,
        }
    }

    /// Build the table from configuration.
    ///
    /// Every key must name a persona and every weight must lie in `[0, 1]`.
    pub fn from_config(config: &ConsensusConfig) -> Result<Self, AgentError> {
        for (agent, weight) in &config.weights {
            if Persona::from_name(agent).is_none() {
                return Err(AgentError::Config(format!(
                    "Unknown agent in consensus.weights: {agent}"
                )));
            }
            check_weight(agent, *weight)?;
        }
        check_weight("default_weight", config.default_weight)?;
        Ok(Self::new(config.weights.clone(), config.default_weight))
    }

    /// Weight for `agent`, or the default weight if the table does not name it.
    pub fn weight_for(&self, agent: &str) -> Decimal {
        self.weights
            .get(agent)
            .copied()
            .unwrap_or(self.default_weight)
    }
}

fn check_weight(key: &str, weight: Decimal) -> Result<(), AgentError> {
    if weight < Decimal::ZERO || weight > Decimal::ONE {
        return Err(AgentError::Config(format!(
            "Consensus weight for {key} must be between 0 and 1, got {weight}"
        )));
    }
    Ok(())
}

/// Weighted-vote aggregator over a fixed weight table.
#[derive(Debug, Clone, Default)]
pub struct Consensus {
    weights: ConsensusWeights,
}

impl Consensus {
    pub fn new(weights: ConsensusWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ConsensusWeights {
        &self.weights
    }

    /// Combine agent outputs into one decision.
    ///
    /// YES wins only when its weighted confidence is strictly greater than
    /// NO's, so an exact tie resolves to NO. Size is the winning side's
    /// weighted size. Sums saturate at `Decimal::MAX`.
    pub fn calculate(&self, outputs: &[AgentOutput]) -> ConsensusDecision {
        let mut yes_confidence = Decimal::ZERO;
        let mut no_confidence = Decimal::ZERO;
        let mut yes_size = Decimal::ZERO;
        let mut no_size = Decimal::ZERO;
        let mut lines = Vec::with_capacity(outputs.len());

        for output in outputs {
            let weight = self.weights.weight_for(&output.agent);
            let decision = &output.decision;

            match decision.direction {
                Direction::Yes => {
                    yes_confidence = weighted_sum(yes_confidence, decision.confidence, weight);
                    yes_size = weighted_sum(yes_size, decision.size, weight);
                }
                Direction::No => {
                    no_confidence = weighted_sum(no_confidence, decision.confidence, weight);
                    no_size = weighted_sum(no_size, decision.size, weight);
                }
            }

            lines.push(format!(
                "{} ({}% weight): {} with {}% confidence - {}",
                output.agent,
                fixed(weight.saturating_mul(Decimal::ONE_HUNDRED), 0),
                decision.direction,
                decision.confidence.normalize(),
                decision.reasoning
            ));
        }

        let direction = if yes_confidence > no_confidence {
            Direction::Yes
        } else {
            Direction::No
        };
        let size = match direction {
            Direction::Yes => yes_size,
            Direction::No => no_size,
        }
        .max(Decimal::ZERO);

        let reasoning = format!(
            "Consensus: {direction} (Weighted Confidence: YES={}%, NO={}%)\n\nAgent Decisions:\n{}",
            fixed(yes_confidence, 1),
            fixed(no_confidence, 1),
            lines.join("\n\n")
        );

        ConsensusDecision {
            direction,
            size,
            reasoning,
            yes_confidence,
            no_confidence,
        }
    }
}

/// Consensus over the default weight table.
pub fn calculate_consensus(outputs: &[AgentOutput]) -> ConsensusDecision {
    Consensus::default().calculate(outputs)
}

fn weighted_sum(total: Decimal, value: Decimal, weight: Decimal) -> Decimal {
    total.saturating_add(value.saturating_mul(weight))
}

/// Render with exactly `dp` decimal places, half away from zero.
fn fixed(value: Decimal, dp: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded.to_string()
}
