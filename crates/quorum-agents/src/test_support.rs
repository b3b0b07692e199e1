//! Test support: scripted and scenario-driven text generators.
//!
//! `ScriptedGenerator` returns canned replies (or failures) per persona.
//! `ScenarioGenerator` reads the MARKET and CONTEXT blocks back out of the
//! prompt and applies the interpretation rules each persona prompt documents.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentError;
use crate::generator::TextGenerator;
use crate::persona::Persona;

/// What a scripted generator does for one call.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    Fail(String),
    Panic(String),
    /// Never resolves.
    Hang,
}

/// Render a decision reply the way a well-behaved model would.
pub fn decision_json(
    direction: &str,
    confidence: impl Into<Value>,
    size: impl Into<Value>,
    reasoning: &str,
) -> String {
    serde_json::json!({
        "direction": direction,
        "confidence": confidence.into(),
        "size": size.into(),
        "reasoning": reasoning,
    })
    .to_string()
}

/// Which persona a prompt was built for.
fn persona_of(prompt: &str) -> Option<Persona> {
    Persona::ROSTER
        .into_iter()
        .find(|p| prompt.starts_with(&format!("You are {}", p.name())))
}

/// Generator with a per-persona script and a fallback for everyone else.
pub struct ScriptedGenerator {
    rules: HashMap<Persona, Script>,
    fallback: Script,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    models: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(fallback: Script) -> Self {
        Self {
            rules: HashMap::new(),
            fallback,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: impl Into<String>) -> Self {
        Self::new(Script::Reply(reply.into()))
    }

    pub fn with(mut self, persona: Persona, script: Script) -> Self {
        self.rules.insert(persona, script);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn models(&self) -> Vec<String> {
        self.models.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        self.models
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(model.to_string());

        let script = persona_of(prompt)
            .and_then(|p| self.rules.get(&p))
            .unwrap_or(&self.fallback)
            .clone();

        match script {
            Script::Reply(text) => Ok(text),
            Script::Fail(msg) => Err(AgentError::Http(msg)),
            Script::Panic(msg) => panic!("{msg}"),
            Script::Hang => std::future::pending().await,
        }
    }
}

/// Text between `start` and the next blank line followed by `## `.
fn section<'a>(prompt: &'a str, start: &str) -> Option<&'a str> {
    let from = prompt.find(start)? + start.len();
    let rest = &prompt[from..];
    let end = rest.find("\n\n## ").unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Decimal fields reach the prompt as strings; accept either form.
fn num(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Consecutive moves at the end of a series: positive for higher closes,
/// negative for lower.
fn consecutive_trend(values: &[f64]) -> i32 {
    let mut count = 0i32;
    for pair in values.windows(2).rev() {
        let step = if pair[1] > pair[0] {
            1
        } else if pair[1] < pair[0] {
            -1
        } else {
            break;
        };
        if count != 0 && count.signum() != step {
            break;
        }
        count += step;
    }
    count
}

fn prices(context: &Value) -> Vec<f64> {
    context
        .get("historicalData")
        .and_then(Value::as_array)
        .map(|points| points.iter().filter_map(|p| num(p.get("price"))).collect())
        .unwrap_or_default()
}

fn evaluate_fundamental(market: &Value) -> String {
    match (num(market.get("volume24h")), num(market.get("marketCap"))) {
        (Some(volume), Some(cap)) if cap > 0.0 && volume / cap >= 0.01 => {
            decision_json("YES", 65, 1000, "Liquid relative to market cap")
        }
        (Some(_), Some(_)) => decision_json("NO", 55, 0, "Thin volume relative to market cap"),
        _ => decision_json("NO", 20, 0, "Insufficient fundamental data"),
    }
}

fn evaluate_quant(context: &Value) -> String {
    let series = prices(context);
    if series.len() < 3 {
        return decision_json("NO", 30, 0, "Fewer than 3 data points");
    }
    let trend = consecutive_trend(&series);
    if trend >= 2 {
        decision_json("YES", 70, 2000, &format!("{} consecutive higher prices", trend + 1))
    } else if trend <= -2 {
        decision_json("NO", 70, 0, &format!("{} consecutive lower prices", 1 - trend))
    } else {
        decision_json("NO", 40, 0, "No clear momentum")
    }
}

fn evaluate_sentiment(context: &Value) -> String {
    let Some(sentiment) = context.get("sentiment") else {
        return decision_json("NO", 10, 0, "No sentiment data");
    };
    let social = num(sentiment.get("socialScore")).unwrap_or(0.0);
    let news = num(sentiment.get("newsScore")).unwrap_or(0.0);
    match sentiment.get("trend").and_then(Value::as_str) {
        Some("bullish") if social > 0.0 && news > 0.0 => {
            decision_json("YES", 60, 300, "Bullish crowd and press")
        }
        Some("bearish") => decision_json("NO", 60, 0, "Bearish trend"),
        _ => decision_json("NO", 45, 0, "Mixed sentiment"),
    }
}

fn evaluate_risk(context: &Value) -> String {
    let Some(portfolio) = context.get("portfolio") else {
        return decision_json("NO", 30, 0, "Blind risk check: no portfolio");
    };
    let heat = num(portfolio.get("heat")).unwrap_or(100.0);
    let total = num(portfolio.get("totalValue")).unwrap_or(0.0);
    if heat > 80.0 {
        decision_json("NO", 90, 0, "Portfolio heat above limit - no new risk")
    } else if heat < 50.0 {
        decision_json("YES", 55, (total * 0.05).floor(), "Room in the risk budget")
    } else {
        decision_json("NO", 50, 0, "Heat elevated")
    }
}

fn evaluate_strategist(context: &Value) -> String {
    let rising = consecutive_trend(&prices(context)) >= 2;
    let bullish = context
        .get("sentiment")
        .and_then(|s| s.get("trend"))
        .and_then(Value::as_str)
        == Some("bullish");
    if rising && bullish {
        decision_json("YES", 60, 300, "Price and sentiment agree")
    } else {
        decision_json("NO", 50, 0, "No coherent thesis")
    }
}

/// Generator that answers like a disciplined committee member would, given
/// the data embedded in its prompt.
#[derive(Debug, Default)]
pub struct ScenarioGenerator;

#[async_trait]
impl TextGenerator for ScenarioGenerator {
    fn name(&self) -> &str {
        "scenario"
    }

    async fn generate(&self, prompt: &str, _model: &str) -> Result<String, AgentError> {
        let persona = persona_of(prompt)
            .ok_or_else(|| AgentError::Parse("Prompt names no persona".to_string()))?;
        let market: Value = serde_json::from_str(section(prompt, "## MARKET\n\n").unwrap_or("{}"))?;
        let context: Value =
            serde_json::from_str(section(prompt, "## CONTEXT\n\n").unwrap_or("{}"))?;

        let reply = match persona {
            Persona::Fundamental => evaluate_fundamental(&market),
            Persona::Quant => evaluate_quant(&context),
            Persona::Sentiment => evaluate_sentiment(&context),
            Persona::Risk => evaluate_risk(&context),
            Persona::Strategist => evaluate_strategist(&context),
        };
        Ok(format!("```json\n{reply}\n```"))
    }
}
