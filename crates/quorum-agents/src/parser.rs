use std::str::FromStr;

use quorum_models::{AgentDecision, Direction};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::AgentError;

/// Extract the first JSON object from a string that may contain surrounding text.
///
/// Handles common model reply formats:
/// - Clean JSON: `{"key": "value"}`
/// - Markdown-wrapped: ```json\n{"key": "value"}\n```
/// - Prefix text: `Here is my decision:\n{"key": "value"}`
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && serde_json::from_str::<Value>(trimmed).is_ok() {
        return Ok(trimmed.to_string());
    }

    if let Some(json_str) = extract_from_markdown_block(trimmed) {
        if serde_json::from_str::<Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    if let Some(json_str) = extract_first_object(trimmed) {
        if serde_json::from_str::<Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    Err(AgentError::Parse(format!(
        "No valid JSON object found in response (length={})",
        text.len()
    )))
}

fn extract_from_markdown_block(text: &str) -> Option<String> {
    const FENCES: [&str; 4] = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

    FENCES.iter().find_map(|fence| {
        let body_start = text.find(fence)? + fence.len();
        let body_len = text[body_start..].find("```")?;
        Some(text[body_start..body_start + body_len].trim().to_string())
    })
}

/// First balanced `{ ... }`, ignoring braces inside string literals.
fn extract_first_object(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| text[s..=i].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// A candidate field that holds a JSON number.
enum JsonNumber {
    Exact(Decimal),
    /// Finite, but larger in magnitude than `Decimal::MAX`.
    OutOfRange(f64),
}

/// Accept only JSON numbers. Strings that look numeric are rejected.
fn json_number(value: Option<&Value>) -> Option<JsonNumber> {
    let Value::Number(n) = value? else {
        return None;
    };
    let repr = n.to_string();
    let float = n.as_f64();
    match Decimal::from_str(&repr)
        .or_else(|_| Decimal::from_scientific(&repr))
        .ok()
        .or_else(|| float.and_then(|f| Decimal::try_from(f).ok()))
    {
        Some(d) => Some(JsonNumber::Exact(d)),
        None => float.map(JsonNumber::OutOfRange),
    }
}

/// Check a candidate reply against the decision contract.
pub fn validate_decision(candidate: &Value) -> Result<AgentDecision, AgentError> {
    let Some(obj) = candidate.as_object() else {
        return Err(AgentError::Validation(
            "Invalid response: expected a JSON object".to_string(),
        ));
    };

    let direction = obj
        .get("direction")
        .and_then(Value::as_str)
        .and_then(Direction::parse)
        .ok_or_else(|| {
            AgentError::Validation("Invalid direction: must be YES or NO".to_string())
        })?;

    let confidence = match json_number(obj.get("confidence")) {
        Some(JsonNumber::Exact(c)) if c >= Decimal::ZERO && c <= Decimal::ONE_HUNDRED => c,
        _ => {
            return Err(AgentError::Validation(
                "Invalid confidence: must be a number between 0 and 100".to_string(),
            ))
        }
    };

    let size = match json_number(obj.get("size")) {
        Some(JsonNumber::Exact(s)) if s >= Decimal::ZERO => s,
        Some(JsonNumber::OutOfRange(f)) if f > 0.0 => {
            return Err(AgentError::Validation(
                "Invalid size: exceeds representable range".to_string(),
            ))
        }
        _ => {
            return Err(AgentError::Validation(
                "Invalid size: must be a non-negative number".to_string(),
            ))
        }
    };

    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::Validation("Invalid reasoning: must be a string".to_string()))?;

    Ok(AgentDecision {
        direction,
        confidence,
        size,
        reasoning: reasoning.to_string(),
    })
}

/// Parse and validate an AgentDecision from raw generator output.
pub fn parse_decision(raw: &str) -> Result<AgentDecision, AgentError> {
    let json_str = extract_json(raw)?;
    let candidate: Value = serde_json::from_str(&json_str)
        .map_err(|e| AgentError::Parse(format!("Failed to parse decision: {e}\nJSON: {json_str}")))?;
    validate_decision(&candidate)
}
