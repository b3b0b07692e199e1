use quorum_models::{AgentContext, MarketData};

use crate::error::AgentError;
use crate::persona::Persona;

/// Reply schema shared by every persona prompt.
fn response_schema() -> String {
    let example = serde_json::json!({
        "direction": "YES",
        "confidence": 72,
        "size": 1500,
        "reasoning": "<concise justification naming the signals used>"
    });
    serde_json::to_string_pretty(&example).unwrap_or_default()
}

const DATA_FORMAT: &str = "## DATA FORMAT\n\n\
     The MARKET block is a JSON object with `symbol`, `price`, and optionally \
     `volume24h`, `marketCap`, `question` and venue-specific extra fields.\n\
     The CONTEXT block may contain:\n\
     - `portfolio` → {\"totalValue\", \"positions\": [{\"symbol\", \"size\", \"pnl\"}], \
     \"heat\": percent of risk budget in use}\n\
     - `historicalData` → array of {\"date\", \"price\", \"volume\"}, oldest first\n\
     - `sentiment` → {\"socialScore\", \"newsScore\", \"trend\": bullish|bearish|neutral}\n\
     - `marketData` → a second market snapshot, if the caller has one\n\
     Decimal fields such as `price`, `volume24h`, `totalValue`, `heat` and the \
     scores are written as quoted strings (`\"price\": \"150.25\"`). Read them as \
     numbers.\n\
     Any section may be missing. Never invent data that is not present.\n\n";

fn fundamental_instructions() -> &'static str {
    "You judge intrinsic value. Focus on what the instrument is worth, not \
     where it traded last week.\n\n\
     ## INTERPRETATION RULES\n\n\
     ### Valuation\n\
     - Compare `price` against `marketCap` and `volume24h`: thin volume relative \
     to market cap means the price is easy to push around → lower confidence\n\
     - A market question with a clear, verifiable resolution is more analyzable \
     than a vague one\n\
     - Prefer NO when the fundamentals are unknown rather than guessing\n\n\
     ### Sizing\n\
     - Size grows with conviction in the valuation gap, never with momentum alone\n\n\
     ## WARNING CONDITIONS\n\n\
     - No `marketCap` and no `volume24h`: \"Insufficient fundamental data\"\n"
}

fn quant_instructions() -> &'static str {
    "You trade statistics. Focus on price and volume history.\n\n\
     ## INTERPRETATION RULES\n\n\
     ### Momentum\n\
     - 3+ consecutive higher prices in `historicalData`: uptrend → favors YES\n\
     - 3+ consecutive lower prices: downtrend → favors NO\n\
     - Price move confirmed by rising volume is stronger than one on falling volume\n\n\
     ### Volatility\n\
     - Large day-over-day swings (> 10%) reduce confidence and size\n\
     - Fewer than 3 data points: confidence at most 40\n\n\
     ## WARNING CONDITIONS\n\n\
     - Price up while volume falls: \"Momentum not confirmed by volume\"\n"
}

fn sentiment_instructions() -> &'static str {
    "You read the crowd. Focus on the `sentiment` section.\n\n\
     ## INTERPRETATION RULES\n\n\
     ### Scores\n\
     - `socialScore` and `newsScore` both positive with trend bullish → favors YES\n\
     - Both negative or trend bearish → favors NO\n\
     - Social and news disagreeing: report the divergence, keep confidence below 60\n\n\
     ### Source Weighting\n\
     - News sentiment: Weight 1.0x (slower, more reliable)\n\
     - Social sentiment: Weight 0.6x (fast but noisy)\n\n\
     ## WARNING CONDITIONS\n\n\
     - No `sentiment` section: answer NO with low confidence and say so\n"
}

fn risk_instructions() -> &'static str {
    "You protect capital. Focus on the `portfolio` section and on how much \
     could be lost.\n\n\
     ## INTERPRETATION RULES\n\n\
     ### Portfolio Heat\n\
     - `heat` > 80: risk budget exhausted → NO regardless of opportunity\n\
     - `heat` 50-80: cut any size by half\n\
     - `heat` < 50: normal sizing\n\n\
     ### Concentration\n\
     - An existing position in the same symbol counts against a new one\n\
     - Positions with large negative `pnl` argue for reducing exposure\n\n\
     ### Sizing\n\
     - Never size above 5% of `totalValue`\n\n\
     ## WARNING CONDITIONS\n\n\
     - `heat` > 80: \"Portfolio heat above limit - no new risk\"\n\
     - No `portfolio` section: keep size small and say the check was blind\n"
}

fn strategist_instructions() -> &'static str {
    "You set direction for the whole book. Weigh every section of the context \
     together and decide whether this trade fits the current plan.\n\n\
     ## INTERPRETATION RULES\n\n\
     ### Fit\n\
     - Favor trades that diversify the existing `positions`\n\
     - Favor trades whose signals agree across price history and sentiment\n\
     - Conflicting signals across sections → NO or a small size\n\n\
     ### Timing\n\
     - A good idea at a bad moment is still a NO today\n\n\
     ## WARNING CONDITIONS\n\n\
     - Every available signal disagrees with the others: \"No coherent thesis\"\n"
}

fn persona_instructions(persona: Persona) -> &'static str {
    match persona {
        Persona::Fundamental => fundamental_instructions(),
        Persona::Quant => quant_instructions(),
        Persona::Sentiment => sentiment_instructions(),
        Persona::Risk => risk_instructions(),
        Persona::Strategist => strategist_instructions(),
    }
}

/// Build the full prompt for a persona evaluating one market.
pub fn build_prompt(
    persona: Persona,
    market: &MarketData,
    context: &AgentContext,
) -> Result<String, AgentError> {
    let market_json = serde_json::to_string_pretty(market)?;
    let context_json = serde_json::to_string_pretty(context)?;

    let question = market
        .question
        .as_deref()
        .map(|q| format!("Question under evaluation: {q}\n\n"))
        .unwrap_or_default();

    Ok(format!(
        "You are {name}, the {label} on the investment committee of an AI-driven \
         hedge fund. Decide whether the fund should take this position.\n\n\
         {instructions}\n\
         {DATA_FORMAT}\
         {question}\
         ## MARKET\n\n{market_json}\n\n\
         ## CONTEXT\n\n{context_json}\n\n\
         ## RESPONSE\n\n\
         You MUST respond with ONLY a JSON object matching this schema:\n\
         {schema}\n\n\
         - `direction`: \"YES\" to take the position, \"NO\" to pass\n\
         - `confidence`: a number from 0 to 100\n\
         - `size`: position size in USD, a number >= 0 (0 when direction is NO)\n\
         - `reasoning`: a string\n\
         Respond with ONLY the JSON object, no other text.",
        name = persona.name(),
        label = persona.label(),
        instructions = persona_instructions(persona),
        schema = response_schema(),
    ))
}
