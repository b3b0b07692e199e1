use std::fmt;

/// The analytical roles on the committee. Personas only shape the prompt;
/// evaluation logic is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    Fundamental,
    Quant,
    Sentiment,
    Risk,
    Strategist,
}

impl Persona {
    /// Roster in declaration order. Runner output follows this order.
    pub const ROSTER: [Persona; 5] = [
        Persona::Fundamental,
        Persona::Quant,
        Persona::Sentiment,
        Persona::Risk,
        Persona::Strategist,
    ];

    /// Agent name used in outputs and for weight lookups.
    pub fn name(&self) -> &'static str {
        match self {
            Persona::Fundamental => "FundamentalAgent",
            Persona::Quant => "QuantAgent",
            Persona::Sentiment => "SentimentAgent",
            Persona::Risk => "RiskAgent",
            Persona::Strategist => "StrategistAgent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Persona::Fundamental => "Fundamental Analyst",
            Persona::Quant => "Quantitative Analyst",
            Persona::Sentiment => "Sentiment Analyst",
            Persona::Risk => "Risk Manager",
            Persona::Strategist => "Chief Strategist",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ROSTER.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
