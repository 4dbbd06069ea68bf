//! Parameter Rules
//!
//! Declarative bounds, defaults and precision for each tunable generation
//! parameter. Validation never fails: out-of-range values are clamped,
//! values are rounded to the rule's precision and missing parameters take
//! the rule's default.
//!
//! ## Strategy
//! - The rule set is the single source of truth for what is tunable
//! - Unknown parameter names are ignored
//! - Non-finite values are treated as absent

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tunable generation parameter
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Temperature,
    TopP,
    PresencePenalty,
    FrequencyPenalty,
    MaxTokens,
}

impl ParamKind {
    pub const ALL: [ParamKind; 5] = [
        ParamKind::Temperature,
        ParamKind::TopP,
        ParamKind::PresencePenalty,
        ParamKind::FrequencyPenalty,
        ParamKind::MaxTokens,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::TopP => "top_p",
            Self::PresencePenalty => "presence_penalty",
            Self::FrequencyPenalty => "frequency_penalty",
            Self::MaxTokens => "max_tokens",
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ParamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown parameter: {}", s))
    }
}

/// Bounds, default and decimal precision for one parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterRule {
    pub min: f64,
    pub max: f64,
    pub default: f64,
    /// Decimal digits kept after rounding (0 = integer)
    pub precision: u32,
}

impl ParameterRule {
    pub const fn new(min: f64, max: f64, default: f64, precision: u32) -> Self {
        Self {
            min,
            max,
            default,
            precision,
        }
    }

    /// `min <= default <= max`
    pub fn is_consistent(&self) -> bool {
        self.min <= self.default && self.default <= self.max
    }

    /// Clamp into `[min, max]` and round to precision; `None` yields the default
    pub fn normalize(&self, value: Option<f64>) -> f64 {
        match value {
            Some(v) if v.is_finite() => {
                round_to(v.clamp(self.min, self.max), self.precision).clamp(self.min, self.max)
            }
            _ => self.default,
        }
    }
}

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Caller-supplied parameters, keyed by name
pub type RequestedParams = HashMap<String, f64>;

/// Per-model mapping from parameter to rule
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterRuleSet {
    rules: BTreeMap<ParamKind, ParameterRule>,
}

impl ParameterRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, kind: ParamKind, rule: ParameterRule) -> Self {
        self.rules.insert(kind, rule);
        self
    }

    pub fn get(&self, kind: ParamKind) -> Option<&ParameterRule> {
        self.rules.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamKind, &ParameterRule)> {
        self.rules.iter().map(|(k, r)| (*k, r))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Normalize requested parameters against this rule set
    pub fn validate(&self, requested: &RequestedParams) -> ModelParams {
        for name in requested.keys() {
            if !name
                .parse::<ParamKind>()
                .is_ok_and(|k| self.rules.contains_key(&k))
            {
                debug!("Ignoring untunable parameter: {}", name);
            }
        }

        let values = self
            .rules
            .iter()
            .map(|(kind, rule)| {
                let value = rule.normalize(requested.get(kind.as_str()).copied());
                (*kind, value)
            })
            .collect();

        ModelParams { values }
    }
}

/// Normalized parameters: one value per rule in the set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ModelParams {
    values: BTreeMap<ParamKind, f64>,
}

impl ModelParams {
    pub fn get(&self, kind: ParamKind) -> Option<f64> {
        self.values.get(&kind).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamKind, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn temperature(&self) -> Option<f64> {
        self.get(ParamKind::Temperature)
    }

    pub fn top_p(&self) -> Option<f64> {
        self.get(ParamKind::TopP)
    }

    pub fn presence_penalty(&self) -> Option<f64> {
        self.get(ParamKind::PresencePenalty)
    }

    pub fn frequency_penalty(&self) -> Option<f64> {
        self.get(ParamKind::FrequencyPenalty)
    }

    /// max_tokens as an integer (its rule has precision 0)
    pub fn max_tokens(&self) -> Option<u32> {
        self.get(ParamKind::MaxTokens).map(|v| v.max(0.0) as u32)
    }
}
