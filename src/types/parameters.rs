//! Validated generation parameters.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Result, WeaveError};
use crate::models::{ParameterKey, ParameterKind};

/// A recorded parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Number(f64),
    Integer(i64),
    Boolean(bool),
    Text(String),
    Json(serde_json::Value),
}

impl ParameterValue {
    /// Encode this value for a parameter of the given kind.
    pub fn encode(&self, kind: ParameterKind) -> serde_json::Value {
        use serde_json::Value;
        match (kind, self) {
            (ParameterKind::Number, Self::Number(n)) => serde_json::json!(n),
            (ParameterKind::Number, Self::Integer(i)) => serde_json::json!(*i as f64),
            (ParameterKind::Integer, Self::Integer(i)) => Value::from(*i),
            (ParameterKind::Boolean, Self::Boolean(b)) => Value::Bool(*b),
            (ParameterKind::Text, Self::Text(s)) => Value::String(s.clone()),
            (ParameterKind::Json, Self::Json(v)) => v.clone(),
            (ParameterKind::Json, Self::Text(s)) => {
                serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
            }
            (_, Self::Number(n)) => serde_json::json!(n),
            (_, Self::Integer(i)) => Value::from(*i),
            (_, Self::Boolean(b)) => Value::Bool(*b),
            (_, Self::Text(s)) => Value::String(s.clone()),
            (_, Self::Json(v)) => v.clone(),
        }
    }
}

/// Tool selection policy sent as `tool_choice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    None,
    Required,
    Function(String),
}

impl ToolChoice {
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Auto => "auto".into(),
            Self::None => "none".into(),
            Self::Required => "required".into(),
            Self::Function(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            }),
        }
    }
}

/// Reasoning effort level for reasoning models.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

/// Requested response format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
    JsonSchema {
        name: String,
        schema: serde_json::Value,
    },
}

pub(crate) fn is_valid_function_name(name: &str) -> bool {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("static regex"))
        .is_match(name)
}

/// Immutable, validated generation parameters keyed by parameter identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationParameters {
    values: BTreeMap<ParameterKey, ParameterValue>,
}

impl GenerationParameters {
    pub fn builder() -> ParameterBuilder {
        ParameterBuilder::default()
    }

    pub fn get(&self, key: ParameterKey) -> Option<&ParameterValue> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: ParameterKey) -> bool {
        self.values.contains_key(&key)
    }

    /// Entries in stable key order.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterKey, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Fluent accumulator; each setter validates its own input.
///
/// ```
/// use weave::types::{GenerationParameters, ToolChoice};
///
/// # fn main() -> weave::error::Result<()> {
/// let params = GenerationParameters::builder()
///     .temperature(0.2)?
///     .max_tokens(512)?
///     .tool_choice(ToolChoice::Auto)?
///     .build();
/// assert_eq!(params.len(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParameterBuilder {
    values: BTreeMap<ParameterKey, ParameterValue>,
}

impl ParameterBuilder {
    fn record(mut self, key: ParameterKey, value: ParameterValue) -> Self {
        self.values.insert(key, value);
        self
    }

    fn number_in(
        self,
        key: ParameterKey,
        value: f64,
        min: f64,
        max: f64,
        min_inclusive: bool,
    ) -> Result<Self> {
        let above_min = if min_inclusive { value >= min } else { value > min };
        if !value.is_finite() || !above_min || value > max {
            let open = if min_inclusive { "[" } else { "(" };
            return Err(WeaveError::Validation(format!(
                "{key} must be in {open}{min}, {max}], got {value}"
            )));
        }
        Ok(self.record(key, ParameterValue::Number(value)))
    }

    /// Sampling temperature in `[0, 2]`.
    pub fn temperature(self, value: f64) -> Result<Self> {
        self.number_in(ParameterKey::Temperature, value, 0.0, 2.0, true)
    }

    /// Nucleus sampling mass in `(0, 1]`.
    pub fn top_p(self, value: f64) -> Result<Self> {
        self.number_in(ParameterKey::TopP, value, 0.0, 1.0, false)
    }

    /// Minimum relative token probability in `[0, 1]`.
    pub fn min_p(self, value: f64) -> Result<Self> {
        self.number_in(ParameterKey::MinP, value, 0.0, 1.0, true)
    }

    /// Presence penalty in `[-2, 2]`.
    pub fn presence_penalty(self, value: f64) -> Result<Self> {
        self.number_in(ParameterKey::PresencePenalty, value, -2.0, 2.0, true)
    }

    /// Frequency penalty in `[-2, 2]`.
    pub fn frequency_penalty(self, value: f64) -> Result<Self> {
        self.number_in(ParameterKey::FrequencyPenalty, value, -2.0, 2.0, true)
    }

    /// Multiplicative repetition penalty in `(0, 2]`.
    /// Only open-weights profiles accept it.
    pub fn repetition_penalty(self, value: f64) -> Result<Self> {
        self.number_in(ParameterKey::RepetitionPenalty, value, 0.0, 2.0, false)
    }

    /// Sample from the `value` most likely tokens; must be at least 1.
    pub fn top_k(self, value: u32) -> Result<Self> {
        if value == 0 {
            return Err(WeaveError::Validation("top_k must be at least 1".into()));
        }
        Ok(self.record(ParameterKey::TopK, ParameterValue::Integer(value.into())))
    }

    /// Upper bound on generated tokens; must be at least 1.
    pub fn max_tokens(self, value: u32) -> Result<Self> {
        if value == 0 {
            return Err(WeaveError::Validation("max_tokens must be at least 1".into()));
        }
        Ok(self.record(ParameterKey::MaxTokens, ParameterValue::Integer(value.into())))
    }

    /// Seed for best-effort deterministic sampling. Any value is accepted.
    pub fn seed(self, value: i64) -> Result<Self> {
        Ok(self.record(ParameterKey::Seed, ParameterValue::Integer(value)))
    }

    /// Number of alternatives reported per token, at most 20.
    pub fn top_logprobs(self, value: u8) -> Result<Self> {
        if value > 20 {
            return Err(WeaveError::Validation(format!(
                "top_logprobs must be in [0, 20], got {value}"
            )));
        }
        Ok(self.record(ParameterKey::TopLogprobs, ParameterValue::Integer(value.into())))
    }

    pub fn logprobs(self, value: bool) -> Result<Self> {
        Ok(self.record(ParameterKey::Logprobs, ParameterValue::Boolean(value)))
    }

    pub fn parallel_tool_calls(self, value: bool) -> Result<Self> {
        Ok(self.record(ParameterKey::ParallelToolCalls, ParameterValue::Boolean(value)))
    }

    /// One to four non-empty stop sequences.
    pub fn stop<I, S>(self, sequences: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sequences: Vec<String> = sequences.into_iter().map(Into::into).collect();
        if sequences.is_empty() || sequences.len() > 4 {
            return Err(WeaveError::Validation(format!(
                "stop accepts 1 to 4 sequences, got {}",
                sequences.len()
            )));
        }
        if sequences.iter().any(String::is_empty) {
            return Err(WeaveError::Validation("stop sequences must be non-empty".into()));
        }
        Ok(self.record(
            ParameterKey::Stop,
            ParameterValue::Json(serde_json::json!(sequences)),
        ))
    }

    /// Default tool choice. A forced-text turn overrides it.
    pub fn tool_choice(self, choice: ToolChoice) -> Result<Self> {
        if let ToolChoice::Function(ref name) = choice {
            if !is_valid_function_name(name) {
                return Err(WeaveError::Validation(format!(
                    "tool_choice function name '{name}' is not a valid tool name"
                )));
            }
        }
        let value = choice.to_value();
        Ok(self.record(ParameterKey::ToolChoice, ParameterValue::Json(value)))
    }

    /// Output format. Schema formats are sent with `strict: true`.
    pub fn response_format(self, format: ResponseFormat) -> Result<Self> {
        let value = match format {
            ResponseFormat::Text => serde_json::json!({ "type": "text" }),
            ResponseFormat::JsonObject => serde_json::json!({ "type": "json_object" }),
            ResponseFormat::JsonSchema { name, schema } => {
                if !is_valid_function_name(&name) {
                    return Err(WeaveError::Validation(format!(
                        "response_format schema name '{name}' is invalid"
                    )));
                }
                if !schema.is_object() {
                    return Err(WeaveError::Validation(
                        "response_format schema must be a JSON object".into(),
                    ));
                }
                serde_json::json!({
                    "type": "json_schema",
                    "json_schema": { "name": name, "schema": schema, "strict": true },
                })
            }
        };
        Ok(self.record(ParameterKey::ResponseFormat, ParameterValue::Json(value)))
    }

    pub fn reasoning_effort(self, effort: ReasoningEffort) -> Result<Self> {
        Ok(self.record(
            ParameterKey::ReasoningEffort,
            ParameterValue::Text(effort.to_string()),
        ))
    }

    /// Parse-and-set variant for string inputs (config files, CLI flags).
    pub fn reasoning_effort_str(self, effort: &str) -> Result<Self> {
        let parsed: ReasoningEffort = effort.parse().map_err(|_| {
            WeaveError::Validation(format!(
                "reasoning_effort must be one of low, medium, high; got '{effort}'"
            ))
        })?;
        self.reasoning_effort(parsed)
    }

    /// End-user identifier forwarded to the service.
    pub fn user(self, user: impl Into<String>) -> Result<Self> {
        let user = user.into();
        if user.trim().is_empty() {
            return Err(WeaveError::Validation("user must be non-empty".into()));
        }
        Ok(self.record(ParameterKey::User, ParameterValue::Text(user)))
    }

    pub fn build(self) -> GenerationParameters {
        GenerationParameters {
            values: self.values,
        }
    }
}
