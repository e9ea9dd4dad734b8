//! Typed access to tool call arguments.

use crate::error::WeaveError;

/// Wrapper around parsed tool call arguments providing typed extraction.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    /// Wrap an already parsed JSON value.
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Parse raw argument text; blank text is treated as an empty object.
    pub fn parse(raw: &str) -> Result<Self, WeaveError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new(serde_json::json!({})));
        }
        serde_json::from_str(trimmed)
            .map(Self::new)
            .map_err(|e| WeaveError::Validation(format!("Malformed tool arguments: {e}")))
    }

    /// The underlying JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a required string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, WeaveError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| WeaveError::Validation(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument; `None` if missing or not a string.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get a required integer argument by key.
    pub fn get_i64(&self, key: &str) -> Result<i64, WeaveError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| WeaveError::Validation(format!("Missing integer argument: {key}")))
    }

    /// Get a required number argument by key. Integers are accepted.
    pub fn get_f64(&self, key: &str) -> Result<f64, WeaveError> {
        self.value
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| WeaveError::Validation(format!("Missing number argument: {key}")))
    }

    /// Get a required boolean argument by key.
    pub fn get_bool(&self, key: &str) -> Result<bool, WeaveError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| WeaveError::Validation(format!("Missing boolean argument: {key}")))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, WeaveError> {
        serde_json::from_value(self.value.clone())
            .map_err(|e| WeaveError::Validation(format!("Failed to deserialize arguments: {e}")))
    }
}
