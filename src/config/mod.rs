//! Layered configuration: defaults < TOML file < environment < code.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::agent_loop::RunLimits;
use crate::error::{Result, WeaveError};

pub const DEFAULT_BASE_URL: &str = "https://api.weave.dev";
pub const DEFAULT_CHAT_PATH: &str = "/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Resolved client configuration.
#[derive(Clone)]
pub struct WeaveConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub chat_path: String,
    pub system_message: Option<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub limits: RunLimits,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            system_message: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(120),
            limits: RunLimits::default(),
        }
    }
}

impl std::fmt::Debug for WeaveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeaveConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("chat_path", &self.chat_path)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

/// On-disk shape; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    chat_path: Option<String>,
    system_message: Option<String>,
    connect_timeout_ms: Option<u64>,
    read_timeout_ms: Option<u64>,
    max_iterations: Option<usize>,
    turn_timeout_ms: Option<u64>,
    tool_batch_timeout_ms: Option<u64>,
}

impl WeaveConfig {
    /// Default config file location (`<config dir>/weave/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "weave", "weave")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load defaults, then the config file (if present), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);
        if let Some(path) = path.filter(|p| p.exists()) {
            config.apply_file(&path)?;
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Environment-only configuration on top of defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay a TOML file. On error `self` is left as it was.
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&text).map_err(|e| {
            WeaveError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })?;

        let mut next = self.clone();
        if let Some(v) = file.base_url {
            next.base_url = v;
        }
        if let Some(v) = file.api_key {
            next.api_key = Some(v);
        }
        if let Some(v) = file.model {
            next.model = v;
        }
        if let Some(v) = file.chat_path {
            next.chat_path = v;
        }
        if let Some(v) = file.system_message {
            next.system_message = Some(v);
        }
        if let Some(ms) = file.connect_timeout_ms {
            next.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.read_timeout_ms {
            next.read_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = file.max_iterations {
            next.limits.max_iterations = n;
        }
        if let Some(ms) = file.turn_timeout_ms {
            next.limits.turn_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(ms) = file.tool_batch_timeout_ms {
            next.limits.tool_batch_timeout = Some(Duration::from_millis(ms));
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Apply `WEAVE_*` variables from `lookup`. On error `self` is left as it was.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let mut next = self.clone();
        if let Some(v) = lookup("WEAVE_API_KEY") {
            next.api_key = Some(v);
        }
        if let Some(v) = lookup("WEAVE_BASE_URL") {
            next.base_url = v;
        }
        if let Some(v) = lookup("WEAVE_MODEL") {
            next.model = v;
        }
        if let Some(v) = lookup("WEAVE_MAX_ITERATIONS") {
            next.limits.max_iterations = v.parse().map_err(|_| {
                WeaveError::Configuration(format!("WEAVE_MAX_ITERATIONS must be an integer, got '{v}'"))
            })?;
        }
        if let Some(v) = lookup("WEAVE_TURN_TIMEOUT_MS") {
            let ms: u64 = v.parse().map_err(|_| {
                WeaveError::Configuration(format!("WEAVE_TURN_TIMEOUT_MS must be an integer, got '{v}'"))
            })?;
            next.limits.turn_timeout = Some(Duration::from_millis(ms));
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.limits.max_iterations == 0 {
            return Err(WeaveError::Configuration(
                "max_iterations must be at least 1".into(),
            ));
        }
        if !self.chat_path.starts_with('/') {
            return Err(WeaveError::Configuration(format!(
                "chat_path must start with '/', got '{}'",
                self.chat_path
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn file_then_env_layering() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "model = \"o3-mini\"\napi_key = \"from-file\"\nmax_iterations = 4\ntool_batch_timeout_ms = 2500"
        )
        .unwrap();

        let mut config = WeaveConfig::default();
        config.apply_file(file.path()).unwrap();
        config
            .apply_env(env(&[("WEAVE_API_KEY", "from-env")]))
            .unwrap();

        assert_eq!(config.model, "o3-mini");
        assert_eq!(config.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.limits.max_iterations, 4);
        assert_eq!(
            config.limits.tool_batch_timeout,
            Some(Duration::from_millis(2500))
        );
    }

    #[test]
    fn rejects_unknown_file_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "modle = \"typo\"").unwrap();
        let err = WeaveConfig::default().apply_file(file.path()).unwrap_err();
        assert!(matches!(err, WeaveError::Configuration(_)));
    }

    #[test]
    fn rejects_bad_env_values() {
        let mut config = WeaveConfig::default();
        assert!(config
            .apply_env(env(&[("WEAVE_MAX_ITERATIONS", "lots")]))
            .is_err());
        assert!(config
            .apply_env(env(&[("WEAVE_MAX_ITERATIONS", "0")]))
            .is_err());
    }

    #[test]
    fn rejected_env_leaves_config_untouched() {
        let mut config = WeaveConfig::default();
        let err = config
            .apply_env(env(&[("WEAVE_MODEL", "o3-mini"), ("WEAVE_MAX_ITERATIONS", "0")]))
            .unwrap_err();
        assert!(matches!(err, WeaveError::Configuration(_)));
        assert_eq!(config.limits.max_iterations, RunLimits::default().max_iterations);
        assert_eq!(config.model, DEFAULT_MODEL);

        config
            .apply_env(env(&[("WEAVE_API_KEY", "k"), ("WEAVE_TURN_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn rejected_file_leaves_config_untouched() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model = \"o3-mini\"\nchat_path = \"v1/chat\"").unwrap();

        let mut config = WeaveConfig::default();
        let err = config.apply_file(file.path()).unwrap_err();
        assert!(matches!(err, WeaveError::Configuration(_)));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.chat_path, DEFAULT_CHAT_PATH);
    }

    #[test]
    fn env_sets_turn_timeout() {
        let mut config = WeaveConfig::default();
        config
            .apply_env(env(&[("WEAVE_TURN_TIMEOUT_MS", "1500"), ("WEAVE_MODEL", "llama-3.1-8b")]))
            .unwrap();
        assert_eq!(config.limits.turn_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.model, "llama-3.1-8b");
    }
}
