//! Kernel configuration
//!
//! Every section has serde defaults, so a partial JSON document (or none at
//! all) yields a working configuration. A handful of environment variables
//! override the file for deployment-specific values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::error::EditorError;
use super::types::Language;

/// Overrides the generation endpoint
pub const ENDPOINT_ENV: &str = "THINKMAP_ENDPOINT";
/// Comma-separated model list override
pub const MODELS_ENV: &str = "THINKMAP_MODELS";
/// UI language override (`en` | `zh`)
pub const LANGUAGE_ENV: &str = "THINKMAP_LANGUAGE";

/// Models fanned out to when the caller does not choose
pub const DEFAULT_MODELS: [&str; 5] = ["qwen", "deepseek", "kimi", "hunyuan", "doubao"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_history_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_size: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_ms: u64,
    pub max_results: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 600_000,
            max_results: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Absolute URL, or a path resolved against the page origin in the browser
    pub endpoint: String,
    pub models: Vec<String>,
    /// Native transport timeout; the browser applies its own
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "/api/generate_graph".to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Treat template placeholder text as incomplete when gating learning mode
    pub reject_placeholders: bool,
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub history: HistoryConfig,
    pub cache: CacheConfig,
    pub engine: EngineConfig,
    pub validator: ValidatorConfig,
    pub language: Language,
}

impl KernelConfig {
    pub fn from_json_str(input: &str) -> Result<Self, EditorError> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| EditorError::config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EditorError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EditorError::config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Apply `THINKMAP_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self, EditorError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Same as [`KernelConfig::with_env_overrides`] with an injectable lookup
    pub fn with_overrides_from(
        mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, EditorError> {
        if let Some(endpoint) = env(ENDPOINT_ENV).filter(|e| !e.trim().is_empty()) {
            self.engine.endpoint = endpoint.trim().to_string();
        }
        if let Some(models) = env(MODELS_ENV) {
            let models = parse_model_list(&models);
            if !models.is_empty() {
                self.engine.models = models;
            }
        }
        if let Some(language) = env(LANGUAGE_ENV) {
            self.language = language.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), EditorError> {
        if self.history.max_history_size == 0 {
            return Err(EditorError::config("history.max_history_size must be > 0"));
        }
        if self.cache.ttl_ms == 0 {
            return Err(EditorError::config("cache.ttl_ms must be > 0"));
        }
        if self.cache.max_results == 0 {
            return Err(EditorError::config("cache.max_results must be > 0"));
        }
        if self.engine.endpoint.trim().is_empty() {
            return Err(EditorError::config("engine.endpoint must not be empty"));
        }
        Ok(())
    }
}

/// Split a comma-separated model list, dropping blanks and duplicates
pub fn parse_model_list(input: &str) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for model in input.split(',').map(str::trim).filter(|m| !m.is_empty()) {
        if !models.iter().any(|m| m == model) {
            models.push(model.to_string());
        }
    }
    models
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.history.max_history_size, 50);
        assert_eq!(config.cache.ttl_ms, 600_000);
        assert_eq!(config.cache.max_results, 5);
        assert_eq!(config.engine.models.len(), 5);
        assert!(!config.validator.reject_placeholders);
        assert_eq!(config.language, Language::En);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = KernelConfig::from_json_str(r#"{ "history": { "max_history_size": 10 } }"#)
            .unwrap();
        assert_eq!(config.history.max_history_size, 10);
        assert_eq!(config.cache.ttl_ms, 600_000);
    }

    #[test]
    fn test_rejects_zero_history() {
        let err = KernelConfig::from_json_str(r#"{ "history": { "max_history_size": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, EditorError::Config { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env = |key: &str| match key {
            ENDPOINT_ENV => Some("http://localhost:9527/api/generate_graph".to_string()),
            MODELS_ENV => Some("qwen, kimi,,qwen".to_string()),
            LANGUAGE_ENV => Some("zh".to_string()),
            _ => None,
        };
        let config = KernelConfig::default().with_overrides_from(env).unwrap();
        assert_eq!(config.engine.endpoint, "http://localhost:9527/api/generate_graph");
        assert_eq!(config.engine.models, vec!["qwen", "kimi"]);
        assert_eq!(config.language, Language::Zh);
    }

    #[test]
    fn test_bad_language_override() {
        let env = |key: &str| (key == LANGUAGE_ENV).then(|| "fr".to_string());
        assert!(KernelConfig::default().with_overrides_from(env).is_err());
    }
}
