//! Configuration loading, validation, and management for toolpilot.
//!
//! Loads configuration from `~/.toolpilot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.toolpilot/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Planning oracle connection
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Orchestration loop behavior
    #[serde(default)]
    pub agent: LoopConfig,

    /// Built-in tool selection
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// "ollama", "openai", "openrouter" or "custom"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Overrides the provider's default endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request HTTP timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Completion length cap sent with each request; unset leaves it to the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "mistral".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_timeout_secs() -> u64 {
    120
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for PlannerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannerConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            max_tokens: None,
            api_key: None,
        }
    }
}

/// How the loop decides that enough information has been gathered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndTurnMode {
    /// Ask the planning oracle a yes/no question after each dispatch.
    #[default]
    Oracle,
    /// Use the denylist goal heuristic over the latest result.
    Heuristic,
    /// Only stop on END_TURN or an exhausted step budget.
    Never,
}

/// Whether history survives from one turn to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryMode {
    /// Fresh context for every turn.
    #[default]
    PerTurn,
    /// The previous turn's records are visible to the next one.
    Carry,
}

/// A worked example shown to the planner on the first step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleConfig {
    pub query: String,
    pub action: String,
    #[serde(default = "empty_args")]
    pub args: serde_json::Value,
}

fn empty_args() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Maximum planning/dispatch rounds per turn
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Allow the META_QUERY control action
    #[serde(default = "default_true")]
    pub enable_meta_query: bool,

    /// Allow the REQUEST_CLARIFICATION control action
    #[serde(default = "default_true")]
    pub enable_clarification: bool,

    /// Check planner actions against the vocabulary (with one repair)
    #[serde(default = "default_true")]
    pub strict_validation: bool,

    #[serde(default)]
    pub end_turn: EndTurnMode,

    #[serde(default)]
    pub history: HistoryMode,

    /// Records kept when history is carried; older ones are dropped first
    #[serde(default = "default_max_history_records")]
    pub max_history_records: usize,

    /// Worked examples; empty means the built-in set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExampleConfig>,
}

fn default_max_steps() -> usize {
    8
}
fn default_max_history_records() -> usize {
    32
}
fn default_true() -> bool {
    true
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            enable_meta_query: true,
            enable_clarification: true,
            strict_validation: true,
            end_turn: EndTurnMode::default(),
            history: HistoryMode::default(),
            max_history_records: default_max_history_records(),
            examples: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Names of built-in tools to register
    #[serde(default = "default_enabled_tools")]
    pub enabled: Vec<String>,
}

fn default_enabled_tools() -> Vec<String> {
    vec!["get_current_time".into()]
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_tools(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.toolpilot/config.toml).
    ///
    /// Environment overrides:
    /// - `TOOLPILOT_API_KEY` (then `OPENAI_API_KEY`, `OPENROUTER_API_KEY`)
    /// - `TOOLPILOT_PROVIDER`, `TOOLPILOT_MODEL`, `TOOLPILOT_BASE_URL`
    /// - `TOOLPILOT_MAX_STEPS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if self.planner.api_key.is_none() {
            self.planner.api_key = lookup("TOOLPILOT_API_KEY")
                .or_else(|| lookup("OPENAI_API_KEY"))
                .or_else(|| lookup("OPENROUTER_API_KEY"));
        }

        if let Some(provider) = lookup("TOOLPILOT_PROVIDER") {
            self.planner.provider = provider;
        }

        if let Some(model) = lookup("TOOLPILOT_MODEL") {
            self.planner.model = model;
        }

        if let Some(url) = lookup("TOOLPILOT_BASE_URL") {
            self.planner.base_url = Some(url);
        }

        if let Some(raw) = lookup("TOOLPILOT_MAX_STEPS") {
            self.agent.max_steps = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("TOOLPILOT_MAX_STEPS is not a number: {raw}"))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".toolpilot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.planner.temperature < 0.0 || self.planner.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "planner.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.planner.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "planner.timeout_secs must be > 0".into(),
            ));
        }

        if self.planner.max_tokens == Some(0) {
            return Err(ConfigError::ValidationError(
                "planner.max_tokens must be > 0".into(),
            ));
        }

        if !matches!(
            self.planner.provider.as_str(),
            "ollama" | "openai" | "openrouter" | "custom"
        ) {
            return Err(ConfigError::ValidationError(format!(
                "unknown planner.provider '{}'",
                self.planner.provider
            )));
        }

        if self.planner.provider == "custom" && self.planner.base_url.is_none() {
            return Err(ConfigError::ValidationError(
                "planner.base_url is required for the custom provider".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.agent.max_history_records == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_history_records must be at least 1".into(),
            ));
        }

        if let Some(bad) = self.agent.examples.iter().find(|e| !e.args.is_object()) {
            return Err(ConfigError::ValidationError(format!(
                "agent.examples: args for '{}' must be a table",
                bad.query
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for toolpilot_core::Error {
    fn from(e: ConfigError) -> Self {
        toolpilot_core::Error::Config {
            message: e.to_string(),
        }
    }
}
