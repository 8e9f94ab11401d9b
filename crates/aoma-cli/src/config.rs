//! Configuration for the AOMA pipeline
//!
//! Defaults, then an optional YAML file, then environment overrides.

use aoma_core::{CoreError, ExecutionMode, RetryPolicy};
use aoma_monitoring::{MonitoringConfig, DEFAULT_LOG_FILTER};
use aoma_reasoning::{AnthropicConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Anthropic API key, required for live runs
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Messages API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Bound on a single reasoning call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Retries after the first attempt of a step
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Growth factor between retry delays
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound on a retry delay
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Step scheduling
    #[serde(default)]
    pub execution_mode: ExecutionMode,

    /// Root of runs, reports and archives
    #[serde(default = "default_outputs_dir")]
    pub outputs_dir: PathBuf,

    /// Archives kept after a full run
    #[serde(default = "default_keep_archives")]
    pub keep_archives: usize,

    /// JSON file of source documents
    #[serde(default)]
    pub sources_file: Option<PathBuf>,

    /// Log filter
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// JSON stdout logs
    #[serde(default)]
    pub json_logs: bool,

    /// Directory of rotated log files
    #[serde(default = "default_log_dir")]
    pub log_dir: Option<PathBuf>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_backoff() -> u64 {
    30_000
}

fn default_outputs_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_keep_archives() -> usize {
    10
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_log_dir() -> Option<PathBuf> {
    Some(PathBuf::from("logs"))
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            api_base: default_api_base(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff(),
            execution_mode: ExecutionMode::default(),
            outputs_dir: default_outputs_dir(),
            keep_archives: default_keep_archives(),
            sources_file: None,
            log_filter: default_log_filter(),
            json_logs: false,
            log_dir: default_log_dir(),
        }
    }
}

/// Parse an override, keeping the current value when it is invalid
fn parse_into<T: FromStr>(target: &mut T, name: &str, raw: &str, warnings: &mut Vec<String>) {
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => warnings.push(format!("Ignoring invalid {} value: {:?}", name, raw)),
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl PipelineConfig {
    /// Load from the optional YAML file and the process environment.
    ///
    /// Runs before logging is initialized, so problems that do not prevent a
    /// run are returned as warnings for [`log_loaded`](Self::log_loaded).
    pub fn load(path: Option<&Path>) -> Result<(Self, Vec<String>), CoreError> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        let mut warnings = config.apply_env(|key| env::var(key).ok());
        config.validate()?;
        warnings.extend(config.startup_warnings());
        Ok((config, warnings))
    }

    /// Log the loaded configuration and the warnings collected while loading it
    pub fn log_loaded(&self, warnings: &[String]) {
        for warning in warnings {
            warn!("{}", warning);
        }
        info!(
            model = %self.model,
            mode = ?self.execution_mode,
            outputs_dir = %self.outputs_dir.display(),
            live = self.api_key.is_some(),
            "Loaded pipeline configuration"
        );
    }

    /// Parse a YAML file; missing fields take their defaults
    pub fn from_yaml_file(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::ConfigurationError(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
            .map_err(|e| CoreError::ConfigurationError(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Parse YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Apply environment overrides through the given lookup.
    ///
    /// Returns one warning per override that could not be parsed.
    #[must_use]
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(api_key) = lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(api_key);
        }
        if let Some(model) = lookup("ANTHROPIC_MODEL") {
            self.model = model;
        }
        if let Some(api_base) = lookup("ANTHROPIC_API_BASE") {
            self.api_base = api_base;
        }
        if let Some(raw) = lookup("AOMA_REQUEST_TIMEOUT_SECS") {
            parse_into(&mut self.request_timeout_secs, "AOMA_REQUEST_TIMEOUT_SECS", &raw, &mut warnings);
        }
        if let Some(raw) = lookup("AOMA_MAX_RETRIES") {
            parse_into(&mut self.max_retries, "AOMA_MAX_RETRIES", &raw, &mut warnings);
        }
        if let Some(raw) = lookup("AOMA_INITIAL_BACKOFF_MS") {
            parse_into(&mut self.initial_backoff_ms, "AOMA_INITIAL_BACKOFF_MS", &raw, &mut warnings);
        }
        if let Some(raw) = lookup("AOMA_BACKOFF_MULTIPLIER") {
            parse_into(&mut self.backoff_multiplier, "AOMA_BACKOFF_MULTIPLIER", &raw, &mut warnings);
        }
        if let Some(raw) = lookup("AOMA_MAX_BACKOFF_MS") {
            parse_into(&mut self.max_backoff_ms, "AOMA_MAX_BACKOFF_MS", &raw, &mut warnings);
        }
        if let Some(raw) = lookup("AOMA_EXECUTION_MODE") {
            parse_into(&mut self.execution_mode, "AOMA_EXECUTION_MODE", &raw, &mut warnings);
        }
        if let Some(dir) = lookup("AOMA_OUTPUTS_DIR") {
            self.outputs_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("AOMA_KEEP_ARCHIVES") {
            parse_into(&mut self.keep_archives, "AOMA_KEEP_ARCHIVES", &raw, &mut warnings);
        }
        if let Some(file) = lookup("AOMA_SOURCES_FILE") {
            self.sources_file = Some(PathBuf::from(file));
        }
        if let Some(filter) = lookup("LOG_FILTER") {
            self.log_filter = filter;
        }
        if let Some(raw) = lookup("AOMA_JSON_LOGS") {
            self.json_logs = parse_bool(&raw);
        }
        if let Some(dir) = lookup("AOMA_LOG_DIR") {
            self.log_dir = if dir.trim().is_empty() { None } else { Some(PathBuf::from(dir)) };
        }
        warnings
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.model.trim().is_empty() {
            return Err(CoreError::ConfigurationError("Model name is required".to_string()));
        }
        if self.api_base.trim().is_empty() {
            return Err(CoreError::ConfigurationError("API base URL is required".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::ConfigurationError(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if !(self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0) {
            return Err(CoreError::ConfigurationError(format!(
                "backoff_multiplier must be at least 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(CoreError::ConfigurationError(format!(
                "max_backoff_ms ({}) is below initial_backoff_ms ({})",
                self.max_backoff_ms, self.initial_backoff_ms
            )));
        }
        Ok(())
    }

    /// Non-fatal problems with a valid configuration
    pub fn startup_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.api_key.is_none() {
            warnings.push("No ANTHROPIC_API_KEY provided, only offline runs are possible".to_string());
        }
        warnings
    }

    /// Retry policy for the step executor
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_backoff_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_delay: Duration::from_millis(self.max_backoff_ms),
            ..RetryPolicy::default()
        }
    }

    /// Per-call timeout
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Client settings, `None` without an API key
    pub fn anthropic_config(&self) -> Option<AnthropicConfig> {
        self.api_key.as_ref().map(|api_key| AnthropicConfig {
            api_key: api_key.clone(),
            model: self.model.clone(),
            api_base: self.api_base.clone(),
            timeout_secs: self.request_timeout_secs,
        })
    }

    /// Logging settings
    pub fn monitoring_config(&self) -> MonitoringConfig {
        MonitoringConfig {
            log_filter: self.log_filter.clone(),
            json_logs: self.json_logs,
            log_dir: self.log_dir.clone(),
            ..MonitoringConfig::default()
        }
    }
}
