//! Widget Configuration
//!
//! Loads the widget's settings from a TOML file at
//! `$XDG_CONFIG_HOME/datasense/widget.toml`, then environment variables, then
//! CLI overrides.
//!
//! # Configuration Priority
//!
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables (`DATASENSE_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [transport]
//! base_url = "http://localhost:8000"
//! ws_url = "ws://localhost:8000"
//! request_timeout_secs = 120
//! reconnect_delay_ms = 5000
//!
//! [widget]
//! mode = "live"
//! client_id = "client_fixed"
//!
//! [ad]
//! time_unit_ms = 1000
//! countdown_units = 5
//! ceiling_units = 30
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Command-line argument
    Cli,
    /// Environment variable
    Env,
    /// TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Which transports the widget talks through
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetMode {
    /// HTTP chat endpoint plus WebSocket status channel
    #[default]
    Live,
    /// Canned in-process backend
    Scripted,
}

impl FromStr for WidgetMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "scripted" | "demo" => Ok(Self::Scripted),
            other => Err(ConfigError::ValidationError(format!(
                "unknown widget mode '{other}' (expected live or scripted)"
            ))),
        }
    }
}

/// Ad overlay timings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdTiming {
    /// Length of one countdown unit
    pub time_unit: Duration,
    /// Units before skip is enabled
    pub countdown_units: u32,
    /// Units after which the ad completes on its own
    pub ceiling_units: u32,
}

impl AdTiming {
    /// Time until the ad completes on its own
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.time_unit * self.ceiling_units
    }
}

impl Default for AdTiming {
    fn default() -> Self {
        Self {
            time_unit: Duration::from_secs(1),
            countdown_units: 5,
            ceiling_units: 30,
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[transport]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportToml {
    /// Chat endpoint base URL
    pub base_url: Option<String>,
    /// Status channel base URL
    pub ws_url: Option<String>,
    /// Chat request timeout in seconds
    pub request_timeout_secs: Option<u64>,
    /// Delay between status channel reconnects in milliseconds
    pub reconnect_delay_ms: Option<u64>,
}

/// `[widget]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSectionToml {
    /// `live` or `scripted`
    pub mode: Option<WidgetMode>,
    /// Fixed client identity
    pub client_id: Option<String>,
}

/// `[ad]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdToml {
    /// Countdown unit in milliseconds
    pub time_unit_ms: Option<u64>,
    /// Units before skip is enabled
    pub countdown_units: Option<u32>,
    /// Units before the ad completes on its own
    pub ceiling_units: Option<u32>,
}

/// Top-level TOML structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetToml {
    /// Transport section
    pub transport: TransportToml,
    /// Widget section
    pub widget: WidgetSectionToml,
    /// Ad section
    pub ad: AdToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved widget configuration
#[derive(Clone, Debug)]
pub struct WidgetConfig {
    /// Chat endpoint base URL
    pub base_url: String,
    /// Status channel base URL
    pub ws_url: String,
    /// Fixed client identity; generated per session when `None`
    pub client_id: Option<String>,
    /// Transport selection
    pub mode: WidgetMode,
    /// Chat request timeout
    pub request_timeout: Duration,
    /// Delay between status channel reconnects
    pub reconnect_delay: Duration,
    /// Ad overlay timings
    pub ad: AdTiming,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000".to_string(),
            client_id: None,
            mode: WidgetMode::Live,
            request_timeout: Duration::from_secs(120),
            reconnect_delay: Duration::from_secs(5),
            ad: AdTiming::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl WidgetConfig {
    /// Defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with the scripted backend
    #[must_use]
    pub fn scripted() -> Self {
        Self {
            mode: WidgetMode::Scripted,
            ..Self::default()
        }
    }

    /// Primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for empty URLs, a zero time
    /// unit, or a countdown that outlasts the ceiling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == WidgetMode::Live {
            if self.base_url.trim().is_empty() {
                return Err(ConfigError::ValidationError("base_url is empty".into()));
            }
            if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
                return Err(ConfigError::ValidationError(format!(
                    "ws_url must start with ws:// or wss:// (got '{}')",
                    self.ws_url
                )));
            }
        }
        if self.ad.time_unit.is_zero() {
            return Err(ConfigError::ValidationError("ad time unit is zero".into()));
        }
        if self.ad.countdown_units > self.ad.ceiling_units {
            return Err(ConfigError::ValidationError(format!(
                "ad countdown ({}) exceeds ceiling ({})",
                self.ad.countdown_units, self.ad.ceiling_units
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// `$XDG_CONFIG_HOME/datasense/widget.toml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("datasense").join("widget.toml"))
}

/// Load from the default path and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed.
pub fn load_config() -> Result<WidgetConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load from `path` (if it exists) and the environment
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<WidgetConfig, ConfigError> {
    let mut config = WidgetConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: WidgetToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(path = %config_path.display(), "Config file not found, using defaults");
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

fn apply_toml_config(config: &mut WidgetConfig, toml: &WidgetToml) {
    if let Some(ref url) = toml.transport.base_url {
        config.base_url.clone_from(url);
    }
    if let Some(ref url) = toml.transport.ws_url {
        config.ws_url.clone_from(url);
    }
    if let Some(secs) = toml.transport.request_timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(ms) = toml.transport.reconnect_delay_ms {
        config.reconnect_delay = Duration::from_millis(ms);
    }

    if let Some(mode) = toml.widget.mode {
        config.mode = mode;
    }
    if toml.widget.client_id.is_some() {
        config.client_id.clone_from(&toml.widget.client_id);
    }

    if let Some(ms) = toml.ad.time_unit_ms {
        config.ad.time_unit = Duration::from_millis(ms);
    }
    if let Some(units) = toml.ad.countdown_units {
        config.ad.countdown_units = units;
    }
    if let Some(units) = toml.ad.ceiling_units {
        config.ad.ceiling_units = units;
    }
}

/// Apply `DATASENSE_*` variables read through `lookup`
fn apply_env_config(config: &mut WidgetConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("DATASENSE_BASE_URL") {
        config.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(url) = lookup("DATASENSE_WS_URL") {
        config.ws_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(id) = lookup("DATASENSE_CLIENT_ID") {
        config.client_id = Some(id);
        config.source = ConfigSource::Env;
    }
    if let Some(mode) = lookup("DATASENSE_MODE") {
        match mode.parse::<WidgetMode>() {
            Ok(mode) => {
                config.mode = mode;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring DATASENSE_MODE"),
        }
    }
    if let Some(delay) = lookup("DATASENSE_RECONNECT_DELAY_MS") {
        if let Ok(ms) = delay.parse::<u64>() {
            config.reconnect_delay = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// CLI overrides, applied after [`load_config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Chat endpoint base URL
    pub base_url: Option<String>,
    /// Status channel base URL
    pub ws_url: Option<String>,
    /// Fixed client identity
    pub client_id: Option<String>,
    /// Transport selection
    pub mode: Option<WidgetMode>,
}

impl ConfigOverrides {
    /// No overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the chat endpoint base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Override the status channel base URL
    #[must_use]
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    /// Fix the client identity
    #[must_use]
    pub fn with_client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Override the transport selection
    #[must_use]
    pub fn with_mode(mut self, mode: WidgetMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Apply to `config`
    pub fn apply(&self, config: &mut WidgetConfig) {
        if self.base_url.is_some()
            || self.ws_url.is_some()
            || self.client_id.is_some()
            || self.mode.is_some()
        {
            config.source = ConfigSource::Cli;
        }
        if let Some(ref url) = self.base_url {
            config.base_url.clone_from(url);
        }
        if let Some(ref url) = self.ws_url {
            config.ws_url.clone_from(url);
        }
        if self.client_id.is_some() {
            config.client_id.clone_from(&self.client_id);
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = WidgetConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.ws_url, "ws://localhost:8000");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.ad.countdown_units, 5);
        assert_eq!(config.ad.ceiling(), Duration::from_secs(30));
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.ends_with("datasense/widget.toml"));
        }
    }

    #[test]
    fn test_parse_toml_file() {
        let toml_content = r#"
[transport]
base_url = "https://chat.example.com"
reconnect_delay_ms = 250

[widget]
mode = "scripted"
client_id = "client_fixed"

[ad]
countdown_units = 3
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let mut config = WidgetConfig::default();
        let parsed: WidgetToml = toml::from_str(toml_content).unwrap();
        apply_toml_config(&mut config, &parsed);
        assert_eq!(config.base_url, "https://chat.example.com");
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.mode, WidgetMode::Scripted);
        assert_eq!(config.client_id.as_deref(), Some("client_fixed"));
        assert_eq!(config.ad.countdown_units, 3);
        assert_eq!(config.ad.ceiling_units, 30);

        let loaded = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(loaded.config_file_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_missing_file_graceful() {
        let config =
            load_config_from_path(Some(PathBuf::from("/nonexistent/datasense/widget.toml")))
                .unwrap();
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_malformed_toml_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[transport\nbase_url = ").unwrap();
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = WidgetConfig::default();
        apply_env_config(
            &mut config,
            env(&[
                ("DATASENSE_WS_URL", "wss://status.example.com"),
                ("DATASENSE_MODE", "demo"),
                ("DATASENSE_RECONNECT_DELAY_MS", "100"),
            ]),
        );
        assert_eq!(config.ws_url, "wss://status.example.com");
        assert_eq!(config.mode, WidgetMode::Scripted);
        assert_eq!(config.reconnect_delay, Duration::from_millis(100));
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_bad_env_mode_ignored() {
        let mut config = WidgetConfig::default();
        apply_env_config(&mut config, env(&[("DATASENSE_MODE", "turbo")]));
        assert_eq!(config.mode, WidgetMode::Live);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = WidgetConfig::default();
        ConfigOverrides::new()
            .with_base_url("http://10.0.0.2:8000")
            .with_client_id("client_cli")
            .apply(&mut config);
        assert_eq!(config.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.client_id.as_deref(), Some("client_cli"));
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_no_change() {
        let mut config = WidgetConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = WidgetConfig::default();
        config.ws_url = "http://localhost:8000".into();
        assert!(config.validate().is_err());

        let mut config = WidgetConfig::default();
        config.ad.countdown_units = 40;
        assert!(config.validate().is_err());
    }
}
