//! TOML Configuration File Support
//!
//! Centralized configuration loading for the studio, supporting a TOML
//! configuration file at `~/.config/appstudio/studio.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (when applicable)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! The configuration file follows XDG Base Directory specification:
//! - `$XDG_CONFIG_HOME/appstudio/studio.toml` (typically `~/.config/appstudio/studio.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! endpoint = "http://localhost:3000/api/generateCode"
//! connect_timeout_ms = 10000
//! idle_timeout_secs = 120
//!
//! [stream]
//! coalesce_window_ms = 50
//! coalesce_max_wait_ms = 500
//! max_record_bytes = 8388608
//!
//! [defaults]
//! model = "accounts/fireworks/models/llama-v3p1-405b-instruct"
//! framework = "vue"
//!
//! [session]
//! max_prompt_bytes = 32768
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT};
use crate::orchestrator::{StudioConfig, DEFAULT_IDLE_TIMEOUT};
use crate::session::DEFAULT_MAX_PROMPT_BYTES;
use crate::stream::{CoalescePolicy, DEFAULT_COALESCE_WINDOW, DEFAULT_MAX_RECORD_BYTES};

/// Default model identifier
pub const DEFAULT_MODEL: &str = "accounts/sentientfoundation/models/dobby-unhinged-llama-3-3-70b-new";

/// Default target framework
pub const DEFAULT_FRAMEWORK: &str = "react";

/// Largest accepted coalescing window
pub const MAX_COALESCE_WINDOW: Duration = Duration::from_secs(10);

// =============================================================================
// Error Types
// =============================================================================

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

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
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

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Backend section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Generation endpoint URL
    pub endpoint: Option<String>,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Idle timeout between body chunks in seconds (0 = none)
    pub idle_timeout_secs: Option<u64>,
}

/// Stream section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamToml {
    /// Coalescing window in milliseconds
    pub coalesce_window_ms: Option<u64>,

    /// Longest a publish may be deferred in milliseconds (0 = unbounded)
    pub coalesce_max_wait_ms: Option<u64>,

    /// Largest event record passed on
    pub max_record_bytes: Option<usize>,
}

/// Defaults section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsToml {
    /// Model used when none is given
    pub model: Option<String>,

    /// Framework used when none is given
    pub framework: Option<String>,
}

/// Session section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Largest accepted prompt in bytes (0 = unlimited)
    pub max_prompt_bytes: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioToml {
    /// Backend configuration section
    pub backend: BackendToml,

    /// Stream configuration section
    pub stream: StreamToml,

    /// Defaults configuration section
    pub defaults: DefaultsToml,

    /// Session configuration section
    pub session: SessionToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for the studio
///
/// Consolidates configuration from multiple sources and tracks where the
/// values came from. Use [`load_config`] to load configuration with proper
/// priority handling.
#[derive(Clone, Debug)]
pub struct StudioConfigFile {
    /// Generation endpoint URL
    pub endpoint: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Idle timeout between body chunks
    pub idle_timeout: Option<Duration>,

    /// Coalescing window for mid-stream publishes
    pub coalesce_window: Duration,

    /// Upper bound on publish deferral
    pub coalesce_max_wait: Option<Duration>,

    /// Largest event record passed on
    pub max_record_bytes: usize,

    /// Model used when none is given
    pub default_model: String,

    /// Framework used when none is given
    pub default_framework: String,

    /// Largest accepted prompt in bytes
    pub max_prompt_bytes: usize,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for StudioConfigFile {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            coalesce_window: DEFAULT_COALESCE_WINDOW,
            coalesce_max_wait: None,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            default_model: DEFAULT_MODEL.to_string(),
            default_framework: DEFAULT_FRAMEWORK.to_string(),
            max_prompt_bytes: DEFAULT_MAX_PROMPT_BYTES,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl StudioConfigFile {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Runtime configuration for the orchestrator
    #[must_use]
    pub fn studio_config(&self) -> StudioConfig {
        let mut coalesce = CoalescePolicy::with_window(self.coalesce_window);
        coalesce.max_wait = self.coalesce_max_wait;

        StudioConfig {
            coalesce,
            idle_timeout: self.idle_timeout,
            max_record_bytes: self.max_record_bytes,
            max_prompt_bytes: self.max_prompt_bytes,
        }
    }

    /// Check values that would make the studio misbehave
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend endpoint must not be empty".to_string(),
            ));
        }
        if self.coalesce_window > MAX_COALESCE_WINDOW {
            return Err(ConfigError::ValidationError(format!(
                "coalesce window {}ms exceeds {}ms",
                self.coalesce_window.as_millis(),
                MAX_COALESCE_WINDOW.as_millis()
            )));
        }
        if let Some(max_wait) = self.coalesce_max_wait {
            if max_wait < self.coalesce_window {
                return Err(ConfigError::ValidationError(format!(
                    "coalesce max wait {}ms is shorter than the window {}ms",
                    max_wait.as_millis(),
                    self.coalesce_window.as_millis()
                )));
            }
        }
        if self.max_record_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_record_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/appstudio/studio.toml` or
/// `~/.config/appstudio/studio.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("appstudio").join("studio.toml"))
}

/// Load configuration from all sources with proper priority
///
/// Priority order (highest first):
/// 1. CLI arguments (not handled here - caller should apply after)
/// 2. Environment variables
/// 3. TOML configuration file
/// 4. Default values
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// resulting values fail validation. A missing config file is not an error.
pub fn load_config() -> Result<StudioConfigFile, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<StudioConfigFile, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration reading environment values through `env`
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_with_env<F>(
    path: Option<PathBuf>,
    env: F,
) -> Result<StudioConfigFile, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // Start with defaults
    let mut config = StudioConfigFile::default();

    // Try to load from file
    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: StudioToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    // Apply environment variables (overrides file values)
    apply_env_config(&mut config, env);

    config.validate()?;
    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut StudioConfigFile, toml: &StudioToml) {
    // Backend settings
    if let Some(ref endpoint) = toml.backend.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(ms) = toml.backend.connect_timeout_ms {
        config.connect_timeout = Duration::from_millis(ms);
    }
    if let Some(secs) = toml.backend.idle_timeout_secs {
        config.idle_timeout = idle_timeout_from_secs(secs);
    }

    // Stream settings
    if let Some(ms) = toml.stream.coalesce_window_ms {
        config.coalesce_window = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.stream.coalesce_max_wait_ms {
        config.coalesce_max_wait = (ms > 0).then(|| Duration::from_millis(ms));
    }
    if let Some(bytes) = toml.stream.max_record_bytes {
        config.max_record_bytes = bytes;
    }

    // Defaults
    if let Some(ref model) = toml.defaults.model {
        config.default_model = model.clone();
    }
    if let Some(ref framework) = toml.defaults.framework {
        config.default_framework = framework.clone();
    }

    // Session settings
    if let Some(bytes) = toml.session.max_prompt_bytes {
        config.max_prompt_bytes = bytes;
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut StudioConfigFile, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = env("APPSTUDIO_ENDPOINT") {
        config.endpoint = endpoint;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_env::<u64>(&env, "APPSTUDIO_CONNECT_TIMEOUT_MS") {
        config.connect_timeout = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(secs) = parse_env::<u64>(&env, "APPSTUDIO_IDLE_TIMEOUT_SECS") {
        config.idle_timeout = idle_timeout_from_secs(secs);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_env::<u64>(&env, "APPSTUDIO_COALESCE_MS") {
        config.coalesce_window = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(model) = env("APPSTUDIO_MODEL") {
        config.default_model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(framework) = env("APPSTUDIO_FRAMEWORK") {
        config.default_framework = framework;
        config.source = ConfigSource::Env;
    }
}

fn parse_env<T: std::str::FromStr>(env: impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}

fn idle_timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Endpoint override
    pub endpoint: Option<String>,

    /// Default model override
    pub default_model: Option<String>,

    /// Default framework override
    pub default_framework: Option<String>,

    /// Connect timeout override (milliseconds)
    pub connect_timeout_ms: Option<u64>,

    /// Coalescing window override (milliseconds)
    pub coalesce_window_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set endpoint override
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Set default model override
    #[must_use]
    pub fn with_default_model(mut self, model: String) -> Self {
        self.default_model = Some(model);
        self
    }

    /// Set default framework override
    #[must_use]
    pub fn with_default_framework(mut self, framework: String) -> Self {
        self.default_framework = Some(framework);
        self
    }

    /// Set connect timeout override
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    /// Set coalescing window override
    #[must_use]
    pub fn with_coalesce_window_ms(mut self, ms: u64) -> Self {
        self.coalesce_window_ms = Some(ms);
        self
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoint.is_none()
            && self.default_model.is_none()
            && self.default_framework.is_none()
            && self.connect_timeout_ms.is_none()
            && self.coalesce_window_ms.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut StudioConfigFile) {
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref endpoint) = self.endpoint {
            config.endpoint = endpoint.clone();
        }

        if let Some(ref model) = self.default_model {
            config.default_model = model.clone();
        }

        if let Some(ref framework) = self.default_framework {
            config.default_framework = framework.clone();
        }

        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(ms);
        }

        if let Some(ms) = self.coalesce_window_ms {
            config.coalesce_window = Duration::from_millis(ms);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
