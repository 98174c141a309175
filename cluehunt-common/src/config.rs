//! Bootstrap configuration and data folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (clap also folds in the `CLUEHUNT_*` environment variables)
//! 2. TOML config file
//! 3. Compiled default
//!
//! A missing TOML file is not an error: the server starts on defaults and
//! logs a warning. A TOML file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit TOML config file
pub const CONFIG_ENV_VAR: &str = "CLUEHUNT_CONFIG";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 4000;

/// Default chat history cap per team
pub const DEFAULT_CHAT_HISTORY_LIMIT: usize = 50;

/// Default EventBus capacity
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// File name of the persisted game configuration inside the data folder
pub const GAME_CONFIG_FILE: &str = "gameConfig.json";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Folder holding `gameConfig.json` and `assets/`
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Token expected in `x-admin-token`; absent or `"dev"` disables admin auth
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Acceptance thresholds applied by the validation engine
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Chat messages kept per team before the oldest is evicted
    #[serde(default)]
    pub chat_history_limit: Option<usize>,

    /// Events buffered by the EventBus before slow subscribers lag
    #[serde(default)]
    pub event_capacity: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Similarity thresholds: a score at or above the threshold is accepted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_photo_threshold")]
    pub photo_threshold: f64,

    #[serde(default = "default_answer_threshold")]
    pub answer_threshold: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            photo_threshold: default_photo_threshold(),
            answer_threshold: default_answer_threshold(),
        }
    }
}

fn default_photo_threshold() -> f64 {
    0.75
}

fn default_answer_threshold() -> f64 {
    0.8
}

impl ValidationConfig {
    /// Reject thresholds outside `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("photo_threshold", self.photo_threshold),
            ("answer_threshold", self.answer_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "validation.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Values supplied on the command line (or via their environment variables)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub admin_token: Option<String>,
}

/// Fully resolved server configuration
#[derive(Debug, Clone)]
pub struct HuntConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub admin_token: Option<String>,
    pub log_level: String,
    pub validation: ValidationConfig,
    pub chat_history_limit: usize,
    pub event_capacity: usize,
}

impl HuntConfig {
    /// Merge overrides, TOML values and compiled defaults
    pub fn resolve(overrides: Overrides, toml_config: TomlConfig) -> Result<Self> {
        toml_config.validation.validate()?;

        let chat_history_limit = toml_config
            .chat_history_limit
            .unwrap_or(DEFAULT_CHAT_HISTORY_LIMIT);
        if chat_history_limit == 0 {
            return Err(Error::Config(
                "chat_history_limit must be at least 1".to_string(),
            ));
        }

        let event_capacity = toml_config.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY);
        if event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }

        Ok(Self {
            port: overrides.port.or(toml_config.port).unwrap_or(DEFAULT_PORT),
            data_dir: overrides
                .data_dir
                .or(toml_config.data_dir)
                .unwrap_or_else(default_data_dir),
            admin_token: overrides.admin_token.or(toml_config.admin_token),
            log_level: toml_config.logging.level,
            validation: toml_config.validation,
            chat_history_limit,
            event_capacity,
        })
    }

    /// Path of the persisted game configuration
    pub fn game_config_path(&self) -> PathBuf {
        self.data_dir.join(GAME_CONFIG_FILE)
    }

    /// Whether admin routes check the `x-admin-token` header
    ///
    /// An unset token or the literal `"dev"` leaves admin routes open.
    pub fn admin_auth_enabled(&self) -> bool {
        matches!(&self.admin_token, Some(token) if !token.is_empty() && token != "dev")
    }
}

/// Locate the TOML config file
///
/// Order: explicit path, `CLUEHUNT_CONFIG`, `~/.config/cluehunt/config.toml`,
/// `/etc/cluehunt/config.toml`. Returns `None` when no candidate exists.
pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("cluehunt").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/cluehunt/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Where the bootstrap configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Named file does not exist
    Missing(PathBuf),
    /// No candidate file found
    Defaults,
}

/// Load the TOML config, falling back to defaults when the file is absent
///
/// Runs before tracing is initialized, so the caller logs the returned
/// [`ConfigSource`].
pub fn load_toml_config(path: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    let Some(path) = path else {
        return Ok((TomlConfig::default(), ConfigSource::Defaults));
    };

    if !path.exists() {
        return Ok((TomlConfig::default(), ConfigSource::Missing(path.to_path_buf())));
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    Ok((config, ConfigSource::File(path.to_path_buf())))
}

/// Get OS-dependent default data folder
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cluehunt"))
        .unwrap_or_else(|| PathBuf::from("./cluehunt_data"))
}
