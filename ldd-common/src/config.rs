//! Bootstrap configuration and data folder resolution
//!
//! Values are resolved in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Command-line and environment tiers are handled by the binaries' clap
//! definitions; this module owns the TOML tier and the defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5000;

/// Default bind address
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// SQLite file name inside the data folder
pub const DATABASE_FILE: &str = "reports.db";

/// Environment variable naming the data folder
pub const DATA_FOLDER_ENV: &str = "LDD_DATA_FOLDER";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional in the file; missing values fall back to the
/// defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub bind_address: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Folder holding the SQLite database
    #[serde(default)]
    pub data_folder: Option<PathBuf>,

    /// Token sensor nodes present when ingesting
    #[serde(default)]
    pub api_key: Option<String>,

    /// Token required for reset; falls back to `api_key`
    #[serde(default)]
    pub admin_key: Option<String>,

    /// Offset of the local zone used for weekly day boundaries
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,

    /// Pending events buffered per live-stream subscriber
    #[serde(default = "default_subscriber_queue")]
    pub subscriber_queue: usize,

    /// Idle interval before a live stream emits a keep-alive
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Default number of rows returned by the history view
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    #[serde(default)]
    pub logging: LoggingConfig,
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

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: None,
            port: None,
            data_folder: None,
            api_key: None,
            admin_key: None,
            utc_offset_minutes: None,
            subscriber_queue: default_subscriber_queue(),
            keep_alive_secs: default_keep_alive_secs(),
            history_limit: default_history_limit(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_subscriber_queue() -> usize {
    16
}

fn default_keep_alive_secs() -> u64 {
    15
}

fn default_history_limit() -> u32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from an explicit or default location
    ///
    /// An explicitly requested file must exist. A missing default file is not
    /// an error: the service starts on compiled defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                Some(path) => {
                    warn!(
                        "No config file at {}, using built-in defaults",
                        path.display()
                    );
                    return Ok(Self::default());
                }
                None => {
                    warn!("Could not determine config directory, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Default config file: `<config_dir>/ldd/ldd-hub.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ldd").join("ldd-hub.toml"))
}

/// OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ldd"))
        .unwrap_or_else(|| PathBuf::from("./ldd_data"))
}

/// Resolve the data folder
///
/// `cli_arg` already includes the environment tier when the binary declares
/// the argument with `env = DATA_FOLDER_ENV`; the environment is consulted
/// here too so library callers get the same priority order.
pub fn resolve_data_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.data_folder {
        return path.clone();
    }

    default_data_folder()
}

/// Database path inside a data folder
pub fn database_path(data_folder: &Path) -> PathBuf {
    data_folder.join(DATABASE_FILE)
}

/// Validate a key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// First valid key in priority order
pub fn first_valid_key<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|key| is_valid_key(key))
        .map(|key| key.trim().to_string())
}
