//! Configuration for escd

use esc_controller::{BackoffPolicy, ControllerConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Userland controller configuration
    #[serde(default)]
    pub controller: ControllerSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Recorded events kept for the events endpoint
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
            event_log_capacity: default_event_log_capacity(),
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Userlands reconciled in parallel
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_reconciles: usize,

    /// Full resync interval in seconds
    #[serde(default = "default_resync_period")]
    pub resync_period_secs: u64,

    /// First retry delay after a failed pass, in milliseconds
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    /// Retry delay cap, in seconds
    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            max_concurrent_reconciles: default_max_concurrent(),
            resync_period_secs: default_resync_period(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_secs: default_backoff_max(),
        }
    }
}

impl ControllerSettings {
    pub fn to_controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            max_concurrent_reconciles: self.max_concurrent_reconciles.max(1),
            resync_period: Duration::from_secs(self.resync_period_secs),
            backoff: BackoffPolicy {
                base: Duration::from_millis(self.backoff_base_ms),
                max: Duration::from_secs(self.backoff_max_secs),
            },
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_event_log_capacity() -> usize {
    10_000
}

fn default_max_concurrent() -> usize {
    1
}

fn default_resync_period() -> u64 {
    600
}

fn default_backoff_base() -> u64 {
    5
}

fn default_backoff_max() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then `ESC_*`
    /// environment variables (e.g. `ESC_CONTROLLER__RESYNC_PERIOD_SECS`)
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ESC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
