//! Daemon configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use usagepulse_core::ProviderKind;

use crate::error::StoreError;
use crate::persistence::{default_config_path, load_json, save_json};

// ============================================================================
// Log Level
// ============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    Warn,
    /// Info level logging.
    #[default]
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

// ============================================================================
// Config Types
// ============================================================================

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DaemonConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Per-provider settings.
    #[serde(default)]
    pub providers: BTreeMap<ProviderKind, ProviderConfig>,
}

/// General daemon settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Seconds between automatic sends.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Seconds a cached provider result stays valid.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Seconds to wait after wake before the catch-up send.
    #[serde(default = "default_wake_settle_secs")]
    pub wake_settle_secs: u64,
    /// Host label attached to every metric.
    #[serde(default = "default_host_label")]
    pub host_label: String,
    /// Prefix for metric names.
    #[serde(default = "default_metric_prefix")]
    pub metric_prefix: String,
    /// Log level.
    #[serde(default)]
    pub log_level: LogLevel,
    /// Whether SIGINT/SIGTERM stop the scheduler.
    #[serde(default = "default_true")]
    pub handle_signals: bool,
    /// Per-task timeout for historical collection, in seconds.
    #[serde(default)]
    pub collect_timeout_secs: Option<u64>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether this provider is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_wake_settle_secs() -> u64 {
    5
}

fn default_host_label() -> String {
    "localhost".to_string()
}

fn default_metric_prefix() -> String {
    "usagepulse".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            wake_settle_secs: default_wake_settle_secs(),
            host_label: default_host_label(),
            metric_prefix: default_metric_prefix(),
            log_level: LogLevel::default(),
            handle_signals: true,
            collect_timeout_secs: None,
        }
    }
}

impl DaemonConfig {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Loads configuration from the default path.
    pub async fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path()).await
    }

    /// Loads configuration from a specific path.
    ///
    /// A missing file yields the defaults. The loaded configuration is
    /// validated before it is returned.
    pub async fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let config: DaemonConfig = load_json(path).await?;
        config.validate()?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub async fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        save_json(path, self).await?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Checks the values the scheduler cannot run without.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.general.interval_secs == 0 {
            return Err(StoreError::Config("interval_secs must be greater than zero".into()));
        }
        if self.general.cache_ttl_secs == 0 {
            return Err(StoreError::Config("cache_ttl_secs must be greater than zero".into()));
        }
        if self.general.host_label.trim().is_empty() {
            return Err(StoreError::Config("host_label must not be empty".into()));
        }
        if self.general.collect_timeout_secs == Some(0) {
            return Err(StoreError::Config(
                "collect_timeout_secs must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }

    /// Returns the send interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.general.interval_secs)
    }

    /// Returns the cache TTL.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.general.cache_ttl_secs)
    }

    /// Returns the wake settle delay.
    pub fn wake_settle_delay(&self) -> Duration {
        Duration::from_secs(self.general.wake_settle_secs)
    }

    /// Returns the per-task collection timeout, if configured.
    pub fn collect_timeout(&self) -> Option<Duration> {
        self.general.collect_timeout_secs.map(Duration::from_secs)
    }

    /// Returns whether a provider is enabled.
    ///
    /// The local sources default to enabled, the cloud providers to disabled.
    pub fn is_provider_enabled(&self, kind: ProviderKind) -> bool {
        self.providers
            .get(&kind)
            .map_or(!kind.is_cloud(), |p| p.enabled)
    }

    /// Enables or disables a provider.
    pub fn set_provider_enabled(&mut self, kind: ProviderKind, enabled: bool) {
        self.providers
            .entry(kind)
            .or_insert(ProviderConfig { enabled })
            .enabled = enabled;
    }

    /// Returns enabled providers in dispatch order.
    pub fn enabled_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::all()
            .iter()
            .copied()
            .filter(|k| self.is_provider_enabled(*k))
            .collect()
    }
}
