use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

pub const CONFIG_FILENAME: &str = "steward.json";
pub const CONFIG_VERSION: &str = "1.0.0";

/// Externally supplied configuration. The core consumes already-validated
/// values; anything tunable (ports, credentials, match thresholds, scheduled
/// jobs) lives here rather than in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Shared secret accepted by the offline relay and the HTTP front door.
    pub secret: String,
    pub listener: ListenerConfig,
    pub routing: RoutingConfig,
    pub relay: RelayConfig,
    pub api: ApiConfig,
    pub supervisor: SupervisorConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Whether the foreground listen loop reads phrases while Running.
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Minimum keyword matches a binding needs before it is dispatched.
    pub match_threshold: usize,
    /// Maximum edit distance the fuzzy fallback will bridge.
    pub fuzzy_tolerance: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub session_ttl_seconds: u64,
    pub connection_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    pub lock_path: PathBuf,
    pub grace_period_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub tick_seconds: u64,
    pub tasks: Vec<ScheduledTask>,
}

/// A command dispatched on a timer, e.g. `{ "command": "weather", "interval_seconds": 3600 }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub command: String,
    pub interval_seconds: u64,
}

impl Config {
    pub fn default_new() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            secret: Uuid::new_v4().to_string(),
            listener: ListenerConfig { enabled: true },
            routing: RoutingConfig {
                match_threshold: 1,
                fuzzy_tolerance: 2,
            },
            relay: RelayConfig {
                host: "127.0.0.1".to_string(),
                port: 4483,
                session_ttl_seconds: 1800,
                connection_timeout_seconds: 10,
            },
            api: ApiConfig {
                enabled: true,
                host: "127.0.0.1".to_string(),
                port: 4843,
            },
            supervisor: SupervisorConfig {
                lock_path: std::env::temp_dir().join("steward.lock"),
                grace_period_seconds: 5,
            },
            schedule: ScheduleConfig {
                tick_seconds: 1,
                tasks: Vec::new(),
            },
        }
    }

    /// Read the config at `path`, creating it with defaults (and a fresh
    /// secret) when missing.
    pub fn load_or_create(path: &Path) -> CoreResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|error| {
                CoreError::InvalidInput(format!("config {}: {error}", path.display()))
            }),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default_new();
                config.save(path)?;
                Ok(config)
            }
            Err(error) => Err(CoreError::Internal(format!(
                "failed to read config {}: {error}",
                path.display()
            ))),
        }
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|error| CoreError::Internal(format!("failed to serialize config: {error}")))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|error| {
                    CoreError::Internal(format!("failed to create {}: {error}", parent.display()))
                })?;
            }
        }
        std::fs::write(path, raw).map_err(|error| {
            CoreError::Internal(format!("failed to write config {}: {error}", path.display()))
        })
    }
}
