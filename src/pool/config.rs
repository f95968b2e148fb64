use crate::executor::Consistency;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

const CONFIG_FILE: &str = "config/cqlguard.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Worker threads running blocking driver calls
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Per-statement timeout handed to the driver; 0 leaves it unset
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default)]
    pub default_consistency: Option<Consistency>,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: i32,
    /// Native protocol version used when serializing routing keys
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u8,
    /// Warn when a batch is executed more than once
    #[serde(default = "default_warn_multiple_exec")]
    pub warn_multiple_exec: bool,
    #[serde(default)]
    pub allow_schema_management: bool,
}

fn default_worker_threads() -> usize {
    4
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_fetch_size() -> i32 {
    5000
}

fn default_protocol_version() -> u8 {
    4
}

fn default_warn_multiple_exec() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            default_timeout_ms: default_timeout_ms(),
            default_consistency: None,
            fetch_size: default_fetch_size(),
            protocol_version: default_protocol_version(),
            warn_multiple_exec: default_warn_multiple_exec(),
            allow_schema_management: false,
        }
    }
}

impl SessionConfig {
    /// Load the session configuration from `config/cqlguard.toml`, falling back to env vars.
    ///
    /// Environment variables use the `CQLGUARD` prefix and `__` as separator,
    /// e.g. `CQLGUARD__SESSION__WORKER_THREADS=8`.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(env_source());

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // Unreadable or malformed file: warn and retry with env only
                if std::path::Path::new(CONFIG_FILE).exists() {
                    log::warn!("failed to load {CONFIG_FILE}, falling back to env: {err}");
                }
                Config::builder()
                    .add_source(env_source())
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {err}, then env-only error: {env_err}"
                        ))
                    })?
            }
        };

        match settings.get::<SessionConfig>("session") {
            Ok(cfg) => Ok(cfg),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Session configuration could not be loaded from file or environment: {e}"
            ))),
        }
    }

    /// Timeout handed to the driver when a call does not set its own
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        (self.default_timeout_ms > 0).then(|| Duration::from_millis(self.default_timeout_ms))
    }

    /// Whether setup flows may create or drop keyspaces and tables
    ///
    /// The `CQLENG_ALLOW_SCHEMA_MANAGEMENT` environment toggle also enables it.
    #[must_use]
    pub fn schema_management_allowed(&self) -> bool {
        self.allow_schema_management
            || std::env::var("CQLENG_ALLOW_SCHEMA_MANAGEMENT")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("CQLGUARD")
        .separator("__")
        .try_parsing(true)
}
