//! Operator configuration
//!
//! Settings are deserialized from environment variables once at startup.
//! Unset or blank variables fall back to the defaults below.

use std::time::Duration;

use ::config::{Config, Environment};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Namespace to watch; empty or unset means all namespaces
pub const WATCH_NAMESPACE_ENV: &str = "WATCH_NAMESPACE";
/// Port for the metrics and health endpoints
pub const METRICS_PORT_ENV: &str = "METRICS_PORT";
/// Bounded attempts for a version-conditional status write
pub const STATUS_UPDATE_ATTEMPTS_ENV: &str = "STATUS_UPDATE_ATTEMPTS";
/// Delay used when a reconcile asks to be requeued without a duration
pub const REQUEUE_INTERVAL_SECS_ENV: &str = "REQUEUE_INTERVAL_SECS";

const DEFAULT_METRICS_PORT: u16 = 8080;
const DEFAULT_STATUS_UPDATE_ATTEMPTS: u32 = 5;
const DEFAULT_REQUEUE_INTERVAL_SECS: u64 = 10;

/// Runtime configuration for the operator
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct OperatorConfig {
    /// Namespace scope, `None` for cluster-wide
    pub watch_namespace: Option<String>,
    /// Metrics server port
    pub metrics_port: u16,
    /// Attempts at a conditional status write before the conflict is surfaced
    pub status_update_attempts: u32,
    /// Seconds to wait before an immediate requeue
    pub requeue_interval_secs: u64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            metrics_port: DEFAULT_METRICS_PORT,
            status_update_attempts: DEFAULT_STATUS_UPDATE_ATTEMPTS,
            requeue_interval_secs: DEFAULT_REQUEUE_INTERVAL_SECS,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_source(Environment::default())
    }

    /// Load configuration from an environment source, which tests may back
    /// with a fixed map
    pub fn from_source(env: Environment) -> Result<Self> {
        let mut config: Self = Config::builder()
            .add_source(env.try_parsing(true).ignore_empty(true))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| Error::config(e.to_string()))?;

        config.watch_namespace = config
            .watch_namespace
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty());

        if config.status_update_attempts == 0 {
            return Err(Error::config(format!(
                "{} must be at least 1",
                STATUS_UPDATE_ATTEMPTS_ENV
            )));
        }
        Ok(config)
    }

    /// Delay applied to a requeue that carries no explicit duration
    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_interval_secs)
    }
}
