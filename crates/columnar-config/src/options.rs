//! Cluster and timeout options
//!
//! Options are layered: explicit values set on [`ClusterOptions`], then
//! overrides carried on the connection string, then the built-in defaults
//! applied by [`ClusterOptions::resolve`].

use crate::duration::{self, parse_go_duration};
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Default time allowed for establishing a connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default server-side query timeout used when the caller has no deadline
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Connection-string key overriding the connect timeout
pub const CONNECT_TIMEOUT_KEY: &str = "timeout.connect_timeout";

/// Connection-string key overriding the query timeout
pub const QUERY_TIMEOUT_KEY: &str = "timeout.query_timeout";

/// Timeout configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutOptions {
    /// Time allowed for establishing a connection
    #[serde(with = "duration::serde_opt", skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<Duration>,

    /// Server-side query timeout used when the request carries no deadline
    #[serde(with = "duration::serde_opt", skip_serializing_if = "Option::is_none")]
    pub query_timeout: Option<Duration>,
}

impl TimeoutOptions {
    /// Create empty timeout options (all defaults)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the query timeout
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
}

/// Options used when constructing a cluster handle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// Timeout configuration
    pub timeouts: TimeoutOptions,
}

/// Timeouts after defaults and overrides have been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTimeouts {
    /// Connect timeout, always non-zero
    pub connect_timeout: Duration,
    /// Default query timeout, always non-zero
    pub query_timeout: Duration,
}

impl Default for ResolvedTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl ClusterOptions {
    /// Create cluster options with every value defaulted
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the timeout options
    pub fn with_timeouts(mut self, timeouts: TimeoutOptions) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Apply overrides parsed from a connection string's query options.
    ///
    /// `options` maps each key to every value it was given; when a key repeats
    /// the last value wins. Unknown keys are ignored here since they belong to
    /// other layers (TLS, SRV).
    pub fn apply_connection_options(
        &mut self,
        options: &HashMap<String, Vec<String>>,
    ) -> ConfigResult<()> {
        let fetch = |name: &str| options.get(name).and_then(|values| values.last());

        if let Some(value) = fetch(CONNECT_TIMEOUT_KEY) {
            let timeout = parse_go_duration(value)
                .map_err(|e| ConfigError::invalid_argument(CONNECT_TIMEOUT_KEY, e.to_string()))?;
            if self.timeouts.connect_timeout.is_some() {
                warn!(
                    key = CONNECT_TIMEOUT_KEY,
                    "connect timeout option overridden by connection string"
                );
            }
            self.timeouts.connect_timeout = Some(timeout);
        }

        if let Some(value) = fetch(QUERY_TIMEOUT_KEY) {
            let timeout = parse_go_duration(value)
                .map_err(|e| ConfigError::invalid_argument(QUERY_TIMEOUT_KEY, e.to_string()))?;
            if self.timeouts.query_timeout.is_some() {
                warn!(
                    key = QUERY_TIMEOUT_KEY,
                    "query timeout option overridden by connection string"
                );
            }
            self.timeouts.query_timeout = Some(timeout);
        }

        Ok(())
    }

    /// Fill in defaults and validate the effective timeouts
    pub fn resolve(&self) -> ConfigResult<ResolvedTimeouts> {
        let resolved = ResolvedTimeouts {
            connect_timeout: self
                .timeouts
                .connect_timeout
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            query_timeout: self.timeouts.query_timeout.unwrap_or(DEFAULT_QUERY_TIMEOUT),
        };

        if resolved.connect_timeout.is_zero() {
            return Err(ConfigError::invalid_argument(
                "ConnectTimeout",
                "must be greater than 0",
            ));
        }

        if resolved.query_timeout.is_zero() {
            return Err(ConfigError::invalid_argument(
                "QueryTimeout",
                "must be greater than 0",
            ));
        }

        debug!(
            connect_timeout = ?resolved.connect_timeout,
            query_timeout = ?resolved.query_timeout,
            "Resolved cluster timeouts"
        );

        Ok(resolved)
    }
}
