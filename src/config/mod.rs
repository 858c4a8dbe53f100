//! Configuration module for shardctl.

use crate::error::{Result, ShardError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default interval between topology samples while waiting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Main configuration for a shardctl run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Which cluster to talk to.
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// HTTP client settings.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Convergence polling settings.
    #[serde(default)]
    pub polling: PollingConfig,
    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl ManagerConfig {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShardError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ShardError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.cluster.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ShardError::InvalidConfig {
                field: "cluster.endpoint".to_string(),
                reason: "Endpoint must not be empty".to_string(),
            });
        }

        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ShardError::InvalidConfig {
                field: "cluster.endpoint".to_string(),
                reason: format!("Endpoint must be an http(s) URL, got {}", endpoint),
            });
        }

        if self.polling.interval.is_zero() {
            return Err(ShardError::InvalidConfig {
                field: "polling.interval".to_string(),
                reason: "Poll interval must be non-zero".to_string(),
            });
        }

        Ok(())
    }

    /// Configuration for a single local node, used by tests and demos.
    pub fn development() -> Self {
        Self {
            cluster: ClusterConfig {
                endpoint: "http://127.0.0.1:8983/solr".to_string(),
            },
            network: NetworkConfig::default(),
            polling: PollingConfig {
                interval: Duration::from_secs(1),
                timeout: Some(Duration::from_secs(60)),
            },
            observability: ObservabilityConfig {
                log_level: "debug".to_string(),
                json_logs: false,
            },
        }
    }
}

/// Cluster endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Base URL of any node, including the context path.
    pub endpoint: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8983/solr".to_string(),
        }
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Connection timeout.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Per-request timeout. Collection creation can outlive this, which is
    /// what asynchronous creation is for.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(600),
        }
    }
}

/// Convergence polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Time between topology samples.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Give up waiting after this long. `None` waits forever.
    #[serde(default, with = "humantime_serde::option")]
    pub timeout: Option<Duration>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level.
    pub log_level: String,
    /// Enable JSON logging.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Serde helper for Duration using humantime format.
pub mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    /// Parse `250ms`, `5s`, `2m`, `1h` or a bare millisecond count.
    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string())
        } else if let Some(s_val) = s.strip_suffix('s') {
            s_val
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| e.to_string())
        } else if let Some(m) = s.strip_suffix('m') {
            scaled_secs(m, 60)
        } else if let Some(h) = s.strip_suffix('h') {
            scaled_secs(h, 3600)
        } else {
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string())
        }
    }

    fn scaled_secs(value: &str, unit: u64) -> Result<Duration, String> {
        let value = value.parse::<u64>().map_err(|e| e.to_string())?;
        value
            .checked_mul(unit)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration {} x {}s is too large", value, unit))
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s: Option<String> = Option::deserialize(deserializer)?;
            s.map(|s| super::parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
