//! API server configuration, read from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use kq_cluster_tools::RetryPolicy;

use crate::inference::OpenAiConfig;

/// Configuration failures; every one of them is fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Top-level API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Listen address (e.g., "127.0.0.1").
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Cloud classifier settings.
    pub openai: OpenAiConfig,
    /// Per-attempt timeout for cluster calls.
    pub cluster_timeout: Duration,
    /// Pause before the single retry of a transient cluster failure.
    pub cluster_retry_delay: Duration,
    /// Append-only query log.
    pub query_log_path: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_query_log_path() -> PathBuf {
    PathBuf::from("agent.log")
}

impl ApiConfig {
    /// Load config from the process environment (after `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = var("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let mut openai = OpenAiConfig::new(api_key);
        if let Some(model) = var("OPENAI_MODEL") {
            openai.model = model;
        }
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            openai.base_url = base_url;
        }
        if let Some(secs) = parse_timeout_secs(&var, "OPENAI_TIMEOUT_SECS")? {
            openai.timeout_secs = secs;
        }

        let defaults = RetryPolicy::default();
        Ok(Self {
            host: var("KQ_HOST").unwrap_or_else(default_host),
            port: parse_var(&var, "KQ_PORT")?.unwrap_or_else(default_port),
            openai,
            cluster_timeout: parse_timeout_secs(&var, "KQ_CLUSTER_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            cluster_retry_delay: parse_var(&var, "KQ_CLUSTER_RETRY_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            query_log_path: var("QUERY_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_query_log_path),
        })
    }

    /// Listen address in `host:port` form.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout/retry bounds for cluster calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: self.cluster_timeout,
            retry_delay: self.cluster_retry_delay,
            ..RetryPolicy::default()
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    var(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}

/// A timeout in whole seconds; zero would fail every call, so it is invalid.
fn parse_timeout_secs(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match parse_var(var, name)? {
        Some(0) => Err(ConfigError::Invalid {
            name,
            value: var(name).unwrap_or_default(),
        }),
        secs => Ok(secs),
    }
}
