//! The QueryHandler trait and shared parameter helpers.

use async_trait::async_trait;
use kq_protocol::{Parameters, QueryType};

use crate::error::{QueryError, QueryResult};
use crate::source::ClusterSource;

// ── QueryHandler Trait ────────────────────────────────────────

/// Answers one query type against a cluster.
///
/// Handlers validate their parameters before touching the cluster and
/// return a short human-readable answer.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    /// The query type this handler answers.
    fn query_type(&self) -> QueryType;

    /// Human-readable description.
    fn description(&self) -> &str {
        self.query_type().description()
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource)
    -> QueryResult<String>;
}

// ── Parameter helpers ─────────────────────────────────────────

/// Maximum length of a DNS-1123 subdomain.
const MAX_NAME_LEN: usize = 253;

/// Fetch a required, non-blank parameter.
pub fn require<'a>(params: &'a Parameters, name: &'static str) -> QueryResult<&'a str> {
    params.get(name).ok_or(QueryError::MissingParameter(name))
}

/// Fetch a required parameter and check it is a valid Kubernetes object name
/// (lowercase alphanumerics, `-` and `.`, alphanumeric at both ends).
pub fn require_name<'a>(params: &'a Parameters, name: &'static str) -> QueryResult<&'a str> {
    let value = require(params, name)?;
    validate_name(value).map_err(|reason| QueryError::InvalidParameter { name, reason })?;
    Ok(value)
}

fn validate_name(value: &str) -> Result<(), String> {
    if value.len() > MAX_NAME_LEN {
        return Err(format!("longer than {MAX_NAME_LEN} characters"));
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.'))
    {
        return Err(format!("invalid character {c:?} in {value:?}"));
    }
    let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    if !value.starts_with(alnum) || !value.ends_with(alnum) {
        return Err(format!("{value:?} must start and end with a letter or digit"));
    }
    Ok(())
}
