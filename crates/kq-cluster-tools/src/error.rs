//! Cluster and query-handler error types.

use thiserror::Error;

/// Errors from a read-only cluster call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("cluster unavailable: {0}")]
    Unavailable(String),

    #[error("cluster call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("cluster API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("{0}")]
    Other(String),
}

impl ClusterError {
    /// Connectivity failures worth one more attempt. Never true for
    /// not-found or forbidden.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        let message = err.to_string();
        match &err {
            kube::Error::Api(status) => match status.code {
                404 => Self::NotFound(message),
                401 | 403 => Self::Forbidden(message),
                429 | 503 | 504 => Self::Unavailable(message),
                code => Self::Api { code, message },
            },
            kube::Error::HyperError(_) | kube::Error::Service(_) => Self::Unavailable(message),
            _ => Self::Other(message),
        }
    }
}

/// Convenience alias for cluster results.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors raised while answering a classified query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("unsupported query type: {0}")]
    UnsupportedQueryType(String),

    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Convenience alias for handler results.
pub type QueryResult<T> = Result<T, QueryError>;
