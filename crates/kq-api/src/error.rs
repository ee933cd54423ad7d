//! Unified API error type with Axum `IntoResponse` support.

use std::sync::LazyLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kq_cluster_tools::{ClusterError, QueryError};
use regex::Regex;
use serde_json::json;

use crate::inference::ClassificationError;

/// API error type that converts to proper HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{source}")]
    Classification {
        query: String,
        #[source]
        source: ClassificationError,
    },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn classification(query: impl Into<String>, source: ClassificationError) -> Self {
        Self::Classification {
            query: query.into(),
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Classification {
                source: ClassificationError::Upstream(_),
                ..
            } => StatusCode::BAD_GATEWAY,
            Self::Classification { .. } => StatusCode::BAD_REQUEST,
            Self::Query(err) => match err {
                QueryError::MissingParameter(_) | QueryError::InvalidParameter { .. } => {
                    StatusCode::BAD_REQUEST
                }
                QueryError::UnsupportedQueryType(_) => StatusCode::INTERNAL_SERVER_ERROR,
                QueryError::Cluster(cluster) => match cluster {
                    ClusterError::NotFound(_) => StatusCode::NOT_FOUND,
                    ClusterError::Unavailable(_) | ClusterError::Timeout { .. } => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    ClusterError::Forbidden(_)
                    | ClusterError::Api { .. }
                    | ClusterError::Other(_) => StatusCode::BAD_GATEWAY,
                },
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                "internal server error".to_string()
            }
            other => redact_credentials(&other.to_string()),
        };

        let mut body = json!({
            "error": message,
            "status": status.as_u16(),
        });
        if let ApiError::Classification { query, .. } = &self {
            body["query"] = json!(query);
        }

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience alias.
pub type ApiResult<T> = Result<T, ApiError>;

// ── Credential redaction ────────────────────────────────────────

static REDACTIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)\b(bearer\s+)[a-z0-9._~+/-]+=*").unwrap(),
            "${1}[REDACTED]",
        ),
        (
            Regex::new(r#"(?i)\b(token|password|passwd|secret|api[_-]?key)(\s*[=:]\s*)[^\s&,;"']+"#)
                .unwrap(),
            "${1}${2}[REDACTED]",
        ),
        (
            Regex::new(r"\bsk-[A-Za-z0-9_-]{8,}").unwrap(),
            "sk-[REDACTED]",
        ),
    ]
});

/// Mask bearer tokens, `token=`/`password=`/`api_key=` values and `sk-` keys
/// in messages that may echo upstream errors.
pub fn redact_credentials(message: &str) -> String {
    REDACTIONS
        .iter()
        .fold(message.to_string(), |text, (re, replacement)| {
            re.replace_all(&text, *replacement).into_owned()
        })
}
