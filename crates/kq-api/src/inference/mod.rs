//! Natural-language classification of cluster questions.
//!
//! Converts user text ("how many pods are in kube-system?") into a
//! `Classification`: one of the 14 query types plus extracted parameters.
//!
//! Two tiers:
//! - **Rule-based** (local): keyword and regex matching, no network.
//! - **OpenAI** (cloud): chat-completions call for free-form phrasing.
//!
//! `TieredClassifier` combines them, local first.

pub mod openai;
pub mod rules;
pub mod tiered;

use async_trait::async_trait;
use kq_protocol::{Classification, DEFAULT_NAMESPACE, QueryType, params};

pub use openai::{OpenAiClassifier, OpenAiConfig};
pub use rules::RuleBasedClassifier;
pub use tiered::TieredClassifier;

/// Why a query could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassificationError {
    #[error("query does not match any supported query type")]
    Unrecognized,

    #[error("classifier returned unknown query type '{0}'")]
    UnknownType(String),

    #[error("query type '{query_type}' requires parameter '{parameter}'")]
    MissingParameter {
        query_type: QueryType,
        parameter: &'static str,
    },

    #[error("classification service error: {0}")]
    Upstream(String),
}

/// Trait for classifiers that map natural language onto a query type.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `text` and extract its parameters.
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError>;

    /// Name of this tier (for logging/audit).
    fn tier_name(&self) -> &str;
}

/// Map a raw type string from a classifier onto `QueryType`.
///
/// `"unknown"` (and blank) means the classifier declined.
pub fn resolve_type(raw: &str) -> Result<QueryType, ClassificationError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("unknown") {
        return Err(ClassificationError::Unrecognized);
    }
    raw.parse()
        .map_err(|_| ClassificationError::UnknownType(raw.to_string()))
}

/// Shared post-processing for every tier: default the namespace for
/// namespaced types, then require every parameter the type needs.
pub fn finalize(mut classification: Classification) -> Result<Classification, ClassificationError> {
    let query_type = classification.query_type;
    if query_type.is_namespaced() && !classification.parameters.contains(params::NAMESPACE) {
        classification
            .parameters
            .insert(params::NAMESPACE, DEFAULT_NAMESPACE);
    }
    for &parameter in query_type.required_parameters() {
        if !classification.parameters.contains(parameter) {
            return Err(ClassificationError::MissingParameter {
                query_type,
                parameter,
            });
        }
    }
    Ok(classification)
}
