//! Tiered classifier: local-first with cloud fallback.
//!
//! Tries the local (rule-based) classifier first. On any local failure,
//! falls back to the cloud (OpenAI) classifier. When the cloud tier cannot
//! recognize the query either, the local tier's error is returned.

use async_trait::async_trait;
use kq_protocol::Classification;

use super::{ClassificationError, Classifier};

/// Composite classifier that tries local inference first, then cloud.
pub struct TieredClassifier {
    local: Box<dyn Classifier>,
    cloud: Box<dyn Classifier>,
}

impl TieredClassifier {
    pub fn new(local: Box<dyn Classifier>, cloud: Box<dyn Classifier>) -> Self {
        Self { local, cloud }
    }
}

#[async_trait]
impl Classifier for TieredClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        let local_err = match self.local.classify(text).await {
            Ok(classification) => {
                tracing::debug!(tier = self.local.tier_name(), "classified locally");
                return Ok(classification);
            }
            Err(err) => err,
        };

        tracing::debug!(
            error = %local_err,
            tier = self.cloud.tier_name(),
            "local classification missed, falling back to cloud"
        );
        match self.cloud.classify(text).await {
            Err(ClassificationError::Unrecognized) => Err(local_err),
            other => other,
        }
    }

    fn tier_name(&self) -> &str {
        "tiered"
    }
}
