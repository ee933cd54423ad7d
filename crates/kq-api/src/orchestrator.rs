//! Query orchestration: classify, dispatch, answer.

use std::sync::Arc;

use kq_cluster_tools::ClusterSource;
use kq_protocol::{QueryRequest, QueryResponse};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::inference::Classifier;
use crate::registry::HandlerRegistry;

/// Runs one query end to end. Shared read-only across requests.
pub struct QueryOrchestrator {
    classifier: Arc<dyn Classifier>,
    registry: Arc<HandlerRegistry>,
    cluster: Arc<dyn ClusterSource>,
}

impl QueryOrchestrator {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        registry: Arc<HandlerRegistry>,
        cluster: Arc<dyn ClusterSource>,
    ) -> Self {
        Self {
            classifier,
            registry,
            cluster,
        }
    }

    /// Answer `request`, translating every lower-level failure into `ApiError`.
    pub async fn process(&self, request: &QueryRequest) -> ApiResult<QueryResponse> {
        let text = request.query.trim();
        if text.is_empty() {
            return Err(ApiError::BadRequest("query must not be empty".into()));
        }

        let span = tracing::info_span!("query", request_id = %Uuid::now_v7());
        self.run(request, text).instrument(span).await
    }

    async fn run(&self, request: &QueryRequest, text: &str) -> ApiResult<QueryResponse> {
        tracing::info!(query = %text, "received query");

        let classification = self.classifier.classify(text).await.map_err(|err| {
            tracing::warn!(error = %err, "classification failed");
            ApiError::classification(&request.query, err)
        })?;
        tracing::info!(
            query_type = %classification.query_type,
            parameters = ?classification.parameters,
            tier = self.classifier.tier_name(),
            "classified query"
        );

        let answer = self
            .registry
            .dispatch(
                classification.query_type,
                &classification.parameters,
                self.cluster.as_ref(),
            )
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "query failed");
                ApiError::from(err)
            })?;
        tracing::info!(answer = %answer, "query answered");

        Ok(QueryResponse {
            query: request.query.clone(),
            answer,
        })
    }
}
