//! Shared application state for the Axum server.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kq_cluster_tools::ClusterSource;

use crate::inference::RuleBasedClassifier;
use crate::orchestrator::QueryOrchestrator;
use crate::registry::HandlerRegistry;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Classify → dispatch pipeline.
    pub orchestrator: Arc<QueryOrchestrator>,
    /// Process start, for `/health` uptime.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: QueryOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            started_at: Utc::now(),
        }
    }

    /// Rule-based classification only, against the given cluster (tests and development).
    pub fn local(cluster: Arc<dyn ClusterSource>) -> Self {
        Self::new(QueryOrchestrator::new(
            Arc::new(RuleBasedClassifier::new()),
            Arc::new(HandlerRegistry::with_defaults()),
            cluster,
        ))
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }
}
