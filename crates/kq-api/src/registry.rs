//! Handler registry: one `QueryHandler` per query type.
//!
//! Built once at startup and shared read-only; the orchestrator uses it to
//! dispatch every classified query.

use std::collections::HashMap;

use kq_cluster_tools::handlers;
use kq_cluster_tools::{ClusterSource, QueryError, QueryHandler, QueryResult};
use kq_protocol::{Parameters, QueryType};
use serde::Serialize;

/// Registry construction failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate handler for query type '{0}'")]
    Duplicate(QueryType),

    #[error("no handler registered for query type '{0}'")]
    Missing(QueryType),
}

/// Metadata about a registered handler (used for introspection/logging).
#[derive(Debug, Clone, Serialize)]
pub struct HandlerInfo {
    pub query_type: QueryType,
    pub description: String,
    pub required_parameters: Vec<&'static str>,
}

/// Complete mapping from query type to handler.
pub struct HandlerRegistry {
    handlers: HashMap<QueryType, Box<dyn QueryHandler>>,
}

impl HandlerRegistry {
    /// Build a registry, requiring exactly one handler for every query type.
    pub fn new(handlers: Vec<Box<dyn QueryHandler>>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(handlers.len());
        for handler in handlers {
            let query_type = handler.query_type();
            if index.insert(query_type, handler).is_some() {
                return Err(RegistryError::Duplicate(query_type));
            }
        }
        if let Some(missing) = QueryType::ALL.into_iter().find(|t| !index.contains_key(t)) {
            return Err(RegistryError::Missing(missing));
        }
        Ok(Self { handlers: index })
    }

    /// Build with the default handler for every query type.
    pub fn with_defaults() -> Self {
        Self {
            handlers: handlers::all_handlers()
                .into_iter()
                .map(|h| (h.query_type(), h))
                .collect(),
        }
    }

    /// Run the handler for `query_type`.
    pub async fn dispatch(
        &self,
        query_type: QueryType,
        params: &Parameters,
        cluster: &dyn ClusterSource,
    ) -> QueryResult<String> {
        let handler = self
            .handlers
            .get(&query_type)
            .ok_or_else(|| QueryError::UnsupportedQueryType(query_type.to_string()))?;
        tracing::debug!(query_type = %query_type, "dispatching query");
        handler.handle(params, cluster).await
    }

    /// Dispatch on a raw type string; unknown strings never reach a handler.
    pub async fn dispatch_named(
        &self,
        query_type: &str,
        params: &Parameters,
        cluster: &dyn ClusterSource,
    ) -> QueryResult<String> {
        let parsed: QueryType = query_type
            .parse()
            .map_err(|_| QueryError::UnsupportedQueryType(query_type.to_string()))?;
        self.dispatch(parsed, params, cluster).await
    }

    /// Registered query types, in taxonomy order.
    pub fn query_types(&self) -> Vec<QueryType> {
        QueryType::ALL
            .into_iter()
            .filter(|t| self.handlers.contains_key(t))
            .collect()
    }

    /// Describe every registered handler.
    pub fn describe(&self) -> Vec<HandlerInfo> {
        self.query_types()
            .into_iter()
            .filter_map(|t| self.handlers.get(&t))
            .map(|h| HandlerInfo {
                query_type: h.query_type(),
                description: h.description().to_string(),
                required_parameters: h.query_type().required_parameters().to_vec(),
            })
            .collect()
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
