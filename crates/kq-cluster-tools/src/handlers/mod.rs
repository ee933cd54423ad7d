//! Query handler implementations, one per query type.

pub mod cluster;
pub mod pods;
pub mod services;
pub mod workloads;

use kq_protocol::QueryType;

use crate::types::QueryHandler;

/// The handler answering `query_type`.
///
/// Exhaustive over `QueryType`, so adding a variant without a handler
/// fails to compile.
pub fn handler_for(query_type: QueryType) -> Box<dyn QueryHandler> {
    match query_type {
        QueryType::CountPods => Box::new(pods::CountPods),
        QueryType::PodStatus => Box::new(pods::PodStatus),
        QueryType::CountNodes => Box::new(cluster::CountNodes),
        QueryType::DeploymentPods => Box::new(workloads::DeploymentPods),
        QueryType::ServicePort => Box::new(services::ServicePort),
        QueryType::DeploymentReplicas => Box::new(workloads::DeploymentReplicas),
        QueryType::PodContainers => Box::new(pods::PodContainers),
        QueryType::ServiceType => Box::new(services::ServiceType),
        QueryType::PodNamespace => Box::new(pods::PodNamespace),
        QueryType::ListNamespaces => Box::new(cluster::ListNamespaces),
        QueryType::NodeStatus => Box::new(cluster::NodeStatus),
        QueryType::ListServices => Box::new(services::ListServices),
        QueryType::PodLogs => Box::new(pods::PodLogs),
        QueryType::ResourceUsage => Box::new(pods::ResourceUsage),
    }
}

/// One handler for every query type.
pub fn all_handlers() -> Vec<Box<dyn QueryHandler>> {
    QueryType::ALL.into_iter().map(handler_for).collect()
}

/// Join names with `,`, dropping repeats but keeping first-seen order.
pub(crate) fn join_unique<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use kq_protocol::Parameters;

    use crate::error::QueryError;
    use crate::mock::MockClusterSource;

    #[test]
    fn every_type_has_a_matching_handler() {
        let handlers = all_handlers();
        assert_eq!(handlers.len(), QueryType::ALL.len());
        for (handler, expected) in handlers.iter().zip(QueryType::ALL) {
            assert_eq!(handler.query_type(), expected);
            assert!(!handler.description().is_empty());
        }
    }

    #[tokio::test]
    async fn any_missing_required_parameter_fails_before_cluster_call() {
        for query_type in QueryType::ALL {
            let handler = handler_for(query_type);
            let required = query_type.required_parameters();
            for &missing in required {
                let params: Parameters = required
                    .iter()
                    .filter(|&&name| name != missing)
                    .map(|&name| (name, "default"))
                    .collect();
                let cluster = MockClusterSource::with_sample_cluster();

                let result = handler.handle(&params, &cluster).await;

                assert_eq!(
                    result,
                    Err(QueryError::MissingParameter(missing)),
                    "{query_type} without {missing}"
                );
                assert_eq!(cluster.call_count(), 0, "{query_type} without {missing}");
            }
        }
    }

    #[tokio::test]
    async fn blank_required_parameter_counts_as_missing() {
        let params = Parameters::new()
            .with(kq_protocol::params::POD_NAME, "coredns-7db6d8ff4d-4lq2x")
            .with(kq_protocol::params::NAMESPACE, "  ");
        let cluster = MockClusterSource::with_sample_cluster();
        let result = handler_for(QueryType::PodStatus).handle(&params, &cluster).await;
        assert_eq!(result, Err(QueryError::MissingParameter("namespace")));
        assert_eq!(cluster.call_count(), 0);
    }

    #[test]
    fn join_unique_keeps_order() {
        assert_eq!(join_unique(["web", "api", "web", "db"]), "web,api,db");
        assert_eq!(join_unique(std::iter::empty()), "");
    }
}
