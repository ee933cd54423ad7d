//! Cluster-scoped queries: nodes and namespaces.

use async_trait::async_trait;
use kq_protocol::{Parameters, QueryType, params};

use crate::error::QueryResult;
use crate::source::ClusterSource;
use crate::types::{QueryHandler, require_name};

pub struct CountNodes;

#[async_trait]
impl QueryHandler for CountNodes {
    fn query_type(&self) -> QueryType {
        QueryType::CountNodes
    }

    async fn handle(&self, _params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let nodes = cluster.list_nodes().await?;
        Ok(nodes.len().to_string())
    }
}

pub struct ListNamespaces;

#[async_trait]
impl QueryHandler for ListNamespaces {
    fn query_type(&self) -> QueryType {
        QueryType::ListNamespaces
    }

    async fn handle(&self, _params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let namespaces = cluster.list_namespaces().await?;
        // Namespace names are chosen by people, never generated.
        let names: Vec<&str> = namespaces
            .iter()
            .filter_map(|ns| ns.metadata.name.as_deref())
            .collect();
        Ok(names.join(","))
    }
}

pub struct NodeStatus;

#[async_trait]
impl QueryHandler for NodeStatus {
    fn query_type(&self) -> QueryType {
        QueryType::NodeStatus
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let name = require_name(params, params::NODE_NAME)?;
        let node = cluster.get_node(name).await?;
        let ready = node
            .status
            .and_then(|s| s.conditions)
            .unwrap_or_default()
            .into_iter()
            .find(|c| c.type_ == "Ready")
            .map(|c| c.status);
        let answer = match ready.as_deref() {
            Some("True") => "Ready",
            Some("False") => "NotReady",
            _ => "Unknown",
        };
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClusterError, QueryError};
    use crate::mock::{MockClusterSource, node};

    fn node_params(name: &str) -> Parameters {
        Parameters::new().with(params::NODE_NAME, name)
    }

    #[tokio::test]
    async fn count_nodes() {
        let m = MockClusterSource::with_sample_cluster();
        assert_eq!(CountNodes.handle(&Parameters::new(), &m).await.unwrap(), "2");
    }

    #[tokio::test]
    async fn count_nodes_ignores_parameters() {
        let m = MockClusterSource::with_sample_cluster();
        let p = Parameters::new().with(params::NAMESPACE, "kube-system");
        assert_eq!(CountNodes.handle(&p, &m).await.unwrap(), "2");
    }

    #[tokio::test]
    async fn list_namespaces_not_simplified() {
        let mut m = MockClusterSource::with_sample_cluster();
        m.add_namespace("team-56c598c8fc");
        let answer = ListNamespaces.handle(&Parameters::new(), &m).await.unwrap();
        assert_eq!(answer, "default,kube-system,team-56c598c8fc");
    }

    #[tokio::test]
    async fn node_ready_and_not_ready() {
        let m = MockClusterSource::with_sample_cluster();
        assert_eq!(NodeStatus.handle(&node_params("control-plane"), &m).await.unwrap(), "Ready");
        assert_eq!(NodeStatus.handle(&node_params("worker-1"), &m).await.unwrap(), "NotReady");
    }

    #[tokio::test]
    async fn node_without_ready_condition_is_unknown() {
        let mut m = MockClusterSource::new();
        m.add_node(node("fresh", None));
        m.add_node(node("flaky", Some("Unknown")));
        assert_eq!(NodeStatus.handle(&node_params("fresh"), &m).await.unwrap(), "Unknown");
        assert_eq!(NodeStatus.handle(&node_params("flaky"), &m).await.unwrap(), "Unknown");
    }

    #[tokio::test]
    async fn node_status_missing_name_makes_no_cluster_call() {
        let m = MockClusterSource::with_sample_cluster();
        let err = NodeStatus.handle(&Parameters::new(), &m).await.unwrap_err();
        assert_eq!(err, QueryError::MissingParameter("node_name"));
        assert_eq!(m.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_node_is_not_found() {
        let m = MockClusterSource::with_sample_cluster();
        let err = NodeStatus.handle(&node_params("ghost"), &m).await.unwrap_err();
        assert!(matches!(err, QueryError::Cluster(ClusterError::NotFound(_))));
    }

    #[tokio::test]
    async fn cluster_failure_propagates() {
        let mut m = MockClusterSource::new();
        m.fail_with(ClusterError::Unavailable("connection refused".into()));
        let err = CountNodes.handle(&Parameters::new(), &m).await.unwrap_err();
        assert!(matches!(err, QueryError::Cluster(ClusterError::Unavailable(_))));
    }
}
