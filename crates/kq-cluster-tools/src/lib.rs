//! Kubernetes query handlers for kubequery.
//!
//! Provides a read-only `ClusterSource` abstraction (live `kube::Client` or
//! in-memory mock), resource name simplification, and one `QueryHandler`
//! per query type: count_pods, pod_status, count_nodes, deployment_pods,
//! service_port, deployment_replicas, pod_containers, service_type,
//! pod_namespace, list_namespaces, node_status, list_services, pod_logs,
//! resource_usage.

pub mod error;
pub mod handlers;
pub mod mock;
pub mod names;
pub mod source;
pub mod types;

// Re-export key types for convenience
pub use error::{ClusterError, ClusterResult, QueryError, QueryResult};
pub use mock::MockClusterSource;
pub use names::simplify_name;
pub use source::{ClusterSource, KubeClusterSource, RetryPolicy, with_retry};
pub use types::QueryHandler;
