use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Well-known parameter keys extracted by the classifier.
pub mod params {
    pub const NAMESPACE: &str = "namespace";
    pub const POD_NAME: &str = "pod_name";
    pub const DEPLOYMENT_NAME: &str = "deployment_name";
    pub const SERVICE_NAME: &str = "service_name";
    pub const NODE_NAME: &str = "node_name";
}

/// Namespace assumed when a namespaced query does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// The closed set of questions the system can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    CountPods,
    PodStatus,
    CountNodes,
    DeploymentPods,
    ServicePort,
    DeploymentReplicas,
    PodContainers,
    ServiceType,
    PodNamespace,
    ListNamespaces,
    NodeStatus,
    ListServices,
    PodLogs,
    ResourceUsage,
}

impl QueryType {
    /// Every query type, in declaration order.
    pub const ALL: [QueryType; 14] = [
        Self::CountPods,
        Self::PodStatus,
        Self::CountNodes,
        Self::DeploymentPods,
        Self::ServicePort,
        Self::DeploymentReplicas,
        Self::PodContainers,
        Self::ServiceType,
        Self::PodNamespace,
        Self::ListNamespaces,
        Self::NodeStatus,
        Self::ListServices,
        Self::PodLogs,
        Self::ResourceUsage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CountPods => "count_pods",
            Self::PodStatus => "pod_status",
            Self::CountNodes => "count_nodes",
            Self::DeploymentPods => "deployment_pods",
            Self::ServicePort => "service_port",
            Self::DeploymentReplicas => "deployment_replicas",
            Self::PodContainers => "pod_containers",
            Self::ServiceType => "service_type",
            Self::PodNamespace => "pod_namespace",
            Self::ListNamespaces => "list_namespaces",
            Self::NodeStatus => "node_status",
            Self::ListServices => "list_services",
            Self::PodLogs => "pod_logs",
            Self::ResourceUsage => "resource_usage",
        }
    }

    /// Parameters a classification of this type must carry.
    pub fn required_parameters(&self) -> &'static [&'static str] {
        use params::*;
        match self {
            Self::CountPods | Self::ListServices => &[NAMESPACE],
            Self::CountNodes | Self::ListNamespaces => &[],
            Self::PodStatus
            | Self::PodContainers
            | Self::PodLogs
            | Self::ResourceUsage => &[POD_NAME, NAMESPACE],
            Self::DeploymentPods | Self::DeploymentReplicas => &[DEPLOYMENT_NAME, NAMESPACE],
            Self::ServicePort | Self::ServiceType => &[SERVICE_NAME, NAMESPACE],
            Self::PodNamespace => &[POD_NAME],
            Self::NodeStatus => &[NODE_NAME],
        }
    }

    /// Whether this query is scoped to a namespace.
    pub fn is_namespaced(&self) -> bool {
        self.required_parameters().contains(&params::NAMESPACE)
    }

    /// One-line description, also used in the classifier prompt.
    pub fn description(&self) -> &'static str {
        match self {
            Self::CountPods => "Count pods in a namespace",
            Self::PodStatus => "Get the status (phase) of a specific pod",
            Self::CountNodes => "Count cluster nodes",
            Self::DeploymentPods => "List the pods spawned by a deployment",
            Self::ServicePort => "Get the port of a service",
            Self::DeploymentReplicas => "Get the replica count of a deployment",
            Self::PodContainers => "List the containers in a pod",
            Self::ServiceType => "Get the type of a service (ClusterIP, NodePort, LoadBalancer, ...)",
            Self::PodNamespace => "Find which namespace a pod lives in",
            Self::ListNamespaces => "List all namespaces",
            Self::NodeStatus => "Get the readiness status of a specific node",
            Self::ListServices => "List the services in a namespace",
            Self::PodLogs => "Get the recent logs of a pod",
            Self::ResourceUsage => "Get the CPU/memory requests and limits of a pod",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type string outside the 14 recognized values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown query type: {0}")]
pub struct UnknownQueryType(pub String);

impl FromStr for QueryType {
    type Err = UnknownQueryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|qt| qt.as_str() == s)
            .ok_or_else(|| UnknownQueryType(s.to_string()))
    }
}

/// Query parameters extracted by the classifier (string keys, scalar values).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, String>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Trimmed value for `key`; blank values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Structured interpretation of a free-form query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub query_type: QueryType,
    #[serde(default)]
    pub parameters: Parameters,
}

impl Classification {
    pub fn new(query_type: QueryType, parameters: Parameters) -> Self {
        Self {
            query_type,
            parameters,
        }
    }
}

/// Body of `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// Successful answer to a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
}
