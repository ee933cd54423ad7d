//! Cluster source abstraction: read-only access to the Kubernetes API.
//!
//! Handlers only ever see `&dyn ClusterSource`, so they run unchanged
//! against the live API server (`KubeClusterSource`) or scripted fixtures
//! (`MockClusterSource`).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod, Service};
use kube::Client;
use kube::api::{Api, ListParams, LogParams};

use crate::error::{ClusterError, ClusterResult};

/// Read-only cluster operations consumed by the query handlers.
#[async_trait]
pub trait ClusterSource: Send + Sync {
    /// List pods in a namespace, optionally filtered by a label selector
    /// (`key=value,key2=value2`).
    async fn list_pods(&self, namespace: &str, label_selector: Option<&str>)
    -> ClusterResult<Vec<Pod>>;

    /// List pods across every namespace.
    async fn list_all_pods(&self) -> ClusterResult<Vec<Pod>>;

    async fn get_pod(&self, namespace: &str, name: &str) -> ClusterResult<Pod>;

    /// Fetch the last `tail_lines` lines of a pod's log. `container` is
    /// required by the API server when the pod runs more than one.
    async fn pod_logs(
        &self,
        namespace: &str,
        name: &str,
        container: Option<&str>,
        tail_lines: i64,
    ) -> ClusterResult<String>;

    async fn list_nodes(&self) -> ClusterResult<Vec<Node>>;

    async fn get_node(&self, name: &str) -> ClusterResult<Node>;

    async fn list_namespaces(&self) -> ClusterResult<Vec<Namespace>>;

    async fn get_deployment(&self, namespace: &str, name: &str) -> ClusterResult<Deployment>;

    async fn list_services(&self, namespace: &str) -> ClusterResult<Vec<Service>>;

    async fn get_service(&self, namespace: &str, name: &str) -> ClusterResult<Service>;
}

// ── Timeout & retry ─────────────────────────────────────────────

/// Bounds applied to every cluster call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Pause before retrying a transient failure.
    pub retry_delay: Duration,
    /// Extra attempts after the first, transient failures only.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry_delay: Duration::from_millis(200),
            max_retries: 1,
        }
    }
}

/// Run `call` under `policy`: each attempt is bounded by `policy.timeout`,
/// and transient failures (unreachable, throttled, timed out) are retried
/// up to `policy.max_retries` times. Not-found and forbidden fail at once.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> ClusterResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClusterResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(ClusterError::Timeout {
                timeout_ms: policy.timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Err(err) if err.is_transient() && attempt <= policy.max_retries => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_retries + 1,
                    delay_ms = policy.retry_delay.as_millis() as u64,
                    error = %err,
                    "transient cluster error, retrying"
                );
                tokio::time::sleep(policy.retry_delay).await;
            }
            Err(err) => {
                tracing::debug!(operation, attempt, error = %err, "cluster call failed");
                return Err(err);
            }
            Ok(value) => return Ok(value),
        }
    }
}

// ── Live cluster ────────────────────────────────────────────────

/// `ClusterSource` backed by a `kube::Client`.
///
/// The client is cheap to clone and safe for concurrent reads; one instance
/// is shared by every request for the life of the process.
pub struct KubeClusterSource {
    client: Client,
    policy: RetryPolicy,
}

impl KubeClusterSource {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Connect using the ambient configuration (kubeconfig or in-cluster).
    pub async fn infer(policy: RetryPolicy) -> ClusterResult<Self> {
        let config = kube::Config::infer()
            .await
            .map_err(|e| ClusterError::Other(format!("failed to load cluster config: {e}")))?;
        let client = Client::try_from(config)?;
        Ok(Self::new(client, policy))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn cluster_scoped<K>(&self) -> Api<K>
    where
        K: kube::Resource,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::all(self.client.clone())
    }
}

#[async_trait]
impl ClusterSource for KubeClusterSource {
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> ClusterResult<Vec<Pod>> {
        let api: &Api<Pod> = &self.namespaced(namespace);
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let params = &params;
        let list = with_retry(&self.policy, "list_pods", move || async move {
            api.list(params).await.map_err(ClusterError::from)
        })
        .await?;
        Ok(list.items)
    }

    async fn list_all_pods(&self) -> ClusterResult<Vec<Pod>> {
        let api: &Api<Pod> = &self.cluster_scoped();
        let list = with_retry(&self.policy, "list_all_pods", move || async move {
            api.list(&ListParams::default())
                .await
                .map_err(ClusterError::from)
        })
        .await?;
        Ok(list.items)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> ClusterResult<Pod> {
        let api: &Api<Pod> = &self.namespaced(namespace);
        with_retry(&self.policy, "get_pod", move || async move {
            api.get(name).await.map_err(ClusterError::from)
        })
        .await
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        name: &str,
        container: Option<&str>,
        tail_lines: i64,
    ) -> ClusterResult<String> {
        let api: &Api<Pod> = &self.namespaced(namespace);
        let params = &LogParams {
            container: container.map(str::to_string),
            tail_lines: Some(tail_lines),
            ..LogParams::default()
        };
        with_retry(&self.policy, "pod_logs", move || async move {
            api.logs(name, params).await.map_err(ClusterError::from)
        })
        .await
    }

    async fn list_nodes(&self) -> ClusterResult<Vec<Node>> {
        let api: &Api<Node> = &self.cluster_scoped();
        let list = with_retry(&self.policy, "list_nodes", move || async move {
            api.list(&ListParams::default())
                .await
                .map_err(ClusterError::from)
        })
        .await?;
        Ok(list.items)
    }

    async fn get_node(&self, name: &str) -> ClusterResult<Node> {
        let api: &Api<Node> = &self.cluster_scoped();
        with_retry(&self.policy, "get_node", move || async move {
            api.get(name).await.map_err(ClusterError::from)
        })
        .await
    }

    async fn list_namespaces(&self) -> ClusterResult<Vec<Namespace>> {
        let api: &Api<Namespace> = &self.cluster_scoped();
        let list = with_retry(&self.policy, "list_namespaces", move || async move {
            api.list(&ListParams::default())
                .await
                .map_err(ClusterError::from)
        })
        .await?;
        Ok(list.items)
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> ClusterResult<Deployment> {
        let api: &Api<Deployment> = &self.namespaced(namespace);
        with_retry(&self.policy, "get_deployment", move || async move {
            api.get(name).await.map_err(ClusterError::from)
        })
        .await
    }

    async fn list_services(&self, namespace: &str) -> ClusterResult<Vec<Service>> {
        let api: &Api<Service> = &self.namespaced(namespace);
        let list = with_retry(&self.policy, "list_services", move || async move {
            api.list(&ListParams::default())
                .await
                .map_err(ClusterError::from)
        })
        .await?;
        Ok(list.items)
    }

    async fn get_service(&self, namespace: &str, name: &str) -> ClusterResult<Service> {
        let api: &Api<Service> = &self.namespaced(namespace);
        with_retry(&self.policy, "get_service", move || async move {
            api.get(name).await.map_err(ClusterError::from)
        })
        .await
    }
}
