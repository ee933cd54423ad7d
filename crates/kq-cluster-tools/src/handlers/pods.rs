//! Pod queries: count, status, containers, namespace lookup, logs, resources.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kq_protocol::{Parameters, QueryType, params};

use crate::error::{ClusterError, QueryResult};
use crate::names::simplify_name;
use crate::source::ClusterSource;
use crate::types::{QueryHandler, require_name};

/// Log lines fetched for `pod_logs`.
pub const LOG_TAIL_LINES: i64 = 10;

/// Byte cap on a `pod_logs` answer.
pub const MAX_LOG_BYTES: usize = 4000;

const TRUNCATED_MARKER: &str = "\n[truncated]";

fn pod_name(pod: &Pod) -> &str {
    pod.metadata.name.as_deref().unwrap_or_default()
}

// ── count_pods ────────────────────────────────────────────────

pub struct CountPods;

#[async_trait]
impl QueryHandler for CountPods {
    fn query_type(&self) -> QueryType {
        QueryType::CountPods
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let namespace = require_name(params, params::NAMESPACE)?;
        let pods = cluster.list_pods(namespace, None).await?;
        Ok(pods.len().to_string())
    }
}

// ── pod_status ────────────────────────────────────────────────

pub struct PodStatus;

#[async_trait]
impl QueryHandler for PodStatus {
    fn query_type(&self) -> QueryType {
        QueryType::PodStatus
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let name = require_name(params, params::POD_NAME)?;
        let namespace = require_name(params, params::NAMESPACE)?;
        let pod = cluster.get_pod(namespace, name).await?;
        let phase = pod
            .status
            .and_then(|s| s.phase)
            .unwrap_or_else(|| "Unknown".to_string());
        Ok(phase)
    }
}

// ── pod_containers ────────────────────────────────────────────

pub struct PodContainers;

#[async_trait]
impl QueryHandler for PodContainers {
    fn query_type(&self) -> QueryType {
        QueryType::PodContainers
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let name = require_name(params, params::POD_NAME)?;
        let namespace = require_name(params, params::NAMESPACE)?;
        let pod = cluster.get_pod(namespace, name).await?;
        let containers = pod.spec.map(|s| s.containers).unwrap_or_default();
        let names: Vec<&str> = containers.iter().map(|c| simplify_name(&c.name)).collect();
        Ok(names.join(","))
    }
}

// ── pod_namespace ─────────────────────────────────────────────

pub struct PodNamespace;

#[async_trait]
impl QueryHandler for PodNamespace {
    fn query_type(&self) -> QueryType {
        QueryType::PodNamespace
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let name = require_name(params, params::POD_NAME)?;
        let pods = cluster.list_all_pods().await?;

        // Users usually name a pod by its workload, so fall back to the
        // simplified name when nothing matches exactly.
        let found = pods
            .iter()
            .find(|p| pod_name(p) == name)
            .or_else(|| pods.iter().find(|p| simplify_name(pod_name(p)) == name));

        match found.and_then(|p| p.metadata.namespace.clone()) {
            Some(namespace) => Ok(namespace),
            None => Err(ClusterError::NotFound(format!(
                "pod \"{name}\" not found in any namespace"
            ))
            .into()),
        }
    }
}

// ── pod_logs ──────────────────────────────────────────────────

pub struct PodLogs;

#[async_trait]
impl QueryHandler for PodLogs {
    fn query_type(&self) -> QueryType {
        QueryType::PodLogs
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let name = require_name(params, params::POD_NAME)?;
        let namespace = require_name(params, params::NAMESPACE)?;
        // Multi-container pods need an explicit container; read the first.
        let pod = cluster.get_pod(namespace, name).await?;
        let container = pod
            .spec
            .as_ref()
            .and_then(|s| s.containers.first())
            .map(|c| c.name.as_str());
        let logs = cluster
            .pod_logs(namespace, name, container, LOG_TAIL_LINES)
            .await?;
        let logs = logs.trim();
        if logs.is_empty() {
            return Ok("No logs available".to_string());
        }
        Ok(cap_bytes(logs, MAX_LOG_BYTES))
    }
}

/// Keep at most `max` bytes of `text` (on a char boundary), marking the cut.
fn cap_bytes(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{TRUNCATED_MARKER}", &text[..end])
}

// ── resource_usage ────────────────────────────────────────────

pub struct ResourceUsage;

#[async_trait]
impl QueryHandler for ResourceUsage {
    fn query_type(&self) -> QueryType {
        QueryType::ResourceUsage
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let name = require_name(params, params::POD_NAME)?;
        let namespace = require_name(params, params::NAMESPACE)?;
        let pod = cluster.get_pod(namespace, name).await?;

        let resources = pod
            .spec
            .and_then(|s| s.containers.into_iter().next())
            .and_then(|c| c.resources);
        let (requests, limits) = match resources {
            Some(r) => (r.requests.unwrap_or_default(), r.limits.unwrap_or_default()),
            None => Default::default(),
        };
        if requests.is_empty() && limits.is_empty() {
            return Ok("No resource requests specified".to_string());
        }

        Ok(format!(
            "CPU request: {}, Memory request: {}, CPU limit: {}, Memory limit: {}",
            quantity(&requests, "cpu"),
            quantity(&requests, "memory"),
            quantity(&limits, "cpu"),
            quantity(&limits, "memory"),
        ))
    }
}

fn quantity(map: &BTreeMap<String, Quantity>, key: &str) -> String {
    map.get(key)
        .map(|q| q.0.clone())
        .unwrap_or_else(|| "none".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::mock::{ContainerFixture, MockClusterSource, PodFixture, container, pod};

    const SAMPLE_POD: &str = "my-deployment-56c598c8fc-x7z2p";

    fn pod_params(name: &str) -> Parameters {
        Parameters::new()
            .with(params::POD_NAME, name)
            .with(params::NAMESPACE, "default")
    }

    #[tokio::test]
    async fn count_pods_in_namespace() {
        let m = MockClusterSource::with_sample_cluster();
        let p = Parameters::new().with(params::NAMESPACE, "kube-system");
        assert_eq!(CountPods.handle(&p, &m).await.unwrap(), "3");
    }

    #[tokio::test]
    async fn count_pods_in_empty_namespace_is_zero() {
        let m = MockClusterSource::with_sample_cluster();
        let p = Parameters::new().with(params::NAMESPACE, "staging");
        assert_eq!(CountPods.handle(&p, &m).await.unwrap(), "0");
    }

    #[tokio::test]
    async fn pod_status_returns_phase() {
        let m = MockClusterSource::with_sample_cluster();
        let answer = PodStatus.handle(&pod_params(SAMPLE_POD), &m).await.unwrap();
        assert_eq!(answer, "Running");
    }

    #[tokio::test]
    async fn pod_status_without_phase_is_unknown() {
        let mut m = MockClusterSource::new();
        let mut bare = pod("default", "bare", "Running");
        bare.status = None;
        m.add_pod(bare);
        assert_eq!(PodStatus.handle(&pod_params("bare"), &m).await.unwrap(), "Unknown");
    }

    #[tokio::test]
    async fn pod_status_missing_name_makes_no_cluster_call() {
        let m = MockClusterSource::with_sample_cluster();
        let p = Parameters::new().with(params::NAMESPACE, "default");
        let err = PodStatus.handle(&p, &m).await.unwrap_err();
        assert_eq!(err, QueryError::MissingParameter("pod_name"));
        assert_eq!(m.call_count(), 0);
    }

    #[tokio::test]
    async fn pod_status_invalid_name_makes_no_cluster_call() {
        let m = MockClusterSource::with_sample_cluster();
        let err = PodStatus
            .handle(&pod_params("Not_A_Pod"), &m)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter { name: "pod_name", .. }));
        assert_eq!(m.call_count(), 0);
    }

    #[tokio::test]
    async fn pod_status_unknown_pod_is_not_found() {
        let m = MockClusterSource::with_sample_cluster();
        let err = PodStatus.handle(&pod_params("ghost"), &m).await.unwrap_err();
        assert!(matches!(err, QueryError::Cluster(ClusterError::NotFound(_))));
    }

    #[tokio::test]
    async fn pod_containers_are_simplified() {
        let m = MockClusterSource::with_sample_cluster();
        let answer = PodContainers
            .handle(&pod_params(SAMPLE_POD), &m)
            .await
            .unwrap();
        assert_eq!(answer, "nginx,log-shipper");
    }

    #[tokio::test]
    async fn pod_namespace_exact_match() {
        let m = MockClusterSource::with_sample_cluster();
        let p = Parameters::new().with(params::POD_NAME, "kube-proxy-9xk4w");
        assert_eq!(PodNamespace.handle(&p, &m).await.unwrap(), "kube-system");
    }

    #[tokio::test]
    async fn pod_namespace_simplified_match() {
        let m = MockClusterSource::with_sample_cluster();
        let p = Parameters::new().with(params::POD_NAME, "coredns");
        assert_eq!(PodNamespace.handle(&p, &m).await.unwrap(), "kube-system");
    }

    #[tokio::test]
    async fn pod_namespace_not_found() {
        let m = MockClusterSource::with_sample_cluster();
        let p = Parameters::new().with(params::POD_NAME, "ghost");
        let err = PodNamespace.handle(&p, &m).await.unwrap_err();
        assert!(matches!(err, QueryError::Cluster(ClusterError::NotFound(_))));
    }

    #[tokio::test]
    async fn pod_logs_trimmed_tail() {
        let m = MockClusterSource::with_sample_cluster();
        let answer = PodLogs.handle(&pod_params(SAMPLE_POD), &m).await.unwrap();
        assert!(answer.starts_with("10.0.0.1"));
        assert!(!answer.ends_with('\n'));
    }

    #[tokio::test]
    async fn pod_logs_names_first_container_of_multi_container_pod() {
        let mut m = MockClusterSource::new();
        m.add_pod(
            pod("default", "web-5f7c9", "Running")
                .with_container(container("app", "example/app:1"))
                .with_container(container("istio-proxy", "istio/proxyv2:1.22")),
        );
        m.add_logs("default", "web-5f7c9", "ready\n");
        let answer = PodLogs.handle(&pod_params("web-5f7c9"), &m).await.unwrap();
        assert_eq!(answer, "ready");
        assert_eq!(m.call_count(), 2);
    }

    #[tokio::test]
    async fn pod_logs_unknown_pod_is_not_found() {
        let m = MockClusterSource::with_sample_cluster();
        let err = PodLogs.handle(&pod_params("ghost"), &m).await.unwrap_err();
        assert!(matches!(err, QueryError::Cluster(ClusterError::NotFound(_))));
        assert_eq!(m.call_count(), 1);
    }

    #[tokio::test]
    async fn pod_logs_keeps_last_ten_lines() {
        let mut m = MockClusterSource::new();
        m.add_pod(pod("default", "chatty", "Running"));
        let text: String = (1..=25).map(|i| format!("line {i}\n")).collect();
        m.add_logs("default", "chatty", text);
        let answer = PodLogs.handle(&pod_params("chatty"), &m).await.unwrap();
        assert_eq!(answer.lines().count(), 10);
        assert!(answer.starts_with("line 16"));
        assert!(answer.ends_with("line 25"));
    }

    #[tokio::test]
    async fn pod_logs_empty() {
        let mut m = MockClusterSource::new();
        m.add_pod(pod("default", "quiet", "Running"));
        m.add_logs("default", "quiet", "  \n");
        let answer = PodLogs.handle(&pod_params("quiet"), &m).await.unwrap();
        assert_eq!(answer, "No logs available");
    }

    #[tokio::test]
    async fn pod_logs_capped() {
        let mut m = MockClusterSource::new();
        m.add_pod(pod("default", "noisy", "Running"));
        m.add_logs("default", "noisy", "é".repeat(3000));
        let answer = PodLogs.handle(&pod_params("noisy"), &m).await.unwrap();
        assert!(answer.ends_with("[truncated]"));
        assert!(answer.len() <= MAX_LOG_BYTES + TRUNCATED_MARKER.len());
    }

    #[tokio::test]
    async fn resource_usage_reports_first_container() {
        let m = MockClusterSource::with_sample_cluster();
        let answer = ResourceUsage
            .handle(&pod_params(SAMPLE_POD), &m)
            .await
            .unwrap();
        assert_eq!(
            answer,
            "CPU request: 100m, Memory request: 128Mi, CPU limit: 500m, Memory limit: 256Mi"
        );
    }

    #[tokio::test]
    async fn resource_usage_partial() {
        let mut m = MockClusterSource::new();
        m.add_pod(
            pod("default", "half", "Running")
                .with_container(container("app", "app:1").requests(&[("cpu", "250m")])),
        );
        let answer = ResourceUsage.handle(&pod_params("half"), &m).await.unwrap();
        assert_eq!(
            answer,
            "CPU request: 250m, Memory request: none, CPU limit: none, Memory limit: none"
        );
    }

    #[tokio::test]
    async fn resource_usage_none_specified() {
        let mut m = MockClusterSource::new();
        m.add_pod(pod("default", "bare", "Running").with_container(container("app", "app:1")));
        let answer = ResourceUsage.handle(&pod_params("bare"), &m).await.unwrap();
        assert_eq!(answer, "No resource requests specified");
    }

    #[test]
    fn cap_bytes_respects_char_boundaries() {
        let capped = cap_bytes("ééé", 3);
        assert_eq!(capped, format!("é{TRUNCATED_MARKER}"));
        assert_eq!(cap_bytes("short", 100), "short");
    }
}
