//! Mock cluster source for testing: serves pre-loaded Kubernetes objects.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, Namespace, Node, NodeCondition, NodeStatus, Pod, PodSpec, PodStatus,
    ResourceRequirements, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use crate::error::{ClusterError, ClusterResult};
use crate::source::ClusterSource;

/// In-memory cluster with call counting and optional injected failure.
#[derive(Default)]
pub struct MockClusterSource {
    pods: Vec<Pod>,
    nodes: Vec<Node>,
    namespaces: Vec<Namespace>,
    deployments: Vec<Deployment>,
    services: Vec<Service>,
    logs: HashMap<(String, String), String>,
    failure: Option<ClusterError>,
    calls: AtomicUsize,
}

impl MockClusterSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pod(&mut self, pod: Pod) {
        self.pods.push(pod);
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn add_namespace(&mut self, name: &str) {
        self.namespaces.push(namespace(name));
    }

    pub fn add_deployment(&mut self, deployment: Deployment) {
        self.deployments.push(deployment);
    }

    pub fn add_service(&mut self, service: Service) {
        self.services.push(service);
    }

    pub fn add_logs(&mut self, namespace: &str, pod: &str, text: impl Into<String>) {
        self.logs
            .insert((namespace.to_string(), pod.to_string()), text.into());
    }

    /// Make every subsequent call fail with `err`.
    pub fn fail_with(&mut self, err: ClusterError) {
        self.failure = Some(err);
    }

    /// Number of cluster calls issued so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A small two-namespace cluster used across tests.
    ///
    /// - `default`: one pod from `my-deployment`, services `backend`
    ///   (ClusterIP:8080), `frontend` (NodePort:80), `kubernetes` (ClusterIP:443)
    /// - `kube-system`: two `coredns` pods and one `kube-proxy` pod
    /// - nodes `control-plane` (Ready) and `worker-1` (NotReady)
    pub fn with_sample_cluster() -> Self {
        let mut m = Self::new();
        m.add_namespace("default");
        m.add_namespace("kube-system");

        let app = labels(&[("app", "my-deployment")]);
        let dns = labels(&[("k8s-app", "kube-dns")]);

        m.add_pod(
            pod("default", "my-deployment-56c598c8fc-x7z2p", "Running")
                .labelled(app.clone())
                .with_container(
                    container("nginx", "docker.io/library/nginx:1.25")
                        .requests(&[("cpu", "100m"), ("memory", "128Mi")])
                        .limits(&[("cpu", "500m"), ("memory", "256Mi")]),
                )
                .with_container(container("log-shipper-7d9fb", "fluent/fluent-bit:3.0")),
        );
        m.add_pod(
            pod("kube-system", "coredns-7db6d8ff4d-4lq2x", "Running")
                .labelled(dns.clone())
                .with_container(container("coredns", "registry.k8s.io/coredns:v1.11.1")),
        );
        m.add_pod(
            pod("kube-system", "coredns-7db6d8ff4d-9zwfk", "Running")
                .labelled(dns.clone())
                .with_container(container("coredns", "registry.k8s.io/coredns:v1.11.1")),
        );
        m.add_pod(
            pod("kube-system", "kube-proxy-9xk4w", "Pending")
                .with_container(container("kube-proxy", "registry.k8s.io/kube-proxy:v1.30.0")),
        );

        m.add_deployment(deployment("default", "my-deployment", app, Some(1)));
        m.add_deployment(deployment("kube-system", "coredns", dns, Some(2)));

        m.add_service(service("default", "backend", "ClusterIP", &[8080]));
        m.add_service(service("default", "frontend", "NodePort", &[80, 443]));
        m.add_service(service("default", "kubernetes", "ClusterIP", &[443]));
        m.add_service(service("kube-system", "kube-dns", "ClusterIP", &[53]));

        m.add_node(node("control-plane", Some("True")));
        m.add_node(node("worker-1", Some("False")));

        m.add_logs(
            "default",
            "my-deployment-56c598c8fc-x7z2p",
            "10.0.0.1 - - \"GET / HTTP/1.1\" 200\n10.0.0.2 - - \"GET /health HTTP/1.1\" 200\n",
        );
        m
    }

    fn record_call(&self) -> ClusterResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn not_found(kind: &str, name: &str) -> ClusterError {
    ClusterError::NotFound(format!("{kind} \"{name}\" not found"))
}

fn meta_matches(meta: &ObjectMeta, namespace: Option<&str>, name: Option<&str>) -> bool {
    namespace.is_none_or(|ns| meta.namespace.as_deref() == Some(ns))
        && name.is_none_or(|n| meta.name.as_deref() == Some(n))
}

/// Match a label selector (`k=v`, `k in (a,b)`, `k notin (a,b)`, `k`, `!k`)
/// against an object's labels.
fn selector_matches(meta: &ObjectMeta, selector: &str) -> bool {
    let empty = BTreeMap::new();
    let labels = meta.labels.as_ref().unwrap_or(&empty);
    selector_terms(selector).all(|term| term_matches(labels, term))
}

/// Split on the commas that are not inside a `( )` value set.
fn selector_terms(selector: &str) -> impl Iterator<Item = &str> {
    let mut terms = Vec::new();
    let (mut depth, mut start) = (0usize, 0);
    for (i, c) in selector.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                terms.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    terms.push(&selector[start..]);
    terms.into_iter().map(str::trim).filter(|t| !t.is_empty())
}

fn term_matches(labels: &BTreeMap<String, String>, term: &str) -> bool {
    if let Some(key) = term.strip_prefix('!') {
        return !labels.contains_key(key.trim());
    }
    if let Some((key, set)) = term.split_once(" notin ") {
        return labels
            .get(key.trim())
            .is_none_or(|v| !value_set(set).contains(&v.as_str()));
    }
    if let Some((key, set)) = term.split_once(" in ") {
        return labels
            .get(key.trim())
            .is_some_and(|v| value_set(set).contains(&v.as_str()));
    }
    match term.split_once('=') {
        Some((k, v)) => labels.get(k.trim()).map(String::as_str) == Some(v.trim()),
        None => labels.contains_key(term),
    }
}

fn value_set(set: &str) -> Vec<&str> {
    set.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .collect()
}

#[async_trait]
impl ClusterSource for MockClusterSource {
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> ClusterResult<Vec<Pod>> {
        self.record_call()?;
        Ok(self
            .pods
            .iter()
            .filter(|p| meta_matches(&p.metadata, Some(namespace), None))
            .filter(|p| label_selector.is_none_or(|s| selector_matches(&p.metadata, s)))
            .cloned()
            .collect())
    }

    async fn list_all_pods(&self) -> ClusterResult<Vec<Pod>> {
        self.record_call()?;
        Ok(self.pods.clone())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> ClusterResult<Pod> {
        self.record_call()?;
        self.pods
            .iter()
            .find(|p| meta_matches(&p.metadata, Some(namespace), Some(name)))
            .cloned()
            .ok_or_else(|| not_found("pods", name))
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        name: &str,
        container: Option<&str>,
        tail_lines: i64,
    ) -> ClusterResult<String> {
        self.record_call()?;
        let pod = self
            .pods
            .iter()
            .find(|p| meta_matches(&p.metadata, Some(namespace), Some(name)))
            .ok_or_else(|| not_found("pods", name))?;

        // Same rules (and 400s) as the API server's log endpoint.
        let containers: Vec<&str> = pod
            .spec
            .iter()
            .flat_map(|s| s.containers.iter().map(|c| c.name.as_str()))
            .collect();
        match container {
            None if containers.len() > 1 => {
                return Err(ClusterError::Api {
                    code: 400,
                    message: format!(
                        "a container name must be specified for pod {name}, choose one of: [{}]",
                        containers.join(" ")
                    ),
                });
            }
            Some(c) if !containers.contains(&c) => {
                return Err(ClusterError::Api {
                    code: 400,
                    message: format!("container {c} is not valid for pod {name}"),
                });
            }
            _ => {}
        }

        let text = self
            .logs
            .get(&(namespace.to_string(), name.to_string()))
            .map(String::as_str)
            .unwrap_or("");
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(tail_lines.max(0) as usize);
        Ok(lines[start..].join("\n"))
    }

    async fn list_nodes(&self) -> ClusterResult<Vec<Node>> {
        self.record_call()?;
        Ok(self.nodes.clone())
    }

    async fn get_node(&self, name: &str) -> ClusterResult<Node> {
        self.record_call()?;
        self.nodes
            .iter()
            .find(|n| meta_matches(&n.metadata, None, Some(name)))
            .cloned()
            .ok_or_else(|| not_found("nodes", name))
    }

    async fn list_namespaces(&self) -> ClusterResult<Vec<Namespace>> {
        self.record_call()?;
        Ok(self.namespaces.clone())
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> ClusterResult<Deployment> {
        self.record_call()?;
        self.deployments
            .iter()
            .find(|d| meta_matches(&d.metadata, Some(namespace), Some(name)))
            .cloned()
            .ok_or_else(|| not_found("deployments.apps", name))
    }

    async fn list_services(&self, namespace: &str) -> ClusterResult<Vec<Service>> {
        self.record_call()?;
        Ok(self
            .services
            .iter()
            .filter(|s| meta_matches(&s.metadata, Some(namespace), None))
            .cloned()
            .collect())
    }

    async fn get_service(&self, namespace: &str, name: &str) -> ClusterResult<Service> {
        self.record_call()?;
        self.services
            .iter()
            .find(|s| meta_matches(&s.metadata, Some(namespace), Some(name)))
            .cloned()
            .ok_or_else(|| not_found("services", name))
    }
}

// ── Fixture builders ────────────────────────────────────────────

pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn meta(namespace: Option<&str>, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        ..ObjectMeta::default()
    }
}

pub fn namespace(name: &str) -> Namespace {
    Namespace {
        metadata: meta(None, name),
        ..Namespace::default()
    }
}

/// A pod with the given phase and no containers.
pub fn pod(namespace: &str, name: &str, phase: &str) -> Pod {
    Pod {
        metadata: meta(Some(namespace), name),
        spec: Some(PodSpec::default()),
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..PodStatus::default()
        }),
        ..Pod::default()
    }
}

pub fn container(name: &str, image: &str) -> Container {
    Container {
        name: name.to_string(),
        image: Some(image.to_string()),
        ..Container::default()
    }
}

/// Chainable tweaks for pod fixtures.
pub trait PodFixture {
    fn labelled(self, labels: BTreeMap<String, String>) -> Self;
    fn with_container(self, container: Container) -> Self;
}

impl PodFixture for Pod {
    fn labelled(mut self, labels: BTreeMap<String, String>) -> Self {
        self.metadata.labels = Some(labels);
        self
    }

    fn with_container(mut self, container: Container) -> Self {
        self.spec
            .get_or_insert_with(PodSpec::default)
            .containers
            .push(container);
        self
    }
}

/// Chainable resource settings for container fixtures.
pub trait ContainerFixture {
    fn requests(self, pairs: &[(&str, &str)]) -> Self;
    fn limits(self, pairs: &[(&str, &str)]) -> Self;
}

fn quantities(pairs: &[(&str, &str)]) -> BTreeMap<String, Quantity> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
        .collect()
}

impl ContainerFixture for Container {
    fn requests(mut self, pairs: &[(&str, &str)]) -> Self {
        self.resources
            .get_or_insert_with(ResourceRequirements::default)
            .requests = Some(quantities(pairs));
        self
    }

    fn limits(mut self, pairs: &[(&str, &str)]) -> Self {
        self.resources
            .get_or_insert_with(ResourceRequirements::default)
            .limits = Some(quantities(pairs));
        self
    }
}

pub fn deployment(
    namespace: &str,
    name: &str,
    match_labels: BTreeMap<String, String>,
    replicas: Option<i32>,
) -> Deployment {
    Deployment {
        metadata: meta(Some(namespace), name),
        spec: Some(DeploymentSpec {
            replicas,
            selector: LabelSelector {
                match_labels: Some(match_labels),
                ..LabelSelector::default()
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    }
}

pub fn service(namespace: &str, name: &str, service_type: &str, ports: &[i32]) -> Service {
    Service {
        metadata: meta(Some(namespace), name),
        spec: Some(ServiceSpec {
            type_: Some(service_type.to_string()),
            ports: Some(
                ports
                    .iter()
                    .map(|&port| ServicePort {
                        port,
                        ..ServicePort::default()
                    })
                    .collect(),
            ),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}

/// A node whose `Ready` condition has the given status (`None` = no conditions).
pub fn node(name: &str, ready: Option<&str>) -> Node {
    let conditions = ready.map(|status| {
        vec![
            NodeCondition {
                type_: "MemoryPressure".to_string(),
                status: "False".to_string(),
                ..NodeCondition::default()
            },
            NodeCondition {
                type_: "Ready".to_string(),
                status: status.to_string(),
                ..NodeCondition::default()
            },
        ]
    });
    Node {
        metadata: meta(None, name),
        status: Some(NodeStatus {
            conditions,
            ..NodeStatus::default()
        }),
        ..Node::default()
    }
}
