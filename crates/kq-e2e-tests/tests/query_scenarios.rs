//! E2E tests for answered queries: HTTP → classification → handler → cluster → answer.

mod helpers;

use axum::http::StatusCode;

use helpers::TestHarness;

/// "How many pods are in the default namespace?" with one pod present.
#[tokio::test]
async fn e2e_count_pods_in_default_namespace() {
    let h = TestHarness::with_sample_cluster();

    let (status, json) = h.query("How many pods are in the default namespace?").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["query"], "How many pods are in the default namespace?");
    assert_eq!(json["answer"], "1");
}

/// A bare namespace closing the question is read as the namespace.
#[tokio::test]
async fn e2e_count_pods_in_bare_namespace() {
    let h = TestHarness::with_sample_cluster();

    let (status, json) = h.query("How many pods are in kube-system?").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "3");
}

/// Pods owned by a deployment come back with their generated suffixes stripped.
#[tokio::test]
async fn e2e_deployment_pods_simplified() {
    let h = TestHarness::with_sample_cluster();

    let (status, json) = h.query("Which pod is spawned by my-deployment?").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "my-deployment");
}

#[tokio::test]
async fn e2e_service_type() {
    let h = TestHarness::with_sample_cluster();

    let (status, json) = h.query("What type is the service called backend?").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "ClusterIP");
}

#[tokio::test]
async fn e2e_service_port() {
    let h = TestHarness::with_sample_cluster();

    let (status, json) = h.query("what port does the frontend service use?").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "80");
}

#[tokio::test]
async fn e2e_pod_containers_simplified() {
    let h = TestHarness::with_sample_cluster();

    let (status, json) = h
        .query("Which containers run in pod my-deployment-56c598c8fc-x7z2p?")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "nginx,log-shipper");
}

#[tokio::test]
async fn e2e_pod_status_in_named_namespace() {
    let h = TestHarness::with_sample_cluster();

    let (status, json) = h
        .query("What is the status of the pod named kube-proxy-9xk4w in the kube-system namespace?")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "Pending");
}

/// A simplified pod name still resolves to the namespace of the real pod.
#[tokio::test]
async fn e2e_pod_namespace_by_simplified_name() {
    let h = TestHarness::with_sample_cluster();

    let (status, json) = h.query("Which namespace is the pod coredns in?").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "kube-system");
}

#[tokio::test]
async fn e2e_deployment_replicas() {
    let h = TestHarness::with_sample_cluster();

    let (status, json) = h
        .query("How many replicas does the deployment coredns have in the kube-system namespace?")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "2");
}

#[tokio::test]
async fn e2e_cluster_scoped_queries() {
    let h = TestHarness::with_sample_cluster();

    let cases = [
        ("How many nodes are there in the cluster?", "2"),
        ("Is node worker-1 ready?", "NotReady"),
        ("What namespaces exist?", "default,kube-system"),
    ];
    for (text, expected) in cases {
        let (status, json) = h.query(text).await;
        assert_eq!(status, StatusCode::OK, "{text}: {json}");
        assert_eq!(json["answer"], expected, "{text}");
    }
}

#[tokio::test]
async fn e2e_pod_logs() {
    let h = TestHarness::with_sample_cluster();

    let (status, json) = h
        .query("show me the logs of pod my-deployment-56c598c8fc-x7z2p")
        .await;

    assert_eq!(status, StatusCode::OK);
    let answer = json["answer"].as_str().unwrap();
    assert!(answer.starts_with("10.0.0.1"));
    assert!(answer.contains("GET /health"));
}

#[tokio::test]
async fn e2e_resource_usage() {
    let h = TestHarness::with_sample_cluster();

    let (status, json) = h
        .query("What are the CPU and memory requests of pod my-deployment-56c598c8fc-x7z2p?")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["answer"],
        "CPU request: 100m, Memory request: 128Mi, CPU limit: 500m, Memory limit: 256Mi"
    );
}

/// Each answered query costs exactly the reads its handler needs.
#[tokio::test]
async fn e2e_single_cluster_read_per_simple_query() {
    let h = TestHarness::with_sample_cluster();

    h.query("How many nodes are there in the cluster?").await;

    assert_eq!(h.cluster_calls(), 1);
}

#[tokio::test]
async fn e2e_health_needs_no_cluster() {
    let h = TestHarness::with_sample_cluster();

    let (status, json) = h.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(h.cluster_calls(), 0);
}
