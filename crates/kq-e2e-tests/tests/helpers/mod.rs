//! Shared test harness for E2E integration tests.
//!
//! Drives the real router, orchestrator, classifiers, and handlers against
//! an in-memory cluster, optionally with a wiremock stand-in for OpenAI.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kq_api::inference::{
    Classifier, OpenAiClassifier, OpenAiConfig, RuleBasedClassifier, TieredClassifier,
};
use kq_api::orchestrator::QueryOrchestrator;
use kq_api::registry::HandlerRegistry;
use kq_api::routes::build_router;
use kq_api::state::AppState;
use kq_cluster_tools::MockClusterSource;

/// End-to-end harness: HTTP router over a mock cluster.
pub struct TestHarness {
    /// Axum router for HTTP requests via `tower::oneshot`.
    pub router: Router,
    /// The cluster every handler reads from.
    pub cluster: Arc<MockClusterSource>,
    /// OpenAI stand-in, when the cloud tier is wired in.
    pub openai: Option<MockServer>,
}

impl TestHarness {
    /// Rule-based classification over the sample cluster.
    pub fn with_sample_cluster() -> Self {
        Self::with_cluster(MockClusterSource::with_sample_cluster())
    }

    /// Rule-based classification over a custom cluster.
    pub fn with_cluster(cluster: MockClusterSource) -> Self {
        Self::build(cluster, Arc::new(RuleBasedClassifier::new()), None)
    }

    /// Local-first tiered classification with OpenAI served by wiremock.
    /// Mount expectations on `openai` before sending queries.
    pub async fn with_openai(cluster: MockClusterSource) -> Self {
        let server = MockServer::start().await;
        let mut config = OpenAiConfig::new("sk-test-key");
        config.base_url = server.uri();
        config.timeout_secs = 5;
        let cloud = OpenAiClassifier::new(config).unwrap();
        let classifier = TieredClassifier::new(Box::new(RuleBasedClassifier::new()), Box::new(cloud));
        Self::build(cluster, Arc::new(classifier), Some(server))
    }

    fn build(
        cluster: MockClusterSource,
        classifier: Arc<dyn Classifier>,
        openai: Option<MockServer>,
    ) -> Self {
        let cluster = Arc::new(cluster);
        let orchestrator = QueryOrchestrator::new(
            classifier,
            Arc::new(HandlerRegistry::with_defaults()),
            cluster.clone(),
        );
        Self {
            router: build_router(AppState::new(orchestrator)),
            cluster,
            openai,
        }
    }

    /// The wiremock server standing in for OpenAI.
    pub fn openai(&self) -> &MockServer {
        self.openai.as_ref().expect("harness built without OpenAI")
    }

    /// Mount a chat completion whose message content is `classification`.
    pub async fn mount_openai_reply(&self, classification: Value) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(openai_reply(&classification))
            .mount(self.openai())
            .await;
    }

    /// POST /query. Returns (HTTP status code, response JSON body).
    pub async fn query(&self, text: &str) -> (StatusCode, Value) {
        let body = json!({ "query": text });
        self.send(
            Request::post("/query")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
    }

    /// GET an arbitrary path.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    /// Number of reads the cluster has served so far.
    pub fn cluster_calls(&self) -> usize {
        self.cluster.call_count()
    }
}

/// Chat completions response carrying `classification` as the message content.
pub fn openai_reply(classification: &Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": classification.to_string(),
            },
            "finish_reason": "stop",
        }],
    }))
}
