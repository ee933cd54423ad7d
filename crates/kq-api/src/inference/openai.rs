//! OpenAI chat-completions classifier for free-form questions.
//!
//! Sends the question with a system prompt describing every query type and
//! asks for a JSON object `{"type": ..., "parameters": {...}}`
//! (`response_format: json_object`, temperature 0).

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use kq_protocol::{Classification, Parameters, QueryType};
use serde::{Deserialize, Serialize};

use super::{ClassificationError, Classifier, finalize, resolve_type};

const PROMPT_HEADER: &str = r#"You are a Kubernetes query classification assistant. Classify the user's question into exactly one of the query types below and extract its parameters.

QUERY TYPES:"#;

const PROMPT_FOOTER: &str = r#"PARAMETERS:
- namespace: the namespace mentioned in the question; omit it if none is mentioned
- pod_name, deployment_name, service_name, node_name: the resource name exactly as written

RULES:
- Omit parameters that are not mentioned in the question.
- For questions that match no query type, return {"type": "unknown", "parameters": {}}

Respond with ONLY a JSON object of this shape:
{"type": "<query type>", "parameters": {"<name>": "<value>"}}

EXAMPLES:
"Which pod is spawned by my-deployment?" -> {"type": "deployment_pods", "parameters": {"deployment_name": "my-deployment"}}
"What is the status of the pod named 'example-pod'?" -> {"type": "pod_status", "parameters": {"pod_name": "example-pod"}}
"How many nodes are there in the cluster?" -> {"type": "count_nodes", "parameters": {}}
"How many pods are in the default namespace?" -> {"type": "count_pods", "parameters": {"namespace": "default"}}"#;

/// System prompt listing every query type with its parameters.
static SYSTEM_PROMPT: LazyLock<String> = LazyLock::new(|| {
    let types: Vec<String> = QueryType::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let required = t.required_parameters();
            let params = if required.is_empty() {
                "no parameters".to_string()
            } else {
                format!("parameters: {}", required.join(", "))
            };
            format!("{}. \"{t}\" - {} ({params})", i + 1, t.description())
        })
        .collect();
    format!("{PROMPT_HEADER}\n{}\n\n{PROMPT_FOOTER}", types.join("\n"))
});

/// Configuration for the OpenAI-compatible chat endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Model to use for classification.
    pub model: String,
    /// API base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Chat completions request body.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: u8,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Chat completions response (only fields we need).
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Raw model output before validation.
#[derive(Deserialize)]
struct RawClassification {
    #[serde(rename = "type")]
    query_type: Option<String>,
    #[serde(default)]
    parameters: serde_json::Map<String, serde_json::Value>,
}

/// Cloud-tier classifier backed by the chat completions API.
pub struct OpenAiClassifier {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClassifier {
    pub fn new(config: OpenAiConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "openai request failed");
                let reason = if e.is_timeout() { "timed out" } else { "failed" };
                ClassificationError::Upstream(format!("classification request {reason}: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "openai returned non-200");
            return Err(ClassificationError::Upstream(format!(
                "classification service returned {status}"
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to parse openai response body");
            ClassificationError::Upstream(format!("malformed classification response: {e}"))
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassificationError::Upstream("empty classification response".into()))?;

        let classification = parse_content(&content)?;
        tracing::debug!(
            query_type = %classification.query_type,
            model = %self.config.model,
            "openai classification"
        );
        Ok(classification)
    }

    fn tier_name(&self) -> &str {
        "openai"
    }
}

/// Parse the model's JSON answer into a validated `Classification`.
fn parse_content(content: &str) -> Result<Classification, ClassificationError> {
    let raw: RawClassification = serde_json::from_str(extract_json(content)).map_err(|e| {
        tracing::warn!(error = %e, content = %content, "openai returned invalid JSON");
        ClassificationError::Upstream(format!("classifier returned invalid JSON: {e}"))
    })?;

    let query_type = resolve_type(raw.query_type.as_deref().unwrap_or_default())?;
    let parameters: Parameters = raw
        .parameters
        .into_iter()
        .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key, v)))
        .collect();
    finalize(Classification::new(query_type, parameters))
}

/// Stringify a scalar parameter; nulls and nested values are dropped.
fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extract JSON from model output that may be wrapped in markdown code blocks.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    trimmed
}
