//! Rule-based classifier: keyword and regex matching for common phrasings.
//!
//! Answers the usual questions at zero cost and sub-millisecond latency.
//! Anything it can't match falls through to the cloud tier.

use std::sync::LazyLock;

use async_trait::async_trait;
use kq_protocol::{Classification, Parameters, QueryType, params};
use regex::Regex;

use super::{ClassificationError, Classifier, finalize};

/// A Kubernetes object name (lowercase DNS-1123 subdomain).
const NAME: &str = r"[a-z0-9](?:[a-z0-9.-]*[a-z0-9])?";

/// Words that follow "pod", "service", ... without being a name.
const STOPWORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "called", "check", "cluster", "current",
    "deployment", "deployments", "describe", "do", "does", "each", "every", "find", "for",
    "from", "get", "give", "has", "have", "in", "is", "it", "its", "list", "log", "logs",
    "me", "my", "named", "namespace", "namespaces", "node", "nodes", "of", "on", "pod", "pods",
    "port", "ports", "ready", "running", "service", "services", "show", "status", "tell",
    "that", "the", "this", "type", "uses", "use", "which", "what", "with",
];

/// Patterns that capture the name of a `kind` object, most explicit first.
fn name_patterns(kind: &str) -> Vec<Regex> {
    [
        format!(r#"\b{kind}s?\s+(?:named|called)\s+['"`]?({NAME})"#),
        format!(r#"\bthe\s+['"`]?({NAME})['"`]?\s+{kind}\b"#),
        format!(r#"\b{kind}\s+['"`]?({NAME})"#),
        format!(r#"['"`]?({NAME})['"`]?\s+{kind}\b"#),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
}

static POD_NAME: LazyLock<Vec<Regex>> = LazyLock::new(|| name_patterns("pod"));

static SERVICE_NAME: LazyLock<Vec<Regex>> = LazyLock::new(|| name_patterns("service"));

static NODE_NAME: LazyLock<Vec<Regex>> = LazyLock::new(|| name_patterns("node"));

static DEPLOYMENT_NAME: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let mut patterns = vec![
        Regex::new(&format!(
            r#"\b(?:spawned|created|managed|owned|started)\s+by\s+(?:the\s+)?(?:deployment\s+)?['"`]?({NAME})"#
        ))
        .unwrap(),
    ];
    patterns.extend(name_patterns("deployment"));
    patterns
});

static NAMESPACE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(&format!(
            r#"\b(?:in|from|within|of)\s+(?:the\s+)?['"`]?({NAME})['"`]?\s+namespace\b"#
        ))
        .unwrap(),
        Regex::new(&format!(r#"\bnamespace\s+(?:named\s+|called\s+)?['"`]?({NAME})"#)).unwrap(),
        // "... in kube-system?": a bare name closing the question.
        Regex::new(&format!(r#"\b(?:in|from|within)\s+['"`]?({NAME})['"`]?\s*(?:[?.!]|$)"#))
            .unwrap(),
    ]
});

/// Any "in <name>" phrase, attributed or not.
static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"\b(?:in|from|within)\s+(?:the\s+)?['"`]?({NAME})"#)).unwrap()
});

static LOGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\blogs?\b").unwrap());

static RESOURCES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:cpu|memory|resources?|requests?|limits?|resource usage)\b").unwrap()
});

/// Pattern-matching classifier for the common phrasings.
pub struct RuleBasedClassifier;

impl RuleBasedClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RuleBasedClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for RuleBasedClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        classify_text(text)
    }

    fn tier_name(&self) -> &str {
        "local"
    }
}

/// Core matching logic.
pub fn classify_text(text: &str) -> Result<Classification, ClassificationError> {
    let lower = text.to_lowercase();
    let lower = lower.trim();
    let query_type = detect_type(lower).ok_or(ClassificationError::Unrecognized)?;
    let parameters = extract_parameters(query_type, lower);
    // A location we could not read as a namespace must not become "default".
    if query_type.is_namespaced()
        && !parameters.contains(params::NAMESPACE)
        && has_unattributed_location(&parameters, lower)
    {
        return Err(ClassificationError::Unrecognized);
    }
    finalize(Classification::new(query_type, parameters))
}

/// Whether `text` names a place ("in foo", "from foo") that is neither a
/// stopword nor one of the names already extracted.
fn has_unattributed_location(parameters: &Parameters, text: &str) -> bool {
    LOCATION
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .any(|word| {
            !STOPWORDS.contains(&word) && !parameters.iter().any(|(_, value)| value == word)
        })
}

/// Pick the query type from keywords, most specific first.
fn detect_type(text: &str) -> Option<QueryType> {
    let pod = contains_word(text, "pod") || contains_word(text, "pods");
    let service = contains_word(text, "service") || contains_word(text, "services");
    let deployment = text.contains("deployment");

    // ── Pod detail queries ──────────────────────────────────────

    if LOGS.is_match(text) {
        return Some(QueryType::PodLogs);
    }
    if RESOURCES.is_match(text) && !service {
        return Some(QueryType::ResourceUsage);
    }
    if text.contains("container") {
        return Some(QueryType::PodContainers);
    }

    // ── Deployments ─────────────────────────────────────────────

    if text.contains("replica")
        || (contains_word(text, "deployment")
            && matches_any(text, &["how many pods", "number of pods", "count"]))
    {
        return Some(QueryType::DeploymentReplicas);
    }
    if matches_any(text, &["spawned by", "created by", "managed by", "owned by", "started by"])
        || (deployment && pod)
    {
        return Some(QueryType::DeploymentPods);
    }

    // ── Services ────────────────────────────────────────────────

    if service && text.contains("port") {
        return Some(QueryType::ServicePort);
    }
    if service && matches_any(text, &["type", "kind of service"]) {
        return Some(QueryType::ServiceType);
    }
    if contains_word(text, "services") {
        return Some(QueryType::ListServices);
    }

    // ── Nodes ───────────────────────────────────────────────────

    if matches_any(
        text,
        &["how many nodes", "number of nodes", "count nodes", "count the nodes", "node count"],
    ) {
        return Some(QueryType::CountNodes);
    }
    if contains_word(text, "node") && matches_any(text, &["status", "ready", "health", "state"]) {
        return Some(QueryType::NodeStatus);
    }

    // ── Namespaces ──────────────────────────────────────────────

    if pod
        && matches_any(
            text,
            &["which namespace", "what namespace", "namespace of", "namespace is", "namespace does"],
        )
    {
        return Some(QueryType::PodNamespace);
    }
    if contains_word(text, "namespaces") {
        return Some(QueryType::ListNamespaces);
    }

    // ── Pods ────────────────────────────────────────────────────

    if matches_any(
        text,
        &["how many pods", "number of pods", "count pods", "count the pods", "pod count"],
    ) {
        return Some(QueryType::CountPods);
    }
    if pod && matches_any(text, &["status", "state", "phase", "running", "health"]) {
        return Some(QueryType::PodStatus);
    }

    None
}

/// Extract the names `query_type` needs. Missing ones are left for
/// `finalize` to report.
fn extract_parameters(query_type: QueryType, text: &str) -> Parameters {
    let mut parameters = Parameters::new();
    for &parameter in query_type.required_parameters() {
        let patterns: &[Regex] = match parameter {
            params::POD_NAME => &POD_NAME,
            params::SERVICE_NAME => &SERVICE_NAME,
            params::NODE_NAME => &NODE_NAME,
            params::DEPLOYMENT_NAME => &DEPLOYMENT_NAME,
            params::NAMESPACE => &NAMESPACE,
            _ => continue,
        };
        if let Some(value) = first_name(patterns, text) {
            parameters.insert(parameter, value);
        }
    }
    parameters
}

/// First capture across `patterns` that is not a stopword.
fn first_name<'a>(patterns: &[Regex], text: &'a str) -> Option<&'a str> {
    patterns.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .find(|name| !STOPWORDS.contains(name))
    })
}

/// Check if the text contains any of the given patterns.
fn matches_any(text: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| text.contains(p))
}

/// Whole-word match (split on anything that can't be part of a name).
fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .any(|w| w == word)
}
