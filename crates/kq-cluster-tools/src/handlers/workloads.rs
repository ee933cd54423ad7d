//! Deployment queries: spawned pods and replica count.

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kq_protocol::{Parameters, QueryType, params};

use crate::error::{ClusterError, QueryResult};
use crate::handlers::join_unique;
use crate::names::simplify_name;
use crate::source::ClusterSource;
use crate::types::{QueryHandler, require_name};

pub struct DeploymentPods;

#[async_trait]
impl QueryHandler for DeploymentPods {
    fn query_type(&self) -> QueryType {
        QueryType::DeploymentPods
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let name = require_name(params, params::DEPLOYMENT_NAME)?;
        let namespace = require_name(params, params::NAMESPACE)?;
        let deployment = cluster.get_deployment(namespace, name).await?;

        let selector = deployment
            .spec
            .map(|s| selector_string(&s.selector))
            .transpose()?
            .unwrap_or_default();
        // An empty selector would match every pod in the namespace.
        if selector.is_empty() {
            return Err(ClusterError::Other(format!(
                "deployment \"{name}\" has an empty pod selector"
            ))
            .into());
        }

        let pods = cluster.list_pods(namespace, Some(&selector)).await?;
        if pods.is_empty() {
            return Ok("No pods found".to_string());
        }
        Ok(join_unique(pods.iter().map(|p| {
            simplify_name(p.metadata.name.as_deref().unwrap_or_default())
        })))
    }
}

/// Render a label selector in the API server's query syntax.
fn selector_string(selector: &LabelSelector) -> Result<String, ClusterError> {
    let mut terms: Vec<String> = selector
        .match_labels
        .iter()
        .flatten()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    for requirement in selector.match_expressions.iter().flatten() {
        let key = &requirement.key;
        let values = requirement.values.as_deref().unwrap_or_default().join(",");
        terms.push(match requirement.operator.as_str() {
            "In" => format!("{key} in ({values})"),
            "NotIn" => format!("{key} notin ({values})"),
            "Exists" => key.clone(),
            "DoesNotExist" => format!("!{key}"),
            other => {
                return Err(ClusterError::Other(format!(
                    "unsupported label selector operator \"{other}\""
                )));
            }
        });
    }
    Ok(terms.join(","))
}

pub struct DeploymentReplicas;

#[async_trait]
impl QueryHandler for DeploymentReplicas {
    fn query_type(&self) -> QueryType {
        QueryType::DeploymentReplicas
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let name = require_name(params, params::DEPLOYMENT_NAME)?;
        let namespace = require_name(params, params::NAMESPACE)?;
        let deployment = cluster.get_deployment(namespace, name).await?;
        // The API server defaults an unset replica count to 1.
        let replicas = deployment.spec.and_then(|s| s.replicas).unwrap_or(1);
        Ok(replicas.to_string())
    }
}
