//! kubequery API: answers natural-language questions about a Kubernetes cluster.
//!
//! Startup is fail-fast: missing OpenAI credentials, unusable cluster
//! configuration, or an unreachable API server all abort the process.

use std::sync::Arc;

use anyhow::Context;
use kq_api::config::ApiConfig;
use kq_api::inference::{OpenAiClassifier, RuleBasedClassifier, TieredClassifier};
use kq_api::orchestrator::QueryOrchestrator;
use kq_api::registry::HandlerRegistry;
use kq_api::state::AppState;
use kq_api::{routes, telemetry};
use kq_cluster_tools::{ClusterSource, KubeClusterSource};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // kube and reqwest both link rustls; pin the process-wide provider.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    telemetry::init(&config.query_log_path).context("failed to initialise logging")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "kq-api starting");

    let cluster = KubeClusterSource::infer(config.retry_policy())
        .await
        .context("failed to load Kubernetes configuration")?;
    let nodes = cluster
        .list_nodes()
        .await
        .context("Kubernetes API server is unreachable")?;
    tracing::info!(nodes = nodes.len(), "connected to cluster");

    let cloud = OpenAiClassifier::new(config.openai.clone())
        .context("failed to build OpenAI client")?;
    tracing::info!(model = cloud.model(), "cloud classifier configured");
    let classifier = TieredClassifier::new(Box::new(RuleBasedClassifier::new()), Box::new(cloud));

    let registry = HandlerRegistry::new(kq_cluster_tools::handlers::all_handlers())?;
    tracing::info!(handlers = registry.len(), "handler registry ready");

    let orchestrator =
        QueryOrchestrator::new(Arc::new(classifier), Arc::new(registry), Arc::new(cluster));
    let app = routes::build_router(AppState::new(orchestrator));

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
