//! Service queries: port, type, and listing.

use async_trait::async_trait;
use kq_protocol::{Parameters, QueryType, params};

use crate::error::QueryResult;
use crate::names::simplify_name;
use crate::source::ClusterSource;
use crate::types::{QueryHandler, require_name};

pub struct ServicePort;

#[async_trait]
impl QueryHandler for ServicePort {
    fn query_type(&self) -> QueryType {
        QueryType::ServicePort
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let name = require_name(params, params::SERVICE_NAME)?;
        let namespace = require_name(params, params::NAMESPACE)?;
        let service = cluster.get_service(namespace, name).await?;
        let port = service
            .spec
            .and_then(|s| s.ports)
            .and_then(|ports| ports.first().map(|p| p.port));
        Ok(match port {
            Some(port) => port.to_string(),
            None => "No ports defined".to_string(),
        })
    }
}

pub struct ServiceType;

#[async_trait]
impl QueryHandler for ServiceType {
    fn query_type(&self) -> QueryType {
        QueryType::ServiceType
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let name = require_name(params, params::SERVICE_NAME)?;
        let namespace = require_name(params, params::NAMESPACE)?;
        let service = cluster.get_service(namespace, name).await?;
        Ok(service
            .spec
            .and_then(|s| s.type_)
            .unwrap_or_else(|| "ClusterIP".to_string()))
    }
}

pub struct ListServices;

#[async_trait]
impl QueryHandler for ListServices {
    fn query_type(&self) -> QueryType {
        QueryType::ListServices
    }

    async fn handle(&self, params: &Parameters, cluster: &dyn ClusterSource) -> QueryResult<String> {
        let namespace = require_name(params, params::NAMESPACE)?;
        let services = cluster.list_services(namespace).await?;
        let names: Vec<&str> = services
            .iter()
            .map(|s| simplify_name(s.metadata.name.as_deref().unwrap_or_default()))
            .collect();
        Ok(names.join(","))
    }
}
