//! kubequery protocol: shared types across all crates.
//!
//! Defines the closed query taxonomy (`QueryType`), the classifier output
//! (`Classification`), and the HTTP request/response bodies.

pub mod query;

pub use query::{
    Classification, DEFAULT_NAMESPACE, Parameters, QueryRequest, QueryResponse, QueryType,
    UnknownQueryType, params,
};
