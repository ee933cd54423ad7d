//! Natural-language query endpoint.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use kq_protocol::{QueryRequest, QueryResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /query: classify the question, run its handler, return the answer.
pub async fn submit_query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<QueryResponse>> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let response = state.orchestrator.process(&request).await?;
    Ok(Json(response))
}
