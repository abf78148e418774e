//! Query Routes
//!
//! - POST /api/v1/query - Validate and execute a query document

use axum::{extract::State, Json};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::api::dto::{QueryResponse, ResultResponse};
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// POST /api/v1/query
///
/// Execute a query and return its rows. Validation failures and oversized
/// results are both 400s with different error codes.
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(query): Json<JsonValue>,
) -> ApiResult<Json<QueryResponse>> {
    let output = {
        let datasets = state.datasets.read().await;
        state.executor.execute_json(&query, &*datasets)?
    };

    tracing::info!(
        rows = output.len(),
        scanned = output.records_scanned,
        execution_time_ms = output.execution_time_ms,
        "Query executed"
    );

    Ok(Json(ResultResponse::new(output.rows)))
}
