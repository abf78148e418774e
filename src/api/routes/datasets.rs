//! Dataset Routes
//!
//! Endpoints for adding, removing, and listing datasets.
//!
//! - PUT /api/v1/dataset/:id/:kind - Add a dataset from a JSON array of records
//! - DELETE /api/v1/dataset/:id - Remove a dataset
//! - GET /api/v1/datasets - List added datasets

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::api::dto::{AddDatasetResponse, ListDatasetsResponse, RemoveDatasetResponse, ResultResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::dataset::{Dataset, Kind};

/// PUT /api/v1/dataset/:id/:kind
///
/// Add a dataset. Returns the ids of all datasets now present.
pub async fn add_dataset(
    State(state): State<Arc<AppState>>,
    Path((id, kind)): Path<(String, String)>,
    Json(records): Json<JsonValue>,
) -> ApiResult<Json<AddDatasetResponse>> {
    let kind = Kind::from_str(&kind).ok_or_else(|| {
        ApiError::Validation(format!("Unknown dataset kind '{}', expected sections or rooms", kind))
    })?;

    if !records.is_array() {
        return Err(ApiError::Validation(
            "Dataset body must be a JSON array of records".to_string(),
        ));
    }

    let dataset = Dataset::from_json(id, kind, records)?;
    let ids = state.datasets.write().await.add(dataset)?;

    Ok(Json(ResultResponse::new(ids)))
}

/// DELETE /api/v1/dataset/:id
pub async fn remove_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<RemoveDatasetResponse>> {
    let removed = state.datasets.write().await.remove(&id)?;
    Ok(Json(ResultResponse::new(removed)))
}

/// GET /api/v1/datasets
pub async fn list_datasets(State(state): State<Arc<AppState>>) -> Json<ListDatasetsResponse> {
    let list = state.datasets.read().await.list();
    Json(ResultResponse::new(list))
}
