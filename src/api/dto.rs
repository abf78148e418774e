//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::dataset::DatasetInfo;
use crate::query::ResultRow;

/// Successful response envelope: `{"result": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultResponse<T> {
    pub result: T,
}

impl<T> ResultResponse<T> {
    pub fn new(result: T) -> Self {
        Self { result }
    }
}

/// PUT /api/v1/dataset/:id/:kind
pub type AddDatasetResponse = ResultResponse<Vec<String>>;

/// DELETE /api/v1/dataset/:id
pub type RemoveDatasetResponse = ResultResponse<String>;

/// GET /api/v1/datasets
pub type ListDatasetsResponse = ResultResponse<Vec<DatasetInfo>>;

/// POST /api/v1/query
pub type QueryResponse = ResultResponse<Vec<ResultRow>>;

/// Full health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,
    /// Number of datasets currently added
    pub datasets: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
