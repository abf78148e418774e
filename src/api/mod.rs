//! Insight REST API
//!
//! HTTP API layer for Insight, built with Axum.
//!
//! # Endpoints
//!
//! ## Datasets
//! - `PUT /api/v1/dataset/:id/:kind` - Add a dataset (`sections` or `rooms`)
//! - `DELETE /api/v1/dataset/:id` - Remove a dataset
//! - `GET /api/v1/datasets` - List datasets
//!
//! ## Query
//! - `POST /api/v1/query` - Execute a query
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,no_run
//! use insight::api::{serve, ApiConfig, AppState};
//! use insight::dataset::DatasetStore;
//! use insight::query::QueryExecutor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApiConfig::default();
//!     let state = AppState::new(DatasetStore::new(), QueryExecutor::default(), config.clone());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let api_routes = Router::new()
        // Dataset routes
        .route("/dataset/:id/:kind", put(routes::datasets::add_dataset))
        .route("/dataset/:id", delete(routes::datasets::remove_dataset))
        .route("/datasets", get(routes::datasets::list_datasets))
        // Query routes
        .route("/query", post(routes::query::execute_query))
        .layer(DefaultBodyLimit::max(config.max_body_size));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(cors_layer(&config.cors_origins))
        .with_state(shared_state)
}

/// Restrict CORS to the configured origins, or allow any when none are set
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Insight API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Insight API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetStore;
    use crate::query::QueryExecutor;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn create_test_app(executor: QueryExecutor) -> Router {
        let state = AppState::new(DatasetStore::new(), executor, ApiConfig::default());
        build_router(state)
    }

    fn sections() -> Value {
        json!([
            {
                "uuid": "1", "id": "310", "title": "sftwr eng", "instructor": "",
                "dept": "cpsc", "year": 2015, "avg": 71.07, "pass": 100, "fail": 2, "audit": 0
            },
            {
                "uuid": "2", "id": "200", "title": "creative writing", "instructor": "gordon, joyce",
                "dept": "crwr", "year": 2016, "avg": 98, "pass": 12, "fail": 0, "audit": 1
            }
        ])
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn app_with_sections(executor: QueryExecutor) -> Router {
        let app = create_test_app(executor);
        let (status, _) = send(
            &app,
            json_request("PUT", "/api/v1/dataset/sections/sections", &sections()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        app
    }

    #[tokio::test]
    async fn test_health_live() {
        let app = create_test_app(QueryExecutor::default());
        let (status, _) = send(&app, empty_request("GET", "/health/live")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let app = app_with_sections(QueryExecutor::default()).await;
        let (status, body) = send(&app, empty_request("GET", "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["datasets"], 1);
    }

    #[tokio::test]
    async fn test_add_and_list_datasets() {
        let app = create_test_app(QueryExecutor::default());

        let (status, body) = send(
            &app,
            json_request("PUT", "/api/v1/dataset/sections/sections", &sections()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": ["sections"]}));

        let (status, body) = send(
            &app,
            json_request("PUT", "/api/v1/dataset/more/sections", &sections()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": ["sections", "more"]}));

        let (status, body) = send(&app, empty_request("GET", "/api/v1/datasets")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["result"][0],
            json!({"id": "sections", "kind": "sections", "numRows": 2})
        );
    }

    #[tokio::test]
    async fn test_add_dataset_rejections() {
        let app = app_with_sections(QueryExecutor::default()).await;

        let cases = [
            ("/api/v1/dataset/sections/sections", sections(), "DATASET_EXISTS"),
            ("/api/v1/dataset/my_sections/sections", sections(), "INVALID_DATASET_ID"),
            ("/api/v1/dataset/other/courses", sections(), "VALIDATION_ERROR"),
            ("/api/v1/dataset/other/rooms", sections(), "INVALID_DATASET"),
            ("/api/v1/dataset/other/sections", json!([]), "INVALID_DATASET"),
            ("/api/v1/dataset/other/sections", json!({"a": 1}), "VALIDATION_ERROR"),
        ];

        for (uri, body, code) in cases {
            let (status, response) = send(&app, json_request("PUT", uri, &body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(response["error"]["code"], code, "{}", uri);
            assert!(response["request_id"].is_string());
        }
    }

    #[tokio::test]
    async fn test_remove_dataset() {
        let app = app_with_sections(QueryExecutor::default()).await;

        let (status, body) = send(&app, empty_request("DELETE", "/api/v1/dataset/rooms")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "DATASET_NOT_FOUND");

        let (status, _) = send(&app, empty_request("DELETE", "/api/v1/dataset/a_b")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, empty_request("DELETE", "/api/v1/dataset/sections")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": "sections"}));

        let (_, body) = send(&app, empty_request("GET", "/api/v1/datasets")).await;
        assert_eq!(body, json!({"result": []}));
    }

    #[tokio::test]
    async fn test_query() {
        let app = app_with_sections(QueryExecutor::default()).await;
        let query = json!({
            "WHERE": {"GT": {"sections_avg": 80}},
            "OPTIONS": {"COLUMNS": ["sections_dept", "sections_avg"], "ORDER": "sections_avg"}
        });

        let (status, body) = send(&app, json_request("POST", "/api/v1/query", &query)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"result": [{"sections_dept": "crwr", "sections_avg": 98.0}]})
        );
    }

    #[tokio::test]
    async fn test_query_invalid() {
        let app = app_with_sections(QueryExecutor::default()).await;
        let query = json!({
            "WHERE": {"IS": {"sections_instructor": "g*regor"}},
            "OPTIONS": {"COLUMNS": ["sections_instructor"]}
        });

        let (status, body) = send(&app, json_request("POST", "/api/v1/query", &query)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_QUERY");
    }

    #[tokio::test]
    async fn test_query_too_large() {
        let app = app_with_sections(QueryExecutor::new(1)).await;
        let query = json!({"WHERE": {}, "OPTIONS": {"COLUMNS": ["sections_uuid"]}});

        let (status, body) = send(&app, json_request("POST", "/api/v1/query", &query)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "RESULT_TOO_LARGE");
        assert!(body.get("result").is_none());
    }

    #[tokio::test]
    async fn test_query_malformed_json() {
        let app = create_test_app(QueryExecutor::default());
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/query")
            .header("Content-Type", "application/json")
            .body(Body::from("not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
