//! # Insight
//!
//! Validated JSON queries over in-memory course section and campus room
//! datasets.
//!
//! ## Features
//!
//! - **Strict validation**: Query documents are checked against a closed
//!   grammar and the dataset's fixed schema before anything runs
//! - **Filtering**: AND / OR / NOT trees over numeric comparisons and
//!   wildcard string matches
//! - **Transformations**: GROUP by any fields, APPLY MAX / MIN / AVG / SUM / COUNT
//! - **Bounded results**: Oversized results fail instead of truncating
//!
//! ## Modules
//!
//! - [`dataset`]: Dataset kinds, records, and the in-memory store
//! - [`query`]: Query validator and executor
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust
//! use insight::{Dataset, DatasetStore, Kind, QueryExecutor};
//! use serde_json::json;
//!
//! let sections = json!([
//!     {"uuid": "1", "id": "310", "title": "sftwr eng", "instructor": "holmes, reid",
//!      "dept": "cpsc", "year": 2015, "avg": 78.5, "pass": 120, "fail": 3, "audit": 0},
//!     {"uuid": "2", "id": "110", "title": "comptn, progrmng", "instructor": "kiczales, gregor",
//!      "dept": "cpsc", "year": 2016, "avg": 81.25, "pass": 200, "fail": 10, "audit": 2}
//! ]);
//!
//! let mut store = DatasetStore::new();
//! store.add(Dataset::from_json("sections", Kind::Sections, sections).unwrap()).unwrap();
//!
//! let query = json!({
//!     "WHERE": {"IS": {"sections_dept": "cpsc"}},
//!     "OPTIONS": {"COLUMNS": ["sections_dept", "avgGrade"]},
//!     "TRANSFORMATIONS": {
//!         "GROUP": ["sections_dept"],
//!         "APPLY": [{"avgGrade": {"AVG": "sections_avg"}}]
//!     }
//! });
//!
//! let output = QueryExecutor::default().execute_json(&query, &store).unwrap();
//! assert_eq!(output.rows[0].get("avgGrade").and_then(|c| c.as_f64()), Some(79.88));
//! ```

pub mod api;
pub mod config;
pub mod dataset;
pub mod logging;
pub mod query;

// Re-export top-level types for convenience
pub use dataset::{
    Dataset, DatasetError, DatasetInfo, DatasetResult, DatasetStore, Field, Kind, Record,
};

pub use query::{
    Cell, QueryError, QueryExecutor, QueryOutput, QueryPlan, QueryResult, QueryValidator,
    ResultRow,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig, QueryConfig};
