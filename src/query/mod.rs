//! Insight Query Engine
//!
//! Validates JSON query documents and runs them over one in-memory dataset:
//!
//! - **AST**: Validated query plan types and the filter tree
//! - **Validator**: Turn query documents into plans
//! - **Aggregate**: Group keys and APPLY accumulators
//! - **Executor**: Execute plans against dataset records
//!
//! # Query Language
//!
//! ```text
//! {
//!   "WHERE": { "AND": [ {"GT": {"sections_avg": 90}}, {"IS": {"sections_dept": "cp*"}} ] },
//!   "OPTIONS": { "COLUMNS": ["sections_dept", "sections_avg"], "ORDER": "sections_avg" }
//! }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use insight::dataset::{Dataset, DatasetStore, Kind};
//! use insight::query::QueryExecutor;
//! use serde_json::json;
//!
//! let mut store = DatasetStore::new();
//! let rooms = json!([{
//!     "fullname": "Hugh Dempster Pavilion", "shortname": "DMP", "number": "110",
//!     "name": "DMP_110", "address": "6245 Agronomy Road V6T 1Z4", "type": "Tiered Large Group",
//!     "furniture": "Classroom-Fixed Tables/Movable Chairs", "href": "http://example.org/DMP-110",
//!     "lat": 49.26125, "lon": -123.24807, "seats": 120
//! }]);
//! store.add(Dataset::from_json("rooms", Kind::Rooms, rooms).unwrap()).unwrap();
//!
//! let query = json!({
//!     "WHERE": {"GT": {"rooms_seats": 100}},
//!     "OPTIONS": {"COLUMNS": ["rooms_name", "rooms_seats"]}
//! });
//! let output = QueryExecutor::default().execute_json(&query, &store).unwrap();
//! assert_eq!(output.rows.len(), 1);
//! ```

mod aggregate;
mod ast;
mod error;
mod executor;
mod validator;

pub use aggregate::{Accumulator, GroupKey, KeyPart, Total, AGGREGATE_SCALE};
pub use ast::{
    ApplyRule, ApplyToken, Column, ColumnSource, CompareOp, Direction, FilterNode, FilterTree,
    LogicOp, NodeId, OrderSpec, Pattern, QueryPlan, TransformSpec, WILDCARD,
};
pub use error::{QueryError, QueryResult};
pub use executor::{Cell, QueryExecutor, QueryOutput, ResultRow, DEFAULT_MAX_RESULT_ROWS};
pub use validator::QueryValidator;
