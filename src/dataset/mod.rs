//! Insight Datasets
//!
//! The two fixed dataset kinds and the in-memory store the query engine
//! reads from:
//!
//! - **schema**: Dataset kinds, their closed field sets, qualified field names
//! - **record**: Fixed-schema section and room records
//! - **store**: Datasets and the in-memory dataset store
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust
//! use insight::dataset::{Dataset, DatasetStore, Kind};
//!
//! let records = serde_json::json!([{
//!     "uuid": "1", "id": "310", "title": "sftwr eng", "instructor": "holmes, reid",
//!     "dept": "cpsc", "year": 2015, "avg": 78.5, "pass": 120, "fail": 3, "audit": 0
//! }]);
//!
//! let mut store = DatasetStore::new();
//! let ids = store.add(Dataset::from_json("sections", Kind::Sections, records).unwrap()).unwrap();
//! assert_eq!(ids, vec!["sections"]);
//! ```

pub mod error;
pub mod record;
pub mod schema;
pub mod store;

pub use error::{DatasetError, DatasetResult};
pub use record::{FieldValue, Record, Room, Section};
pub use schema::{
    Field, FieldType, Kind, QualifiedField, RoomField, SchemaRegistry, SectionField, SEPARATOR,
};
pub use store::{validate_id, Dataset, DatasetFile, DatasetInfo, DatasetSource, DatasetStore};
