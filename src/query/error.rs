//! Query error types
//!
//! Defines all error conditions that can occur during query validation and execution.
//! Callers branch on two kinds: the query failed validation, or its result
//! was too large. Messages are diagnostic only.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Query document violates the grammar or the dataset schema
    #[error("Invalid query: {0}")]
    Validation(String),

    /// Materialized result exceeded the row cap
    #[error("Result too large: {rows} rows exceeds the limit of {limit}")]
    ResultTooLarge { rows: usize, limit: usize },

    /// Plan references a dataset that is not available to the engine
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    /// Execution failed on a condition a validated plan should not reach
    #[error("Execution error: {0}")]
    Execution(String),
}

impl QueryError {
    /// Build a validation error from any message
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for every "bad query" failure, including an unknown dataset
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::DatasetNotFound(_))
    }

    pub fn is_result_too_large(&self) -> bool {
        matches!(self, Self::ResultTooLarge { .. })
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
