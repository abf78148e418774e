//! Query Executor
//!
//! Executes a validated `QueryPlan` against one dataset:
//! 1. Binding the plan's dataset id to its records
//! 2. Filtering by the filter tree
//! 3. Projection, or grouping and aggregation
//! 4. Enforcing the result row cap
//! 5. Sorting by the ORDER keys
//!
//! # Execution Pipeline
//!
//! ```text
//! Plan → Bind → Filter → Project | (Group → Aggregate) → Cap → Sort → Rows
//! ```
//!
//! The executor holds no per-query state; every call builds its own groups.

use crate::dataset::{DatasetSource, Field, FieldValue, Record, SchemaRegistry};
use crate::query::aggregate::{Accumulator, GroupKey, KeyPart};
use crate::query::ast::*;
use crate::query::error::{QueryError, QueryResult};
use crate::query::validator::QueryValidator;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

/// Result rows allowed before a query fails as too large
pub const DEFAULT_MAX_RESULT_ROWS: usize = 5000;

/// A single output value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Strings compare lexicographically, numbers numerically
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

impl From<FieldValue<'_>> for Cell {
    fn from(value: FieldValue<'_>) -> Self {
        match value {
            FieldValue::Text(s) => Self::Text(s.to_string()),
            FieldValue::Number(n) => Self::Number(n),
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A single result row; serializes as a flat object in COLUMNS order
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ResultRow {
    cells: IndexMap<String, Cell>,
}

impl ResultRow {
    /// Get a value by column name
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn insert(&mut self, column: &str, cell: Cell) {
        self.cells.insert(column.to_string(), cell);
    }
}

/// Result of a query execution
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    /// Result rows
    pub rows: Vec<ResultRow>,
    /// Records in the bound dataset
    pub records_scanned: usize,
    /// Records accepted by the filter
    pub records_matched: usize,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryOutput {
    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Query executor
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    max_result_rows: usize,
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESULT_ROWS)
    }
}

impl QueryExecutor {
    /// Create an executor that rejects results over `max_result_rows`
    pub fn new(max_result_rows: usize) -> Self {
        Self { max_result_rows }
    }

    pub fn max_result_rows(&self) -> usize {
        self.max_result_rows
    }

    /// Execute a query string (validates and executes)
    pub fn execute_str<S>(&self, query: &str, store: &S) -> QueryResult<QueryOutput>
    where
        S: SchemaRegistry + DatasetSource,
    {
        let plan = QueryValidator::new(store).validate_str(query)?;
        self.execute(&plan, store)
    }

    /// Execute a query document (validates and executes)
    pub fn execute_json<S>(&self, query: &JsonValue, store: &S) -> QueryResult<QueryOutput>
    where
        S: SchemaRegistry + DatasetSource,
    {
        let plan = QueryValidator::new(store).validate(query)?;
        self.execute(&plan, store)
    }

    /// Execute a validated plan
    pub fn execute(&self, plan: &QueryPlan, source: &dyn DatasetSource) -> QueryResult<QueryOutput> {
        let start = Instant::now();

        // 1. Bind the dataset
        let records = source
            .records_of(&plan.dataset_id)
            .ok_or_else(|| QueryError::DatasetNotFound(plan.dataset_id.clone()))?;

        if let Some(kind) = records.first().map(Record::kind) {
            if kind != plan.kind {
                return Err(QueryError::Execution(format!(
                    "dataset '{}' holds {} records, query expects {}",
                    plan.dataset_id, kind, plan.kind
                )));
            }
        }

        // 2. Filter
        let matched: Vec<&Record> = match &plan.filter {
            Some(tree) => records
                .iter()
                .filter(|record| evaluate(tree, tree.root(), record))
                .collect(),
            None => records.iter().collect(),
        };

        // 3-5. Project or group, capped before any sorting
        let mut rows = if plan.transform.is_grouped() {
            self.group(plan, &matched)?
        } else {
            self.check_size(matched.len())?;
            project(plan, &matched)?
        };

        // 6. Sort
        if let Some(order) = &plan.order {
            sort_rows(&mut rows, order);
        }

        let execution_time_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            dataset_id = %plan.dataset_id,
            scanned = records.len(),
            matched = matched.len(),
            rows = rows.len(),
            execution_time_ms,
            "Executed query"
        );

        Ok(QueryOutput {
            rows,
            records_scanned: records.len(),
            records_matched: matched.len(),
            execution_time_ms,
        })
    }

    fn check_size(&self, rows: usize) -> QueryResult<()> {
        if rows > self.max_result_rows {
            tracing::warn!(
                rows,
                limit = self.max_result_rows,
                "Query result too large"
            );
            return Err(QueryError::ResultTooLarge {
                rows,
                limit: self.max_result_rows,
            });
        }
        Ok(())
    }

    /// Partition by the composite group key, then aggregate each group
    fn group(&self, plan: &QueryPlan, matched: &[&Record]) -> QueryResult<Vec<ResultRow>> {
        let mut groups: IndexMap<GroupKey, Vec<&Record>> = IndexMap::new();

        for record in matched {
            let key = plan
                .transform
                .group
                .iter()
                .map(|field| read(record, *field).map(KeyPart::from_value))
                .collect::<QueryResult<GroupKey>>()?;
            groups.entry(key).or_default().push(*record);
        }

        // One row per group
        self.check_size(groups.len())?;

        groups
            .values()
            .map(|members| aggregate_group(plan, members))
            .collect()
    }
}

/// Evaluate the subtree rooted at `id` for one record
fn evaluate(tree: &FilterTree, id: NodeId, record: &Record) -> bool {
    match tree.node(id) {
        FilterNode::Logic {
            op: LogicOp::And,
            children,
        } => children.iter().all(|child| evaluate(tree, *child, record)),
        FilterNode::Logic {
            op: LogicOp::Or,
            children,
        } => children.iter().any(|child| evaluate(tree, *child, record)),
        FilterNode::Not { child } => !evaluate(tree, *child, record),
        FilterNode::Compare { op, field, value } => record
            .get(*field)
            .and_then(|v| v.as_f64())
            .map(|n| op.compare_f64(n, *value))
            .unwrap_or(false),
        FilterNode::Match { field, pattern } => record
            .get(*field)
            .and_then(|v| v.as_str())
            .map(|s| pattern.matches(s))
            .unwrap_or(false),
    }
}

fn read(record: &Record, field: Field) -> QueryResult<FieldValue<'_>> {
    record.get(field).ok_or_else(|| {
        QueryError::Execution(format!("{} records have no field '{}'", record.kind(), field))
    })
}

/// Each accepted record becomes a row keyed by the qualified column names
fn project(plan: &QueryPlan, matched: &[&Record]) -> QueryResult<Vec<ResultRow>> {
    matched
        .iter()
        .map(|record| {
            let mut row = ResultRow::default();
            for column in &plan.columns {
                match &column.source {
                    ColumnSource::Field(field) => {
                        row.insert(&column.name, Cell::from(read(record, *field)?))
                    }
                    ColumnSource::Apply(name) => {
                        return Err(QueryError::Execution(format!(
                            "APPLY column '{}' without GROUP",
                            name
                        )))
                    }
                }
            }
            Ok(row)
        })
        .collect()
}

/// Group-key values from the first member plus one value per APPLY rule
fn aggregate_group(plan: &QueryPlan, members: &[&Record]) -> QueryResult<ResultRow> {
    let first = members
        .first()
        .ok_or_else(|| QueryError::Execution("empty group".into()))?;

    let mut applied: HashMap<&str, f64> = HashMap::with_capacity(plan.transform.apply.len());
    for rule in &plan.transform.apply {
        let mut acc = Accumulator::new(rule.token);
        for record in members {
            acc.add(read(record, rule.field)?)?;
        }
        applied.insert(rule.name.as_str(), acc.finish()?);
    }

    let mut row = ResultRow::default();
    for column in &plan.columns {
        let cell = match &column.source {
            ColumnSource::Field(field) => Cell::from(read(first, *field)?),
            ColumnSource::Apply(name) => {
                let value = applied.get(name.as_str()).ok_or_else(|| {
                    QueryError::Execution(format!("unknown APPLY column '{}'", name))
                })?;
                Cell::Number(*value)
            }
        };
        row.insert(&column.name, cell);
    }
    Ok(row)
}

/// Stable sort; ties fall through to later keys, the direction flips the whole comparison
fn sort_rows(rows: &mut [ResultRow], order: &OrderSpec) {
    rows.sort_by(|a, b| {
        let ordering = order
            .keys
            .iter()
            .map(|key| match (a.get(key), b.get(key)) {
                (Some(x), Some(y)) => x.compare(y),
                _ => Ordering::Equal,
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal);

        match order.direction {
            Direction::Up => ordering,
            Direction::Down => ordering.reverse(),
        }
    });
}
