//! Query Plan types
//!
//! Defines the validated form of a query document: the filter tree, the
//! projected columns, the order directive, and the transformation spec.
//!
//! # Filter Tree
//!
//! The `WHERE` predicate is stored as a flat arena of nodes addressed by
//! `NodeId`. The root is at index 0 and every child index is greater than
//! its parent's, so the arena is always a tree with no dangling references.
//!
//! ```text
//! {"OR": [{"GT": {"sections_avg": 90}}, {"NOT": {"IS": {"sections_dept": "cpsc"}}}]}
//!
//! 0: Logic(Or, [1, 2])
//! 1: Compare(Gt, avg, 90)
//! 2: Not(3)
//! 3: Match(dept, Exact("cpsc"))
//! ```

use crate::dataset::{Field, Kind};
use serde::{Deserialize, Serialize};

/// Wildcard marker in `IS` patterns
pub const WILDCARD: char = '*';

/// Index of a node in a `FilterTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A validated predicate
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTree {
    nodes: Vec<FilterNode>,
}

impl FilterTree {
    /// Wrap nodes built in breadth-first order. Callers guarantee every child
    /// index points past its parent and inside the arena.
    pub(crate) fn from_nodes(nodes: Vec<FilterNode>) -> Self {
        debug_assert!(!nodes.is_empty());
        debug_assert!(nodes.iter().enumerate().all(|(i, node)| node
            .children()
            .iter()
            .all(|c| c.0 > i && c.0 < nodes.len())));
        Self { nodes }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &FilterNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// One node of the filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// AND / OR over a non-empty child list
    Logic { op: LogicOp, children: Vec<NodeId> },
    /// Negation of a single child
    Not { child: NodeId },
    /// Numeric comparison
    Compare {
        op: CompareOp,
        field: Field,
        value: f64,
    },
    /// String match with optional leading/trailing wildcard
    Match { field: Field, pattern: Pattern },
}

impl FilterNode {
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Logic { children, .. } => children.clone(),
            Self::Not { child } => vec![*child],
            Self::Compare { .. } | Self::Match { .. } => Vec::new(),
        }
    }
}

/// Logical connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogicOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// Numeric comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Strictly greater than
    Gt,
    /// Strictly less than
    Lt,
    /// Exact numeric equality
    Eq,
}

impl CompareOp {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GT" => Some(Self::Gt),
            "LT" => Some(Self::Lt),
            "EQ" => Some(Self::Eq),
            _ => None,
        }
    }

    /// Compare a record value `a` against the query constant `b`
    pub fn compare_f64(&self, a: f64, b: f64) -> bool {
        match self {
            Self::Gt => a > b,
            Self::Lt => a < b,
            Self::Eq => a == b,
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gt => write!(f, "GT"),
            Self::Lt => write!(f, "LT"),
            Self::Eq => write!(f, "EQ"),
        }
    }
}

/// A validated `IS` pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// `*` or `**`: matches anything
    Any,
    /// No wildcard
    Exact(String),
    /// `text*`
    Prefix(String),
    /// `*text`
    Suffix(String),
    /// `*text*`
    Contains(String),
}

impl Pattern {
    /// Parse a raw pattern. At most one wildcard at each end; a wildcard
    /// anywhere else is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let (leading, rest) = match raw.strip_prefix(WILDCARD) {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let (trailing, inner) = match rest.strip_suffix(WILDCARD) {
            Some(inner) => (true, inner),
            None => (false, rest),
        };

        if inner.contains(WILDCARD) {
            return None;
        }

        let inner = inner.to_string();
        Some(match (leading, trailing) {
            _ if inner.is_empty() && (leading || trailing) => Self::Any,
            (false, false) => Self::Exact(inner),
            (true, false) => Self::Suffix(inner),
            (false, true) => Self::Prefix(inner),
            (true, true) => Self::Contains(inner),
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(s) => value == s,
            Self::Prefix(s) => value.starts_with(s.as_str()),
            Self::Suffix(s) => value.ends_with(s.as_str()),
            Self::Contains(s) => value.contains(s.as_str()),
        }
    }
}

/// A projected output column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Output key: `datasetId_field` or a bare apply name
    pub name: String,
    pub source: ColumnSource,
}

/// Where a column's value comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnSource {
    /// A record field (or group key)
    Field(Field),
    /// An apply rule output, by name
    Apply(String),
}

/// Sort direction shared by all order keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Up,
    Down,
}

impl Direction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            _ => None,
        }
    }
}

/// Validated ORDER directive
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    /// Column names in priority order; later keys break ties
    pub keys: Vec<String>,
    pub direction: Direction,
}

/// Aggregation tokens for APPLY rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplyToken {
    Max,
    Min,
    Avg,
    Sum,
    Count,
}

impl ApplyToken {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MAX" => Some(Self::Max),
            "MIN" => Some(Self::Min),
            "AVG" => Some(Self::Avg),
            "SUM" => Some(Self::Sum),
            "COUNT" => Some(Self::Count),
            _ => None,
        }
    }

    /// COUNT accepts any field; the others need a numeric one
    pub fn accepts(&self, field: Field) -> bool {
        match self {
            Self::Count => true,
            Self::Max | Self::Min | Self::Avg | Self::Sum => field.is_numeric(),
        }
    }
}

impl std::fmt::Display for ApplyToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Max => write!(f, "MAX"),
            Self::Min => write!(f, "MIN"),
            Self::Avg => write!(f, "AVG"),
            Self::Sum => write!(f, "SUM"),
            Self::Count => write!(f, "COUNT"),
        }
    }
}

/// A named aggregation computed per group
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyRule {
    pub name: String,
    pub token: ApplyToken,
    pub field: Field,
}

/// GROUP + APPLY. Empty `group` means no transformation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformSpec {
    pub group: Vec<Field>,
    pub apply: Vec<ApplyRule>,
}

impl TransformSpec {
    pub fn is_grouped(&self) -> bool {
        !self.group.is_empty()
    }
}

/// A validated query ready for execution
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub dataset_id: String,
    pub kind: Kind,
    /// `None` matches every record
    pub filter: Option<FilterTree>,
    pub columns: Vec<Column>,
    pub order: Option<OrderSpec>,
    pub transform: TransformSpec,
}

impl QueryPlan {
    /// Output column names in COLUMNS order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
