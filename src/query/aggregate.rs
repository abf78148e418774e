//! Group keys and APPLY accumulators
//!
//! SUM and AVG add up in `Decimal` so long runs of values like `71.07` do not
//! drift, then round to two places before converting back to `f64`.

use crate::dataset::FieldValue;
use crate::query::ast::ApplyToken;
use crate::query::error::{QueryError, QueryResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashSet;
use std::str::FromStr;

/// Decimal places kept by SUM and AVG
pub const AGGREGATE_SCALE: u32 = 2;

/// One hashable component of a group key or a COUNT value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Text(String),
    /// Bit pattern of the value, with -0.0 folded into 0.0
    Number(u64),
}

impl KeyPart {
    pub fn from_value(value: FieldValue<'_>) -> Self {
        match value {
            FieldValue::Text(s) => Self::Text(s.to_string()),
            FieldValue::Number(n) if n == 0.0 => Self::Number(0.0f64.to_bits()),
            FieldValue::Number(n) => Self::Number(n.to_bits()),
        }
    }
}

/// Composite group identity: one part per GROUP field, in GROUP order
pub type GroupKey = Vec<KeyPart>;

/// Running SUM/AVG total. Starts exact and drops to `f64` once a value or
/// the total leaves `Decimal`'s range.
#[derive(Debug, Clone, Copy)]
pub enum Total {
    Exact(Decimal),
    Float(f64),
}

impl Total {
    fn add(self, n: f64) -> Self {
        match self {
            Self::Exact(sum) => match to_decimal(n).and_then(|d| sum.checked_add(d)) {
                Some(total) => Self::Exact(total),
                None => Self::Float(sum.to_f64().unwrap_or(0.0) + n),
            },
            Self::Float(sum) => Self::Float(sum + n),
        }
    }

    fn mean(self, count: u64) -> Option<Self> {
        if count == 0 {
            return None;
        }
        Some(match self {
            Self::Exact(sum) => match sum.checked_div(Decimal::from(count)) {
                Some(avg) => Self::Exact(avg),
                None => Self::Float(sum.to_f64().unwrap_or(0.0) / count as f64),
            },
            Self::Float(sum) => Self::Float(sum / count as f64),
        })
    }

    fn rounded(self) -> f64 {
        match self {
            Self::Exact(value) => {
                let rounded = value
                    .round_dp_with_strategy(AGGREGATE_SCALE, RoundingStrategy::MidpointAwayFromZero);
                match rounded.to_f64() {
                    Some(n) => n,
                    None => round_f64(value.to_f64().unwrap_or(0.0)),
                }
            }
            Self::Float(value) => round_f64(value),
        }
    }
}

/// Running state of one APPLY rule over one group
#[derive(Debug, Clone)]
pub enum Accumulator {
    Max(Option<f64>),
    Min(Option<f64>),
    Avg { total: Total, count: u64 },
    Sum(Total),
    Count(HashSet<KeyPart>),
}

impl Accumulator {
    pub fn new(token: ApplyToken) -> Self {
        match token {
            ApplyToken::Max => Self::Max(None),
            ApplyToken::Min => Self::Min(None),
            ApplyToken::Avg => Self::Avg {
                total: Total::Exact(Decimal::ZERO),
                count: 0,
            },
            ApplyToken::Sum => Self::Sum(Total::Exact(Decimal::ZERO)),
            ApplyToken::Count => Self::Count(HashSet::new()),
        }
    }

    /// Fold one record's value into the accumulator
    pub fn add(&mut self, value: FieldValue<'_>) -> QueryResult<()> {
        match self {
            Self::Max(current) => {
                let n = numeric(value)?;
                *current = Some(current.map_or(n, |c| c.max(n)));
            }
            Self::Min(current) => {
                let n = numeric(value)?;
                *current = Some(current.map_or(n, |c| c.min(n)));
            }
            Self::Avg { total, count } => {
                *total = total.add(numeric(value)?);
                *count += 1;
            }
            Self::Sum(total) => {
                *total = total.add(numeric(value)?);
            }
            Self::Count(seen) => {
                seen.insert(KeyPart::from_value(value));
            }
        }
        Ok(())
    }

    /// Final value for the group
    pub fn finish(self) -> QueryResult<f64> {
        match self {
            Self::Max(value) | Self::Min(value) => {
                value.ok_or_else(|| QueryError::Execution("aggregate over empty group".into()))
            }
            Self::Avg { total, count } => total
                .mean(count)
                .map(Total::rounded)
                .ok_or_else(|| QueryError::Execution("average over empty group".into())),
            Self::Sum(total) => Ok(total.rounded()),
            Self::Count(seen) => Ok(seen.len() as f64),
        }
    }
}

fn numeric(value: FieldValue<'_>) -> QueryResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| QueryError::Execution("numeric aggregate over a string field".into()))
}

/// Convert through the shortest decimal representation of the float
fn to_decimal(n: f64) -> Option<Decimal> {
    Decimal::from_str(&n.to_string()).ok()
}

/// Past 2^52 an `f64` has no fractional digits left to round
fn round_f64(value: f64) -> f64 {
    if value.abs() >= 4_503_599_627_370_496.0 {
        value
    } else {
        (value * 100.0).round() / 100.0
    }
}
