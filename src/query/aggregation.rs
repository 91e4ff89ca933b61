//! Aggregation expressions.
//!
//! The compiler selects `avg(value) AS "avg(value)"` and the transformer looks
//! the result column up by `avg(value)`; both go through [`MetricAgg`] so the
//! two sides always agree on the column name.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::query::error::{QueryError, QueryResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AggregationKind {
    Count,
    Avg,
    Sum,
    Min,
    Max,
    /// Any other store function, rendered as given (`stddev`, `percentile`, ...).
    Other(String),
}

impl AggregationKind {
    pub fn as_str(&self) -> &str {
        match self {
            AggregationKind::Count => "count",
            AggregationKind::Avg => "avg",
            AggregationKind::Sum => "sum",
            AggregationKind::Min => "min",
            AggregationKind::Max => "max",
            AggregationKind::Other(name) => name,
        }
    }
}

impl From<String> for AggregationKind {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "count" => AggregationKind::Count,
            "avg" => AggregationKind::Avg,
            "sum" => AggregationKind::Sum,
            "min" => AggregationKind::Min,
            "max" => AggregationKind::Max,
            _ => AggregationKind::Other(value),
        }
    }
}

impl From<&str> for AggregationKind {
    fn from(value: &str) -> Self {
        AggregationKind::from(value.to_string())
    }
}

impl From<AggregationKind> for String {
    fn from(value: AggregationKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested aggregation; produces one series per group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricAgg {
    #[serde(rename = "type")]
    pub kind: AggregationKind,
    pub column: String,
}

impl MetricAgg {
    pub fn new(kind: impl Into<AggregationKind>, column: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            column: column.into(),
        }
    }

    /// `avg(value)`. Doubles as the series label.
    pub fn expression(&self) -> String {
        format!("{}({})", self.kind, self.column)
    }

    /// `avg(value) AS "avg(value)"`, pinning the result column name.
    pub fn select_item(&self) -> String {
        let expression = self.expression();
        format!("{} AS \"{}\"", expression, expression.replace('"', "\"\""))
    }

    pub fn validate(&self) -> QueryResult<()> {
        if self.kind.as_str().trim().is_empty() {
            return Err(QueryError::InvalidQueryDescription(format!(
                "metric aggregation on '{}' has no type",
                self.column
            )));
        }
        if self.column.trim().is_empty() {
            return Err(QueryError::InvalidQueryDescription(format!(
                "metric aggregation '{}' has no column",
                self.kind
            )));
        }
        Ok(())
    }
}
