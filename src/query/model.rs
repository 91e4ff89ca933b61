use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::query::aggregation::MetricAgg;

pub const DEFAULT_TIME_COLUMN: &str = "time";

/// Which statement style a description compiles to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// `SELECT <bucket> AS time, agg(col), group cols ... GROUP BY ...`
    #[default]
    Aggregate,
    /// `SELECT <columns> FROM <table> ...`
    Select,
    /// The `query` field, passed through verbatim.
    Sql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Asc,
    Desc,
}

impl OrderType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderType::Asc => "ASC",
            OrderType::Desc => "DESC",
        }
    }
}

/// How the time column stores instants. Range bounds are rendered to match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// Integer epoch milliseconds.
    #[default]
    EpochMs,
    /// A `TIMESTAMP` or `DATE` column.
    Timestamp,
}

/// Right-hand side of a where clause. Numbers render bare, text renders quoted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WhereValue {
    Number(Number),
    Text(String),
}

impl Default for WhereValue {
    fn default() -> Self {
        WhereValue::Text(String::new())
    }
}

impl From<i32> for WhereValue {
    fn from(value: i32) -> Self {
        WhereValue::Number(value.into())
    }
}

impl From<i64> for WhereValue {
    fn from(value: i64) -> Self {
        WhereValue::Number(value.into())
    }
}

impl From<&str> for WhereValue {
    fn from(value: &str) -> Self {
        WhereValue::Text(value.to_string())
    }
}

impl From<String> for WhereValue {
    fn from(value: String) -> Self {
        WhereValue::Text(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    /// `AND` / `OR`; empty for the first clause.
    #[serde(default)]
    pub condition: String,
    #[serde(alias = "key")]
    pub left: String,
    pub operator: String,
    #[serde(alias = "value", default)]
    pub right: WhereValue,
}

impl WhereClause {
    pub fn new(
        condition: impl Into<String>,
        left: impl Into<String>,
        operator: impl Into<String>,
        right: impl Into<WhereValue>,
    ) -> Self {
        Self {
            condition: condition.into(),
            left: left.into(),
            operator: operator.into(),
            right: right.into(),
        }
    }
}

/// A user-composed query: the shared input of the compiler and the transformer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryDescription {
    pub mode: QueryMode,
    pub query: Option<String>,
    pub schema: Option<String>,
    pub table: String,
    pub select_columns: Vec<String>,
    pub metric_aggs: Vec<MetricAgg>,
    pub group_by_columns: Vec<String>,
    pub where_clauses: Vec<WhereClause>,
    pub order_by: Option<String>,
    pub order_type: Option<OrderType>,
    pub time_column: Option<String>,
    pub group_interval: Option<String>,
    pub time_format: Option<TimeFormat>,
    /// Epoch millis, exclusive.
    pub time_from: Option<i64>,
    /// Epoch millis, exclusive.
    pub time_to: Option<i64>,
    pub alias_by: Option<String>,
    pub hide: bool,
}

impl QueryDescription {
    pub fn time_column(&self) -> &str {
        self.time_column.as_deref().unwrap_or(DEFAULT_TIME_COLUMN)
    }

    /// `schema.table` when a schema is set, the bare table otherwise.
    pub fn qualified_table(&self) -> String {
        match self.schema.as_deref() {
            Some(schema) if !schema.is_empty() => format!("{}.{}", schema, self.table),
            _ => self.table.clone(),
        }
    }

    /// The declared format, or `timestamp` when bucketing by interval since
    /// `date_trunc` only accepts temporal columns.
    pub fn time_format(&self) -> TimeFormat {
        match self.time_format {
            Some(format) => format,
            None if self.group_interval().is_some() => TimeFormat::Timestamp,
            None => TimeFormat::EpochMs,
        }
    }

    pub fn group_interval(&self) -> Option<&str> {
        self.group_interval.as_deref().filter(|interval| !interval.is_empty())
    }

    pub fn has_time_range(&self) -> bool {
        self.time_from.is_some() || self.time_to.is_some()
    }
}
