//! Errors raised while compiling a query description or reshaping its result.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The description is structurally unusable (empty table, blank metric, ...).
    #[error("Invalid query description: {0}")]
    InvalidQueryDescription(String),

    /// The result table lacks a column the compiled query should have produced.
    #[error("Missing column in result: {0}")]
    MissingColumn(String),

    /// A time cell could not be read as epoch millis or an RFC 3339 instant.
    #[error("Invalid timestamp at row {row}: {value}")]
    InvalidTimestamp { row: usize, value: String },
}

pub type QueryResult<T> = Result<T, QueryError>;
