//! Runs SQL text against the store and collects the result as a [`RawTable`].

use async_trait::async_trait;
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection;
use r2d2::Pool;
use serde_json::Value;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::db::db_pool::DuckDBConnectionManager;
use crate::transform::RawTable;

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Query task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Anything that can run one SQL statement and hand back its rows.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<RawTable, ExecutionError>;
}

#[derive(Clone)]
pub struct DuckDbExecutor {
    pool: Pool<DuckDBConnectionManager>,
}

impl DuckDbExecutor {
    pub fn new(pool: Pool<DuckDBConnectionManager>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SqlExecutor for DuckDbExecutor {
    async fn execute(&self, sql: &str) -> Result<RawTable, ExecutionError> {
        let start_time = Instant::now();
        info!("Executing SQL query: {}", sql);

        // DuckDB calls block, keep them off the async workers
        let pool = self.pool.clone();
        let statement = sql.to_string();
        let result = tokio::task::spawn_blocking(move || -> Result<RawTable, ExecutionError> {
            let conn = pool.get()?;
            run_query(&conn, &statement)
        })
        .await?;

        match result {
            Ok(table) => {
                debug!(
                    "Query returned {} rows, columns {:?}, in {}ms",
                    table.rows.len(),
                    table.cols,
                    start_time.elapsed().as_millis()
                );
                Ok(table)
            }
            Err(e) => {
                error!("Failed to execute query: {}", e);
                Err(e)
            }
        }
    }
}

/// Executes `sql` on `conn`, converting every cell to JSON.
pub fn run_query(conn: &Connection, sql: &str) -> Result<RawTable, ExecutionError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;

    // Column names are only known once the statement has run.
    let cols = rows
        .as_ref()
        .map(|stmt| stmt.column_names())
        .unwrap_or_default();

    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(cols.len());
        for index in 0..cols.len() {
            values.push(to_json(row.get_ref(index)?));
        }
        collected.push(values);
    }

    Ok(RawTable::new(cols, collected))
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::from(i),
        ValueRef::SmallInt(i) => Value::from(i),
        ValueRef::Int(i) => Value::from(i),
        ValueRef::BigInt(i) => Value::from(i),
        ValueRef::HugeInt(i) => match i64::try_from(i) {
            Ok(small) => Value::from(small),
            Err(_) => Value::from(i as f64),
        },
        ValueRef::UTinyInt(i) => Value::from(i),
        ValueRef::USmallInt(i) => Value::from(i),
        ValueRef::UInt(i) => Value::from(i),
        ValueRef::UBigInt(i) => Value::from(i),
        ValueRef::Float(f) => Value::from(f64::from(f)),
        ValueRef::Double(f) => Value::from(f),
        ValueRef::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
        ValueRef::Timestamp(unit, raw) => Value::from(to_millis(unit, raw)),
        ValueRef::Date32(days) => Value::from(i64::from(days) * MILLIS_PER_DAY),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
        other => Value::String(format!("{:?}", other.to_owned())),
    }
}

fn to_millis(unit: TimeUnit, raw: i64) -> i64 {
    match unit {
        TimeUnit::Second => raw * 1000,
        TimeUnit::Millisecond => raw,
        TimeUnit::Microsecond => raw / 1000,
        TimeUnit::Nanosecond => raw / 1_000_000,
    }
}
