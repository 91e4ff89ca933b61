//! Ties the compiler, an executor and the transformer into panel queries,
//! editor suggestions and the connectivity check.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DatasourceConfig;
use crate::db::executor::{ExecutionError, SqlExecutor};
use crate::query::compiler;
use crate::query::error::QueryError;
use crate::query::model::QueryDescription;
use crate::transform::{self, RawTable, TimeSeries};

#[derive(Error, Debug)]
pub enum DatasourceError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Dashboard time window; both ends exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// One panel refresh: every target is compiled, executed and reshaped in turn.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub targets: Vec<QueryDescription>,
    #[serde(default)]
    pub range: Option<TimeRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
    pub title: String,
}

pub struct Datasource {
    executor: Arc<dyn SqlExecutor>,
    defaults: DatasourceConfig,
}

impl Datasource {
    pub fn new(executor: Arc<dyn SqlExecutor>, defaults: DatasourceConfig) -> Self {
        Self { executor, defaults }
    }

    /// Fills unset schema, time column, interval and time format from configuration, and
    /// bounds the target by `range` unless it carries its own bounds.
    pub fn prepare(&self, target: &QueryDescription, range: Option<&TimeRange>) -> QueryDescription {
        let mut prepared = target.clone();
        if prepared.schema.is_none() {
            prepared.schema = self.defaults.schema.clone();
        }
        if prepared.time_column.is_none() {
            prepared.time_column = Some(self.defaults.time_column.clone());
        }
        if prepared.group_interval.is_none() {
            prepared.group_interval = self.defaults.group_interval.clone();
        }
        if prepared.time_format.is_none() {
            prepared.time_format = self.defaults.time_format;
        }
        if let Some(range) = range {
            if !prepared.has_time_range() {
                prepared.time_from = Some(range.from.timestamp_millis());
                prepared.time_to = Some(range.to.timestamp_millis());
            }
        }
        prepared
    }

    /// SQL text for one target, as it would be sent to the store.
    pub fn compile(&self, target: &QueryDescription) -> Result<String, QueryError> {
        compiler::compile(&self.prepare(target, None))
    }

    pub async fn query(&self, request: &QueryRequest) -> Result<Vec<TimeSeries>, DatasourceError> {
        let mut series = Vec::new();

        for target in request.targets.iter().filter(|target| !target.hide) {
            let prepared = self.prepare(target, request.range.as_ref());
            let sql = compiler::compile(&prepared)?;
            debug!("Compiled target on '{}': {}", prepared.table, sql);

            let table = self.executor.execute(&sql).await?;
            let target_series = transform::transform(&prepared, &table)?;
            debug!(
                "Transformed {} rows into {} series",
                table.rows.len(),
                target_series.len()
            );
            series.extend(target_series);
        }

        info!(
            "Answered query with {} targets, {} series",
            request.targets.len(),
            series.len()
        );
        Ok(series)
    }

    /// Connectivity check: asks the store for its version.
    pub async fn test_datasource(&self) -> Result<HealthStatus, DatasourceError> {
        let table = self.executor.execute("SELECT version()").await?;
        let version = table
            .rows
            .first()
            .and_then(|row| row.first())
            .map(render_cell)
            .unwrap_or_else(|| "unknown".to_string());

        Ok(HealthStatus {
            status: "success".to_string(),
            message: format!("Database: DuckDB, version: {}", version),
            title: "Success".to_string(),
        })
    }

    pub async fn tables(&self) -> Result<Vec<String>, DatasourceError> {
        let table = self.executor.execute(&compiler::compile_table_list()).await?;
        Ok(flatten_suggestions(&table))
    }

    pub async fn columns(&self, table: &str) -> Result<Vec<String>, DatasourceError> {
        let sql = compiler::compile_column_list(table)?;
        let result = self.executor.execute(&sql).await?;
        Ok(flatten_suggestions(&result))
    }

    /// Sample values of `column`, for the where-clause value picker.
    ///
    /// `limit` caps the rows read, not the distinct values returned.
    pub async fn values(
        &self,
        table: &str,
        column: &str,
        limit: Option<usize>,
    ) -> Result<Vec<String>, DatasourceError> {
        let limit = limit.unwrap_or(self.defaults.values_limit);
        let sql = compiler::compile_distinct_values(table, column, Some(limit))?;
        let result = self.executor.execute(&sql).await?;
        Ok(flatten_suggestions(&result))
    }
}

/// Every non-null cell as text, first occurrence wins.
fn flatten_suggestions(table: &RawTable) -> Vec<String> {
    table
        .rows
        .iter()
        .flatten()
        .filter(|cell| !cell.is_null())
        .map(render_cell)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

fn render_cell(cell: &Value) -> String {
    match cell {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::aggregation::MetricAgg;
    use crate::query::model::{QueryMode, TimeFormat};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records statements and replays canned tables in order.
    struct ScriptedExecutor {
        statements: Mutex<Vec<String>>,
        responses: Mutex<Vec<RawTable>>,
    }

    impl ScriptedExecutor {
        fn new(responses: Vec<RawTable>) -> Arc<Self> {
            Arc::new(Self {
                statements: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into_iter().rev().collect()),
            })
        }

        fn statements(&self) -> Vec<String> {
            self.statements.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SqlExecutor for ScriptedExecutor {
        async fn execute(&self, sql: &str) -> Result<RawTable, ExecutionError> {
            self.statements.lock().unwrap().push(sql.to_string());
            Ok(self.responses.lock().unwrap().pop().unwrap_or_default())
        }
    }

    fn target(table: &str) -> QueryDescription {
        QueryDescription {
            table: table.into(),
            metric_aggs: vec![MetricAgg::new("avg", "value")],
            group_by_columns: vec!["host".into()],
            ..Default::default()
        }
    }

    fn defaults() -> DatasourceConfig {
        DatasourceConfig {
            schema: Some("doc".into()),
            time_column: "ts".into(),
            group_interval: Some("minute".into()),
            time_format: Some(TimeFormat::EpochMs),
            values_limit: 10,
        }
    }

    #[test]
    fn test_prepare_fills_defaults_and_range() {
        let datasource = Datasource::new(ScriptedExecutor::new(vec![]), defaults());
        let range = TimeRange {
            from: DateTime::from_timestamp_millis(1000).unwrap(),
            to: DateTime::from_timestamp_millis(2000).unwrap(),
        };

        let prepared = datasource.prepare(&target("metrics"), Some(&range));
        assert_eq!(prepared.schema.as_deref(), Some("doc"));
        assert_eq!(prepared.time_column(), "ts");
        assert_eq!(prepared.group_interval.as_deref(), Some("minute"));
        assert_eq!(prepared.time_format(), TimeFormat::EpochMs);
        assert_eq!((prepared.time_from, prepared.time_to), (Some(1000), Some(2000)));

        let own_bounds = QueryDescription {
            time_from: Some(5),
            schema: Some("other".into()),
            ..target("metrics")
        };
        let prepared = datasource.prepare(&own_bounds, Some(&range));
        assert_eq!(prepared.schema.as_deref(), Some("other"));
        assert_eq!((prepared.time_from, prepared.time_to), (Some(5), None));
    }

    #[tokio::test]
    async fn test_query_runs_visible_targets_in_order() {
        let executor = ScriptedExecutor::new(vec![
            RawTable::new(
                vec!["time".into(), "avg(value)".into(), "host".into()],
                vec![
                    vec![json!(1), json!(1.0), json!("a")],
                    vec![json!(2), json!(2.0), json!("b")],
                ],
            ),
            RawTable::new(
                vec!["ts".into(), "load".into()],
                vec![vec![json!(3), json!(0.5)]],
            ),
        ]);
        let datasource = Datasource::new(executor.clone(), DatasourceConfig::default());

        let request = QueryRequest {
            targets: vec![
                target("metrics"),
                QueryDescription {
                    hide: true,
                    ..target("hidden")
                },
                QueryDescription {
                    mode: QueryMode::Select,
                    select_columns: vec!["ts".into(), "load".into()],
                    time_column: Some("ts".into()),
                    metric_aggs: vec![],
                    group_by_columns: vec![],
                    ..target("system")
                },
            ],
            range: None,
        };

        let series = datasource.query(&request).await.unwrap();
        let targets: Vec<_> = series.iter().map(|s| s.target.as_str()).collect();
        assert_eq!(targets, vec!["a: avg(value)", "b: avg(value)", "load"]);

        let statements = executor.statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].ends_with("GROUP BY time, host ORDER BY time ASC"));
        assert_eq!(statements[1], "SELECT ts,load FROM system");
    }

    #[tokio::test]
    async fn test_query_stops_on_invalid_target() {
        let executor = ScriptedExecutor::new(vec![]);
        let datasource = Datasource::new(executor.clone(), DatasourceConfig::default());
        let request = QueryRequest {
            targets: vec![target("")],
            range: None,
        };

        let result = datasource.query(&request).await;
        assert!(matches!(
            result,
            Err(DatasourceError::Query(QueryError::InvalidQueryDescription(_)))
        ));
        assert!(executor.statements().is_empty());
    }

    #[tokio::test]
    async fn test_suggestions_are_flattened_and_deduplicated() {
        let executor = ScriptedExecutor::new(vec![RawTable::new(
            vec!["host".into()],
            vec![
                vec![json!("backend01")],
                vec![json!("backend02")],
                vec![Value::Null],
                vec![json!("backend01")],
            ],
        )]);
        let datasource = Datasource::new(executor.clone(), DatasourceConfig::default());

        let values = datasource.values("metrics", "host", None).await.unwrap();
        assert_eq!(values, vec!["backend01", "backend02"]);
        assert_eq!(executor.statements(), vec!["SELECT host FROM metrics LIMIT 10"]);
    }

    #[tokio::test]
    async fn test_datasource_health_reports_version() {
        let executor = ScriptedExecutor::new(vec![RawTable::new(
            vec!["version()".into()],
            vec![vec![json!("v1.1.1")]],
        )]);
        let datasource = Datasource::new(executor, DatasourceConfig::default());

        let health = datasource.test_datasource().await.unwrap();
        assert_eq!(health.status, "success");
        assert_eq!(health.message, "Database: DuckDB, version: v1.1.1");
    }
}
