//! Reshapes a store result into one series per (group key, metric) pair.

use chrono::DateTime;
use indexmap::IndexMap;
use serde_json::Value;

use crate::query::error::{QueryError, QueryResult};
use crate::query::model::{QueryDescription, QueryMode};
use crate::transform::table::{Datapoint, RawTable, TimeSeries};

/// Name of the bucketed time column in aggregate results.
pub const AGGREGATE_TIME_COLUMN: &str = "time";

struct MetricColumn {
    label: String,
    index: usize,
}

/// Positions of the time, metric and grouping columns within a result.
struct ColumnLayout {
    time: usize,
    metrics: Vec<MetricColumn>,
    groups: Vec<usize>,
}

impl ColumnLayout {
    fn resolve(description: &QueryDescription, table: &RawTable) -> QueryResult<Self> {
        let time_name = match description.mode {
            QueryMode::Aggregate => AGGREGATE_TIME_COLUMN,
            QueryMode::Select | QueryMode::Sql => description.time_column(),
        };
        let time = require_column(table, time_name)?;

        let groups = description
            .group_by_columns
            .iter()
            .map(|name| require_column(table, name))
            .collect::<QueryResult<Vec<_>>>()?;

        let metrics = match description.mode {
            QueryMode::Aggregate => {
                if description.metric_aggs.is_empty() {
                    return Err(QueryError::InvalidQueryDescription(
                        "aggregate result needs at least one metric aggregation".to_string(),
                    ));
                }
                description
                    .metric_aggs
                    .iter()
                    .map(|agg| {
                        let label = agg.expression();
                        let index = require_column(table, &label)?;
                        Ok(MetricColumn { label, index })
                    })
                    .collect::<QueryResult<Vec<_>>>()?
            }
            QueryMode::Select | QueryMode::Sql if !description.metric_aggs.is_empty() => description
                .metric_aggs
                .iter()
                .map(|agg| {
                    let index = require_column(table, &agg.column)?;
                    Ok(MetricColumn {
                        label: agg.column.clone(),
                        index,
                    })
                })
                .collect::<QueryResult<Vec<_>>>()?,
            // Every remaining column is a value column.
            QueryMode::Select | QueryMode::Sql => table
                .cols
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != time && !groups.contains(index))
                .map(|(index, name)| MetricColumn {
                    label: name.clone(),
                    index,
                })
                .collect(),
        };

        Ok(Self {
            time,
            metrics,
            groups,
        })
    }
}

/// Turns `table` into series, grouped by the description's grouping columns.
///
/// Groups keep first-seen order and rows keep their input order within a
/// group; nothing is re-sorted. Series come out group by group, and within a
/// group in metric order, so a result with `k` distinct group keys and `m`
/// metric columns yields exactly `k * m` series.
pub fn transform(description: &QueryDescription, table: &RawTable) -> QueryResult<Vec<TimeSeries>> {
    if table.is_empty() {
        return Ok(Vec::new());
    }

    let layout = ColumnLayout::resolve(description, table)?;

    let timestamps = table
        .rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| parse_timestamp(cell(row, layout.time), row_index))
        .collect::<QueryResult<Vec<_>>>()?;

    let mut groups: IndexMap<Vec<String>, Vec<usize>> = IndexMap::new();
    for (row_index, row) in table.rows.iter().enumerate() {
        let key = layout
            .groups
            .iter()
            .map(|&index| key_part(cell(row, index)))
            .collect::<Vec<_>>();
        groups.entry(key).or_default().push(row_index);
    }

    let mut series = Vec::with_capacity(groups.len() * layout.metrics.len());
    for (key, members) in &groups {
        for metric in &layout.metrics {
            let target = if layout.groups.is_empty() {
                metric.label.clone()
            } else {
                format!("{}: {}", key.join(" "), metric.label)
            };

            let datapoints = members
                .iter()
                .map(|&row_index| {
                    Datapoint(
                        cell(&table.rows[row_index], metric.index).clone(),
                        timestamps[row_index],
                    )
                })
                .collect();

            series.push(TimeSeries { target, datapoints });
        }
    }

    Ok(series)
}

fn require_column(table: &RawTable, name: &str) -> QueryResult<usize> {
    table
        .column_index(name)
        .ok_or_else(|| QueryError::MissingColumn(name.to_string()))
}

static NULL: Value = Value::Null;

fn cell(row: &[Value], index: usize) -> &Value {
    row.get(index).unwrap_or(&NULL)
}

fn key_part(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_timestamp(value: &Value, row: usize) -> QueryResult<i64> {
    let parsed = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|millis| millis as i64)),
        Value::String(text) => text.parse::<i64>().ok().or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|instant| instant.timestamp_millis())
        }),
        _ => None,
    };

    parsed.ok_or_else(|| QueryError::InvalidTimestamp {
        row,
        value: value.to_string(),
    })
}
