//! Renders query descriptions into SQL text.
//!
//! Rendering is plain string composition. Identifiers and literals are not
//! escaped beyond single-quoting non-numeric right-hand values; the caller owns
//! the trust decision for whatever the editor sends.

use crate::query::aggregation::MetricAgg;
use crate::query::error::{QueryError, QueryResult};
use crate::query::model::{QueryDescription, QueryMode, TimeFormat, WhereClause, WhereValue};

/// Lists relation names from the store's metadata schema.
pub fn compile_table_list() -> String {
    "SELECT table_name FROM information_schema.tables".to_string()
}

/// Lists the column names of `table` from the store's metadata schema.
pub fn compile_column_list(table: &str) -> QueryResult<String> {
    require_non_empty("table", table)?;
    Ok(format!(
        "SELECT column_name FROM information_schema.columns WHERE table_name='{}'",
        table
    ))
}

/// Selects `column` from `table`, capped at `limit` rows when a positive limit is given.
pub fn compile_distinct_values(table: &str, column: &str, limit: Option<usize>) -> QueryResult<String> {
    require_non_empty("table", table)?;
    require_non_empty("column", column)?;

    let mut sql = format!("SELECT {} FROM {}", column, table);
    if let Some(limit) = limit.filter(|l| *l > 0) {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    Ok(sql)
}

/// Compiles the statement style selected by `description.mode`.
pub fn compile(description: &QueryDescription) -> QueryResult<String> {
    match description.mode {
        QueryMode::Aggregate => compile_aggregate(description),
        QueryMode::Select => compile_select(description),
        QueryMode::Sql => compile_raw(description),
    }
}

/// `SELECT <columns> FROM <table> [WHERE ...] [ORDER BY ...]`
pub fn compile_select(description: &QueryDescription) -> QueryResult<String> {
    require_non_empty("table", &description.table)?;
    if description.select_columns.is_empty() {
        return Err(QueryError::InvalidQueryDescription(
            "select query needs at least one column".to_string(),
        ));
    }

    // 1. SELECT ... FROM
    let mut sql = format!(
        "SELECT {} FROM {}",
        description.select_columns.join(","),
        description.qualified_table()
    );

    // 2. WHERE + time range
    push_filters(&mut sql, description);

    // 3. ORDER BY
    if let Some(order_by) = description.order_by.as_deref().filter(|o| !o.is_empty()) {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
        if let Some(order_type) = description.order_type {
            sql.push(' ');
            sql.push_str(order_type.as_sql());
        }
    }

    Ok(sql)
}

/// `SELECT <bucket> AS time, agg(col) AS "agg(col)", <groups> FROM <table> [WHERE ...]
/// GROUP BY <bucket>, <groups> ORDER BY time ASC`
pub fn compile_aggregate(description: &QueryDescription) -> QueryResult<String> {
    require_non_empty("table", &description.table)?;
    if description.metric_aggs.is_empty() {
        return Err(QueryError::InvalidQueryDescription(
            "aggregate query needs at least one metric aggregation".to_string(),
        ));
    }
    for agg in &description.metric_aggs {
        agg.validate()?;
    }

    let bucket = time_bucket(description);

    // 1. SELECT list: time first, then metrics, then grouping columns
    let mut items = vec![format!("{} AS time", bucket)];
    items.extend(description.metric_aggs.iter().map(MetricAgg::select_item));
    items.extend(description.group_by_columns.iter().cloned());

    let mut sql = format!(
        "SELECT {} FROM {}",
        items.join(", "),
        description.qualified_table()
    );

    // 2. WHERE + time range
    push_filters(&mut sql, description);

    // 3. GROUP BY repeats the bucket expression rather than the `time` alias,
    // which some stores resolve to the raw input column.
    let mut groups = vec![bucket];
    groups.extend(description.group_by_columns.iter().cloned());
    sql.push_str(" GROUP BY ");
    sql.push_str(&groups.join(", "));

    // 4. ORDER BY
    sql.push_str(" ORDER BY time ASC");

    Ok(sql)
}

fn compile_raw(description: &QueryDescription) -> QueryResult<String> {
    match description.query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => Ok(query.to_string()),
        _ => Err(QueryError::InvalidQueryDescription(
            "sql query text is empty".to_string(),
        )),
    }
}

fn time_bucket(description: &QueryDescription) -> String {
    match description.group_interval() {
        Some(interval) => format!("date_trunc('{}', {})", interval, description.time_column()),
        None => description.time_column().to_string(),
    }
}

fn push_filters(sql: &mut String, description: &QueryDescription) {
    if !description.where_clauses.is_empty() {
        sql.push_str(" WHERE");
        sql.push_str(&render_where_clauses(&description.where_clauses));
    }

    if description.has_time_range() {
        sql.push_str(if description.where_clauses.is_empty() {
            " WHERE "
        } else {
            " AND "
        });
        sql.push_str(&render_time_range(description));
    }
}

fn render_where_clauses(clauses: &[WhereClause]) -> String {
    let mut rendered = String::new();
    for (index, clause) in clauses.iter().enumerate() {
        if index != 0 && !clause.condition.is_empty() {
            rendered.push(' ');
            rendered.push_str(&clause.condition);
        }
        rendered.push_str(&format!(
            " {} {} {}",
            clause.left,
            clause.operator,
            render_value(&clause.right)
        ));
    }
    rendered
}

fn render_value(value: &WhereValue) -> String {
    match value {
        WhereValue::Number(number) => number.to_string(),
        WhereValue::Text(text) => format!("'{}'", text),
    }
}

fn render_time_range(description: &QueryDescription) -> String {
    let column = description.time_column();
    let format = description.time_format();
    let mut bounds = Vec::with_capacity(2);
    if let Some(from) = description.time_from {
        bounds.push(format!("{} > {}", column, render_instant(format, from)));
    }
    if let Some(to) = description.time_to {
        bounds.push(format!("{} < {}", column, render_instant(format, to)));
    }
    bounds.join(" AND ")
}

fn render_instant(format: TimeFormat, millis: i64) -> String {
    match format {
        TimeFormat::EpochMs => millis.to_string(),
        TimeFormat::Timestamp => format!("epoch_ms({})", millis),
    }
}

fn require_non_empty(field: &str, value: &str) -> QueryResult<()> {
    if value.trim().is_empty() {
        return Err(QueryError::InvalidQueryDescription(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::aggregation::MetricAgg;
    use crate::query::model::OrderType;

    fn select_description() -> QueryDescription {
        QueryDescription {
            mode: QueryMode::Select,
            table: "t".into(),
            select_columns: vec!["a".into(), "b".into()],
            where_clauses: vec![WhereClause::new("", "x", "=", 5)],
            order_by: Some("time".into()),
            order_type: Some(OrderType::Desc),
            ..Default::default()
        }
    }

    fn aggregate_description() -> QueryDescription {
        QueryDescription {
            table: "metrics".into(),
            metric_aggs: vec![MetricAgg::new("avg", "value")],
            group_by_columns: vec!["host".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_compile_select_scenario() {
        let sql = compile_select(&select_description()).unwrap();
        assert_eq!(sql, "SELECT a,b FROM t WHERE x = 5 ORDER BY time DESC");
    }

    #[test]
    fn test_compile_select_is_deterministic() {
        let description = select_description();
        assert_eq!(
            compile_select(&description).unwrap(),
            compile_select(&description).unwrap()
        );
    }

    #[test]
    fn test_where_clauses_keep_order_and_conditions() {
        let description = QueryDescription {
            where_clauses: vec![
                WhereClause::new("", "host", "=", "backend01"),
                WhereClause::new("OR", "host", "=", "backend02"),
                WhereClause::new("AND", "load", ">", 2),
            ],
            order_by: None,
            ..select_description()
        };

        let sql = compile_select(&description).unwrap();
        assert_eq!(
            sql,
            "SELECT a,b FROM t WHERE host = 'backend01' OR host = 'backend02' AND load > 2"
        );
    }

    #[test]
    fn test_numeric_values_unquoted_text_quoted() {
        let description = QueryDescription {
            where_clauses: vec![
                WhereClause::new("", "ratio", "<", WhereValue::Number(
                    serde_json::Number::from_f64(0.5).unwrap(),
                )),
                WhereClause::new("AND", "code", "=", "5"),
                WhereClause::new("AND", "name", "like", ""),
            ],
            order_by: None,
            ..select_description()
        };

        let sql = compile_select(&description).unwrap();
        assert_eq!(
            sql,
            "SELECT a,b FROM t WHERE ratio < 0.5 AND code = '5' AND name like ''"
        );
    }

    #[test]
    fn test_time_range_without_where_clauses() {
        let description = QueryDescription {
            where_clauses: vec![],
            order_by: None,
            time_from: Some(1000),
            time_to: Some(2000),
            ..select_description()
        };

        let sql = compile_select(&description).unwrap();
        assert_eq!(sql, "SELECT a,b FROM t WHERE time > 1000 AND time < 2000");
    }

    #[test]
    fn test_time_range_after_where_clauses() {
        let description = QueryDescription {
            time_column: Some("ts".into()),
            time_from: Some(1000),
            ..select_description()
        };

        let sql = compile_select(&description).unwrap();
        assert_eq!(
            sql,
            "SELECT a,b FROM t WHERE x = 5 AND ts > 1000 ORDER BY time DESC"
        );
    }

    #[test]
    fn test_time_range_on_timestamp_column() {
        let description = QueryDescription {
            where_clauses: vec![],
            order_by: None,
            time_column: Some("ts".into()),
            time_format: Some(TimeFormat::Timestamp),
            time_from: Some(1466640000000),
            time_to: Some(1466650000000),
            ..select_description()
        };

        let sql = compile_select(&description).unwrap();
        assert_eq!(
            sql,
            "SELECT a,b FROM t WHERE ts > epoch_ms(1466640000000) AND ts < epoch_ms(1466650000000)"
        );

        let bucketed_epoch = QueryDescription {
            group_interval: Some("hour".into()),
            time_format: Some(TimeFormat::EpochMs),
            time_to: None,
            ..description
        };
        assert_eq!(
            compile_select(&bucketed_epoch).unwrap(),
            "SELECT a,b FROM t WHERE ts > 1466640000000"
        );
    }

    #[test]
    fn test_order_by_without_type() {
        let description = QueryDescription {
            where_clauses: vec![],
            order_type: None,
            ..select_description()
        };
        assert_eq!(
            compile_select(&description).unwrap(),
            "SELECT a,b FROM t ORDER BY time"
        );
    }

    #[test]
    fn test_compile_aggregate() {
        let sql = compile_aggregate(&aggregate_description()).unwrap();
        assert_eq!(
            sql,
            r#"SELECT time AS time, avg(value) AS "avg(value)", host FROM metrics GROUP BY time, host ORDER BY time ASC"#
        );
    }

    #[test]
    fn test_compile_aggregate_with_interval_schema_and_filters() {
        let description = QueryDescription {
            schema: Some("doc".into()),
            time_column: Some("ts".into()),
            group_interval: Some("minute".into()),
            metric_aggs: vec![MetricAgg::new("avg", "value"), MetricAgg::new("max", "value")],
            group_by_columns: vec!["host".into(), "metric".into()],
            where_clauses: vec![WhereClause::new("", "dc", "=", "eu")],
            time_from: Some(10),
            time_to: Some(20),
            ..aggregate_description()
        };

        let sql = compile_aggregate(&description).unwrap();
        assert_eq!(
            sql,
            "SELECT date_trunc('minute', ts) AS time, avg(value) AS \"avg(value)\", \
             max(value) AS \"max(value)\", host, metric FROM doc.metrics \
             WHERE dc = 'eu' AND ts > epoch_ms(10) AND ts < epoch_ms(20) \
             GROUP BY date_trunc('minute', ts), host, metric ORDER BY time ASC"
        );
    }

    #[test]
    fn test_compile_dispatches_on_mode() {
        let aggregate = aggregate_description();
        assert_eq!(compile(&aggregate), compile_aggregate(&aggregate));

        let select = select_description();
        assert_eq!(compile(&select), compile_select(&select));

        let raw = QueryDescription {
            mode: QueryMode::Sql,
            query: Some(" SELECT 1 ".into()),
            ..Default::default()
        };
        assert_eq!(compile(&raw).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_invalid_descriptions() {
        let no_table = QueryDescription {
            table: " ".into(),
            ..aggregate_description()
        };
        assert!(matches!(
            compile(&no_table),
            Err(QueryError::InvalidQueryDescription(_))
        ));

        let no_metrics = QueryDescription {
            metric_aggs: vec![],
            ..aggregate_description()
        };
        assert!(compile_aggregate(&no_metrics).is_err());

        let blank_metric = QueryDescription {
            metric_aggs: vec![MetricAgg::new("avg", "")],
            ..aggregate_description()
        };
        assert!(compile_aggregate(&blank_metric).is_err());

        let no_columns = QueryDescription {
            select_columns: vec![],
            ..select_description()
        };
        assert!(compile_select(&no_columns).is_err());

        let empty_sql = QueryDescription {
            mode: QueryMode::Sql,
            ..Default::default()
        };
        assert!(compile(&empty_sql).is_err());
    }

    #[test]
    fn test_metadata_queries() {
        assert_eq!(
            compile_table_list(),
            "SELECT table_name FROM information_schema.tables"
        );
        assert_eq!(
            compile_column_list("metrics").unwrap(),
            "SELECT column_name FROM information_schema.columns WHERE table_name='metrics'"
        );
        assert!(compile_column_list("").is_err());
    }

    #[test]
    fn test_distinct_values_limit() {
        assert_eq!(
            compile_distinct_values("metrics", "host", Some(10)).unwrap(),
            "SELECT host FROM metrics LIMIT 10"
        );
        assert_eq!(
            compile_distinct_values("metrics", "host", Some(0)).unwrap(),
            "SELECT host FROM metrics"
        );
        assert_eq!(
            compile_distinct_values("metrics", "host", None).unwrap(),
            "SELECT host FROM metrics"
        );
        assert!(compile_distinct_values("metrics", "", None).is_err());
    }
}
