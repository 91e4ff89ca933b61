use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::datasource::QueryRequest;
use crate::query::model::QueryDescription;
use crate::transform::TimeSeries;
use crate::web::error::ApiResult;
use crate::web::state::AppState;

#[derive(Debug, Serialize)]
pub struct CompileResponse {
    pub sql: String,
}

#[derive(Debug, Deserialize)]
pub struct ValuesParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub status: String,
    pub message: String,
    pub title: String,
    pub version: String,
    pub uptime_seconds: i64,
}

// Panel query: targets in, series out
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> ApiResult<Json<Vec<TimeSeries>>> {
    let start_time = Instant::now();
    let series = state.datasource.query(&payload).await?;

    info!(
        "Query answered with {} series in {}ms",
        series.len(),
        start_time.elapsed().as_millis()
    );
    Ok(Json(series))
}

// Collapsed SQL preview for the editor
pub async fn compile_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryDescription>,
) -> ApiResult<Json<CompileResponse>> {
    let sql = state.datasource.compile(&payload)?;
    Ok(Json(CompileResponse { sql }))
}

// Suggestions
pub async fn list_tables(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.datasource.tables().await?))
}

pub async fn list_columns(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.datasource.columns(&table).await?))
}

pub async fn list_values(
    State(state): State<Arc<AppState>>,
    Path((table, column)): Path<(String, String)>,
    Query(params): Query<ValuesParams>,
) -> ApiResult<Json<Vec<String>>> {
    let values = state
        .datasource
        .values(&table, &column, params.limit)
        .await?;
    Ok(Json(values))
}

// System status
pub async fn system_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<SystemStatus>> {
    let health = state.datasource.test_datasource().await?;

    Ok(Json(SystemStatus {
        status: health.status,
        message: health.message,
        title: health.title,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    }))
}
