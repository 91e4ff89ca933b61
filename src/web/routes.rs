use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

// API Routes - the datasource surface used by the dashboard
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest(
            "/api",
            Router::new()
                // Query endpoints
                .route("/query", post(handlers::api::execute_query))
                .route("/compile", post(handlers::api::compile_query))

                // Editor suggestions
                .route("/tables", get(handlers::api::list_tables))
                .route("/tables/{table}/columns", get(handlers::api::list_columns))
                .route(
                    "/tables/{table}/columns/{column}/values",
                    get(handlers::api::list_values),
                )

                // Datasource health
                .route("/status", get(handlers::api::system_status))
        )
}
