use crate::config::AppConfig;
use crate::datasource::Datasource;
use crate::db::db_pool::DuckDBConnectionManager;
use crate::db::executor::DuckDbExecutor;
use r2d2::Pool;
use std::sync::Arc;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub datasource: Datasource,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, datasource: Datasource) -> Self {
        Self {
            config,
            datasource,
            startup_time: chrono::Utc::now(),
        }
    }

    /// State backed by a DuckDB pool, with datasource defaults taken from `config`.
    pub fn with_pool(config: AppConfig, db_pool: Pool<DuckDBConnectionManager>) -> Self {
        let executor = Arc::new(DuckDbExecutor::new(db_pool));
        let datasource = Datasource::new(executor, config.datasource.clone());
        Self::new(config, datasource)
    }

    pub fn uptime_seconds(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.startup_time)
            .num_seconds()
    }
}
