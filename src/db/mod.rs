pub mod db_pool;
pub mod executor;

pub use db_pool::DuckDBConnectionManager;
pub use executor::{DuckDbExecutor, ExecutionError, SqlExecutor};
