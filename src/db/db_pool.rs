use duckdb::Connection;
use r2d2::ManageConnection;
use std::sync::Mutex;

pub const IN_MEMORY: &str = ":memory:";

/// Hands out connections that all share one opened DuckDB database.
///
/// DuckDB refuses to open the same database file twice in one process, so the
/// manager opens it once and clones the root connection for every pool slot.
pub struct DuckDBConnectionManager {
    root: Mutex<Connection>,
}

impl DuckDBConnectionManager {
    pub fn new(connection_string: String) -> Result<Self, duckdb::Error> {
        let root = if connection_string == IN_MEMORY {
            Connection::open_in_memory()?
        } else {
            Connection::open(&connection_string)?
        };
        Ok(Self {
            root: Mutex::new(root),
        })
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let root = self.root.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        root.try_clone()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}
