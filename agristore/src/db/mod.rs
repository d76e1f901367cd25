//! SQLite storage: connection pool, schema and migrations
//!
//! Every repository function takes an explicit `&Connection`. Callers obtain
//! one from [`Database::connection`] (returned to the pool when the guard is
//! dropped) or run a closure through [`Database::with_connection`].

pub mod migrations;
pub mod models;
pub mod query;
pub mod repository;
pub mod schema;

pub use models::*;
pub use query::{Entity, Filter, Page, PageRequest};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::fs;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::Result;

/// Pool of SQLite connections
pub type DbPool = Pool<SqliteConnectionManager>;

/// A connection checked out of the pool
pub type DbConn = PooledConnection<SqliteConnectionManager>;

const IN_MEMORY_POOL_SIZE: u32 = 4;

pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) the database described by `config`
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let db_path = config.resolve_database_path()?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let wal_mode = config.wal_mode;
        let manager = SqliteConnectionManager::file(&db_path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            query::functions::register(conn)?;
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
            }
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build(manager)?;

        info!(path = %db_path.display(), pool_size = config.pool_size, "opened database");
        Self::initialize(pool)
    }

    /// Open a private in-memory database
    ///
    /// All pooled connections share one named in-memory database, which lives
    /// as long as the pool keeps at least one connection open.
    pub fn open_in_memory() -> Result<Self> {
        let uri = format!("file:agristore-{}?mode=memory&cache=shared", Uuid::new_v4());
        let manager = SqliteConnectionManager::file(uri)
            .with_init(|conn| {
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                query::functions::register(conn)
            });

        let pool = Pool::builder()
            .max_size(IN_MEMORY_POOL_SIZE)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;

        debug!("opened in-memory database");
        Self::initialize(pool)
    }

    fn initialize(pool: DbPool) -> Result<Self> {
        {
            let conn = pool.get()?;

            // Initialize schema (creates tables if they don't exist)
            schema::init_database(&conn)?;

            // Run migrations for schema updates
            migrations::run_migrations(&conn)?;
        }

        Ok(Self { pool })
    }

    /// Check a connection out of the pool
    ///
    /// The connection goes back to the pool when the returned guard drops.
    pub fn connection(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run `f` with a pooled connection
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connection()?;
        f(&conn)
    }

    /// Run `f` inside a transaction
    ///
    /// Commits when `f` returns `Ok`; any error rolls the transaction back and
    /// is returned unchanged.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Current pool statistics
    pub fn pool_state(&self) -> r2d2::State {
        self.pool.state()
    }
}

/// Create an in-memory database for testing
///
/// This creates a fully initialized database with schema and migrations
/// applied, useful for unit tests.
#[cfg(test)]
pub fn create_test_database() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn table_count(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'farms'",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_in_memory_database_is_initialized() {
        let db = create_test_database();
        let conn = db.connection().unwrap();
        assert_eq!(table_count(&conn), 1);
    }

    #[test]
    fn test_pooled_connections_share_data() {
        let db = create_test_database();
        {
            let conn = db.connection().unwrap();
            conn.execute(
                "INSERT INTO notifications (id, message, notification_type, timestamp, duplicate) \
                 VALUES ('n1', 'hello', 'INFO', '2024-01-01T00:00:00.000Z', 0)",
                [],
            )
            .unwrap();
        }

        let first = db.connection().unwrap();
        let second = db.connection().unwrap();
        let count: i64 = second
            .query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        drop(first);
    }

    #[test]
    fn test_separate_in_memory_databases_are_isolated() {
        let a = create_test_database();
        let b = create_test_database();
        a.with_connection(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, message, notification_type, timestamp, duplicate) \
                 VALUES ('n1', 'hello', 'INFO', '2024-01-01T00:00:00.000Z', 0)",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let count: i64 = b
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = create_test_database();
        let result: Result<()> = db.with_transaction(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, message, notification_type, timestamp, duplicate) \
                 VALUES ('n1', 'hello', 'INFO', '2024-01-01T00:00:00.000Z', 0)",
                [],
            )?;
            Err(StoreError::validation("abort"))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            database_path: Some(dir.path().join("nested").join("agri.db")),
            pool_size: 2,
            ..StoreConfig::default()
        };

        let db = Database::open(&config).unwrap();
        let conn = db.connection().unwrap();
        assert_eq!(table_count(&conn), 1);
        assert!(dir.path().join("nested").join("agri.db").exists());
    }

    #[test]
    fn test_reopening_file_database_keeps_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            database_path: Some(dir.path().join("agri.db")),
            pool_size: 1,
            ..StoreConfig::default()
        };

        drop(Database::open(&config).unwrap());
        let db = Database::open(&config).unwrap();
        let version: i32 = db
            .with_connection(|conn| {
                Ok(conn.query_row(
                    "SELECT MAX(version) FROM schema_migrations",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(version, migrations::CURRENT_VERSION);
    }
}
