// SQLite database setup and migrations
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use super::storage::{get_db_path, StorageError};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type DbResult<T> = Result<T, DbError>;

// Thread-safe database connection wrapper
pub struct DbConnection {
    conn: Arc<Mutex<Connection>>,
}

impl DbConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// A panic mid-query leaves the connection usable; recover the guard
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for DbConnection {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// Initialize the database at the app data directory
pub fn init_db() -> DbResult<DbConnection> {
    open_db(&get_db_path()?)
}

/// Open (or create) a database file and bring it up to date
pub fn open_db(path: &Path) -> DbResult<DbConnection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    run_migrations(&conn)?;

    log::info!("Progress database ready at {}", path.display());
    Ok(DbConnection::new(conn))
}

/// In-memory database, used by tests and guest sessions
pub fn open_in_memory() -> DbResult<DbConnection> {
    let conn = Connection::open_in_memory()?;
    run_migrations(&conn)?;
    Ok(DbConnection::new(conn))
}

fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version < 1 {
        migration_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [1])?;
        log::debug!("Applied migration v1");
    }

    Ok(())
}

fn migration_v1(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS practice_attempts (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            letter TEXT NOT NULL,
            accepted INTEGER NOT NULL,
            resolution TEXT NOT NULL,
            feedback TEXT,
            point_count INTEGER NOT NULL,
            stroke_count INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_practice_attempts_letter
         ON practice_attempts(letter, created_at DESC)",
        [],
    )?;

    Ok(())
}
