//! Pooled SQLite connections for the blog store.
//!
//! Handlers borrow a connection per request. Each connection is prepared the
//! same way before first use: the posts and `posts_tags` tables depend on
//! foreign keys being enforced, and concurrent writers (two requests creating
//! the same tag) wait on `busy_timeout` instead of failing immediately.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Path value that selects a private in-memory database.
const MEMORY_PATH: &str = ":memory:";

/// Connection tunables, read from the `[database]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a writer waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Upper bound on open connections for a file-backed store.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// Shared pool handed to the API layer and the migration binary.
pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Opens a pool over the blog database at `db_path`.
///
/// `:memory:` is accepted for tests. Every in-memory connection would be a
/// separate empty database, so that pool holds exactly one connection and
/// all borrowers see the same schema.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the first connection cannot be opened or
/// prepared.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| prepare_connection(conn, settings.busy_timeout_ms));

    let max_size = if db_path == MEMORY_PATH {
        1
    } else {
        settings.pool_max_size
    };

    tracing::debug!(path = db_path, max_size, "opening database pool");

    Ok(Pool::builder().max_size(max_size).build(manager)?)
}

fn prepare_connection(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    // In-memory databases stay in "memory" mode.
    let journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    if journal_mode != "wal" && journal_mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("blog store refused WAL journal mode: {journal_mode}")),
        ));
    }

    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = {busy_timeout_ms};"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pragma(conn: &Connection, name: &str) -> String {
        conn.query_row(&format!("PRAGMA {name};"), [], |row| {
            row.get::<_, rusqlite::types::Value>(0)
        })
        .map(|v| match v {
            rusqlite::types::Value::Integer(n) => n.to_string(),
            rusqlite::types::Value::Text(s) => s,
            other => format!("{other:?}"),
        })
        .expect("pragma should be readable")
    }

    #[test]
    fn file_pool_prepares_every_connection() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("quire.db");
        let settings = DbRuntimeSettings {
            busy_timeout_ms: 2_500,
            pool_max_size: 3,
        };

        let pool = create_pool(path.to_str().unwrap(), settings).expect("pool should open");
        assert_eq!(pool.max_size(), 3);

        let first = pool.get().expect("should get a connection");
        let second = pool.get().expect("should get a second connection");
        for conn in [&first, &second] {
            assert_eq!(pragma(conn, "journal_mode"), "wal");
            assert_eq!(pragma(conn, "foreign_keys"), "1");
            assert_eq!(pragma(conn, "busy_timeout"), "2500");
        }
    }

    #[test]
    fn memory_pool_shares_one_database() {
        let pool = create_pool(MEMORY_PATH, DbRuntimeSettings::default())
            .expect("pool should open");
        assert_eq!(pool.max_size(), 1);

        pool.get()
            .unwrap()
            .execute_batch("CREATE TABLE shared_marker (id INTEGER PRIMARY KEY);")
            .unwrap();

        let conn = pool.get().unwrap();
        assert_eq!(pragma(&conn, "foreign_keys"), "1");
        let seen: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'shared_marker'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(seen, 1);
    }
}
