use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::migrations::{self, MigrationError};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to create database directory: {0}")]
    CreateDirError(#[from] std::io::Error),
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] r2d2::Error),
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    MigrationError(#[from] MigrationError),
}

/// Open (or create) the database at `db_path` and build the pool.
pub fn init_pool_at_path(db_path: &Path) -> Result<DbPool, DbError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // foreign_keys and busy_timeout are per-connection settings, so they
    // go through with_init and apply to every pooled connection
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });

    let pool = Pool::builder().max_size(10).build(manager)?;

    {
        let conn = pool.get()?;
        // WAL persists in the database file, one-time setup is enough
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        migrations::run_migrations(&conn)?;
    }

    log::info!("[db] pool ready at {}", db_path.display());

    Ok(pool)
}

/// Single-connection in-memory pool for tests.
#[cfg(test)]
pub fn init_test_pool() -> Result<DbPool, DbError> {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager)?;

    {
        let conn = pool.get()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::run_migrations(&conn)?;
    }

    Ok(pool)
}
