// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management.
//!
//! All access goes through tokio-rusqlite's single background thread, so
//! writes are serialized without extra locking.

use std::path::Path;

use portrait_core::PortraitError;
use tokio_rusqlite::Connection;
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS settings (
        key   TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    );
";

/// Converts errors from `Connection::call` into `PortraitError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> PortraitError {
    PortraitError::storage(e)
}

/// Converts errors from opening a connection into `PortraitError::Storage`.
pub fn map_sql_err(e: rusqlite::Error) -> PortraitError {
    PortraitError::storage(e)
}

/// Handle to the portrait SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PortraitError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(PortraitError::storage)?;
        }

        let conn = Connection::open(path).await.map_err(map_sql_err)?;
        let db = Self { conn };
        db.init("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .await?;
        debug!(path = %path.display(), "settings database opened");
        Ok(db)
    }

    /// Opens a private in-memory database.
    pub async fn open_in_memory() -> Result<Self, PortraitError> {
        let conn = Connection::open_in_memory().await.map_err(map_sql_err)?;
        let db = Self { conn };
        db.init("").await?;
        Ok(db)
    }

    async fn init(&self, pragmas: &'static str) -> Result<(), PortraitError> {
        self.conn
            .call(move |conn| {
                conn.execute_batch(pragmas)?;
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_file_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("portrait.db");
        let db = Database::open(&path).await.unwrap();
        assert!(path.exists());

        let mode: String = db
            .connection()
            .call(|conn| Ok(conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?))
            .await
            .map_err(map_tr_err)
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[tokio::test]
    async fn unopenable_path_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let err = match Database::open(dir.path()).await {
            Ok(_) => panic!("opening a directory must fail"),
            Err(e) => e,
        };
        assert!(matches!(err, PortraitError::Storage { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portrait.db");
        Database::open(&path).await.unwrap();
        Database::open(&path).await.unwrap();
    }
}
