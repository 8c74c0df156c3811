// src/db.rs
use crate::kv::KeyValueStore;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database connection failed")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file")]
    Io(#[from] std::io::Error),
    #[error("Database query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Database update failed: {0}")]
    UpdateFailed(rusqlite::Error),
    #[error("Database delete failed: {0}")]
    DeleteFailed(rusqlite::Error),
}

const DB_FILE_NAME: &str = "ugym.sqlite";
const APP_DATA_DIR: &str = "ugym";
const DATA_ENV_VAR: &str = "UGYM_DATA_DIR";

/// Gets the path to the SQLite database file within the app's data directory.
/// Creates the directory if it doesn't exist.
pub fn get_db_path() -> Result<PathBuf, Error> {
    let app_dir = match std::env::var(DATA_ENV_VAR) {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => dirs::data_dir().ok_or(Error::DataDir)?.join(APP_DATA_DIR),
    };
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Opens a connection to the SQLite database.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, Error> {
    Connection::open(path).map_err(Error::Connection)
}

/// Initializes the key-value table if it doesn't exist.
pub fn init_db(conn: &Connection) -> Result<(), Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        )",
        [],
    )
    .map_err(Error::Connection)?;
    Ok(())
}

/// Key-value store backed by a single `kv` table.
/// Every `set` is one upsert statement, so a reader never sees half a value.
pub struct SqliteKvStore {
    conn: Connection,
}

impl SqliteKvStore {
    /// Wraps an open connection, creating the table if needed.
    pub fn new(conn: Connection) -> Result<Self, Error> {
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::new(open_db(path)?)
    }
}

impl KeyValueStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Error::QueryFailed)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        debug!(key, bytes = value.len(), "kv set");
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(Error::UpdateFailed)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        debug!(key, "kv remove");
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(Error::DeleteFailed)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Error> {
        debug!("kv clear");
        self.conn
            .execute("DELETE FROM kv", [])
            .map_err(Error::DeleteFailed)?;
        Ok(())
    }
}
