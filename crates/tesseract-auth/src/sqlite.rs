//! SQLite-backed [`CredentialStore`].

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension, params};

use crate::{CredentialRecord, CredentialStore, StoreError};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS logins (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT    NOT NULL UNIQUE,
        hash     TEXT    NOT NULL,
        salt     TEXT    NOT NULL
    );
";

/// Credentials in an SQLite database, one row per user in `logins`.
///
/// The `UNIQUE` constraint on `username` plus `ON CONFLICT DO NOTHING`
/// makes `insert_if_absent` a single atomic statement. Queries run on the
/// blocking thread pool.
#[derive(Clone)]
pub struct SqliteCredentialStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCredentialStore {
    /// Opens (or creates) the database at `path` and ensures the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        tracing::info!("credential table ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))?;
            f(&conn).map_err(StoreError::from)
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

impl CredentialStore for SqliteCredentialStore {
    async fn find(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT username, salt, hash FROM logins WHERE username = ?1",
                params![username],
                |row| {
                    Ok(CredentialRecord {
                        username: row.get(0)?,
                        salt: row.get(1)?,
                        hash: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
    }

    async fn insert_if_absent(&self, record: CredentialRecord) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "INSERT INTO logins (username, salt, hash) VALUES (?1, ?2, ?3)
                 ON CONFLICT(username) DO NOTHING",
                params![record.username, record.salt, record.hash],
            )?;
            Ok(changed == 1)
        })
        .await
    }
}
