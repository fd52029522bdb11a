//! Core Store implementation

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::now_ms;

/// Database file name inside the store directory
pub const DB_FILE_NAME: &str = "sessions.db";

/// How long a connection waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A stored document and its bookkeeping timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document key (unique within its collection)
    pub key: String,
    /// Top-level fields, in insertion order
    pub body: Map<String, Value>,
    /// Creation timestamp (Unix ms), stamped once on insert
    pub created_at: i64,
    /// Last update timestamp (Unix ms), stamped on every write
    pub updated_at: i64,
}

/// Whether an upsert created the document or merged into an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// SQLite-backed document store
///
/// One `Store` owns one connection. Several stores may be opened on the same
/// directory; WAL mode lets readers proceed while a writer holds the lock.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create a store in the given directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        debug!(dir = %dir.display(), "open: called");
        fs::create_dir_all(dir)?;
        Self::open_file(dir.join(DB_FILE_NAME))
    }

    /// Open or create a store at an explicit database file path
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "open_file: called");
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(%mode, "open_file: journal mode set");

        let store = Self { conn, path: Some(path) };
        store.migrate()?;
        info!(path = ?store.path, "Opened session store");
        Ok(store)
    }

    /// Open a private in-memory store (tests and one-shot tooling)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("open_in_memory: called");
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.migrate()?;
        Ok(store)
    }

    /// Database file backing this store, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> Result<(), StoreError> {
        debug!("migrate: called");
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (collection, key)
            );
            CREATE INDEX IF NOT EXISTS idx_documents_updated
                ON documents(collection, updated_at DESC);
            "#,
        )?;
        Ok(())
    }

    /// Fetch a document by key
    pub fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        debug!(%collection, %key, "get: called");
        let row = self
            .conn
            .query_row(
                "SELECT body, created_at, updated_at FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)),
            )
            .optional()?;

        match row {
            Some((body, created_at, updated_at)) => {
                debug!(%key, "get: found");
                Ok(Some(Document {
                    key: key.to_string(),
                    body: parse_body(key, &body)?,
                    created_at,
                    updated_at,
                }))
            }
            None => {
                debug!(%key, "get: not found");
                Ok(None)
            }
        }
    }

    /// Insert a document, or merge `fields` into the existing one
    ///
    /// Merging replaces each given top-level field wholesale and leaves other
    /// fields untouched. `created_at` is only ever written on insert.
    pub fn upsert(
        &mut self,
        collection: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<UpsertOutcome, StoreError> {
        debug!(%collection, %key, field_count = fields.len(), "upsert: called");
        if key.is_empty() {
            return Err(StoreError::InvalidKey("key must not be empty".to_string()));
        }

        let now = now_ms();
        let tx = self.conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            Some(body) => {
                debug!(%key, "upsert: merging into existing document");
                let mut merged = parse_body(key, &body)?;
                for (field, value) in fields {
                    merged.insert(field, value);
                }
                tx.execute(
                    "UPDATE documents SET body = ?3, updated_at = ?4 WHERE collection = ?1 AND key = ?2",
                    params![collection, key, serde_json::to_string(&merged)?, now],
                )?;
                UpsertOutcome::Updated
            }
            None => {
                debug!(%key, "upsert: inserting new document");
                tx.execute(
                    "INSERT INTO documents (collection, key, body, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![collection, key, serde_json::to_string(&fields)?, now],
                )?;
                UpsertOutcome::Inserted
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    /// Most recently updated documents first
    pub fn recent(&self, collection: &str, limit: usize) -> Result<Vec<Document>, StoreError> {
        debug!(%collection, %limit, "recent: called");
        let mut stmt = self.conn.prepare(
            "SELECT key, body, created_at, updated_at FROM documents
             WHERE collection = ?1 ORDER BY updated_at DESC, key ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![collection, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let (key, body, created_at, updated_at) = row?;
            let body = parse_body(&key, &body)?;
            docs.push(Document {
                key,
                body,
                created_at,
                updated_at,
            });
        }
        Ok(docs)
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> Result<usize, StoreError> {
        debug!(%collection, "count: called");
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn parse_body(key: &str, body: &str) -> Result<Map<String, Value>, StoreError> {
    serde_json::from_str(body).map_err(|source| StoreError::CorruptBody {
        key: key.to_string(),
        source,
    })
}
