//! SessionStore - keyed JSON document persistence
//!
//! Documents live in a single SQLite table, addressed by `(collection, key)`.
//! Writes are upserts: the first write for a key inserts the document and
//! stamps `created_at`, later writes merge their top-level fields into the
//! stored body and stamp `updated_at`.
//!
//! # Architecture
//!
//! ```text
//! <store dir>/
//! └── sessions.db      # WAL-mode SQLite database
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sessionstore::Store;
//!
//! let mut store = Store::open(".sessionstore")?;
//! store.upsert("chat_sessions", "abc", fields)?;
//! let doc = store.get("chat_sessions", "abc")?;
//! ```

pub mod cli;
mod error;
mod store;

pub use error::StoreError;
pub use store::{DB_FILE_NAME, Document, Store, UpsertOutcome};

/// Current wall-clock time in Unix milliseconds
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
