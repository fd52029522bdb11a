//! Session persistence
//!
//! A pool of actors over the SQLite session store, reached through a
//! cloneable `SessionStore` handle.

mod manager;
mod messages;
mod repository;

pub use manager::{SESSIONS_COLLECTION, SessionStore};
pub use messages::{SessionSummary, StateCommand, StateError, StateResponse};
pub use repository::SessionRepository;
