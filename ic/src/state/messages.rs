//! Session store messages
//!
//! Commands and responses for the actor pattern.

use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::Session;

/// Errors from session store operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("Session id is required")]
    MissingId,

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Channel error")]
    ChannelError,
}

impl From<sessionstore::StoreError> for StateError {
    fn from(e: sessionstore::StoreError) -> Self {
        match e {
            sessionstore::StoreError::CorruptBody { .. } => Self::DeserializationError(e.to_string()),
            other => Self::StoreError(other.to_string()),
        }
    }
}

/// Response from session store operations
pub type StateResponse<T> = Result<T, StateError>;

/// Listing entry for recently active sessions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub message_count: usize,
    pub transformation_count: usize,
    pub image_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Commands sent to a session store worker
#[derive(Debug)]
pub enum StateCommand {
    Load {
        id: String,
        reply: oneshot::Sender<StateResponse<Session>>,
    },
    Save {
        session: Box<Session>,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    Recent {
        limit: usize,
        reply: oneshot::Sender<StateResponse<Vec<SessionSummary>>>,
    },
    Shutdown,
}
