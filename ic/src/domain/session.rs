//! Session aggregate and chat transcript types

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::descriptor::Descriptor;

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Everything persisted for one editing conversation
///
/// Field names match the persisted document and the history API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Session {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub transformations: Vec<Descriptor>,
    pub transformation_history: Vec<Vec<Descriptor>>,
    /// State under the oldest undo snapshot once a depth cap evicted older ones
    pub transformation_floor: Vec<Descriptor>,
    pub image_url: Option<String>,
}

impl Session {
    /// The well-defined state of a session nobody has saved yet
    pub fn empty(session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        debug!(%session_id, "Session::empty: called");
        Self {
            session_id,
            ..Default::default()
        }
    }

    /// True when nothing but the id is set
    pub fn is_blank(&self) -> bool {
        self.messages.is_empty()
            && self.transformations.is_empty()
            && self.transformation_history.is_empty()
            && self.transformation_floor.is_empty()
            && self.image_url.is_none()
    }
}
