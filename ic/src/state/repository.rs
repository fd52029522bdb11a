//! Persistence seam used by the session controller

use async_trait::async_trait;

use super::messages::StateResponse;
use crate::domain::Session;

/// Load/save of whole sessions by id
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Load a session; unknown ids yield an empty session
    async fn load(&self, id: &str) -> StateResponse<Session>;

    /// Upsert the full session state
    async fn save(&self, session: &Session) -> StateResponse<()>;
}
