//! SessionStore - pool of actors that own store connections
//!
//! Each worker owns one `sessionstore::Store` connection and processes
//! commands from its own channel. Commands for a given session id always go
//! to the same worker, so saves for one session apply in order.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sessionstore::Store;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use super::messages::{SessionSummary, StateCommand, StateError, StateResponse};
use super::repository::SessionRepository;
use crate::domain::Session;

/// Collection holding chat sessions
pub const SESSIONS_COLLECTION: &str = "chat_sessions";

/// Handle to send commands to the session store workers
#[derive(Clone)]
pub struct SessionStore {
    workers: Arc<Vec<mpsc::Sender<StateCommand>>>,
}

impl SessionStore {
    /// Spawn `connections` workers over the store in `dir`
    pub fn spawn(dir: impl AsRef<Path>, connections: usize) -> eyre::Result<Self> {
        let dir = dir.as_ref();
        let connections = connections.max(1);
        debug!(dir = %dir.display(), %connections, "SessionStore::spawn: called");

        let mut workers = Vec::with_capacity(connections);
        for index in 0..connections {
            let store = Store::open(dir)?;
            let (tx, rx) = mpsc::channel(256);
            tokio::spawn(actor_loop(index, store, rx));
            workers.push(tx);
        }

        info!(dir = %dir.display(), connections, "SessionStore spawned");
        Ok(Self {
            workers: Arc::new(workers),
        })
    }

    /// Spawn a single worker over a private in-memory store
    pub fn in_memory() -> eyre::Result<Self> {
        debug!("SessionStore::in_memory: called");
        let store = Store::open_in_memory()?;
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(0, store, rx));
        Ok(Self {
            workers: Arc::new(vec![tx]),
        })
    }

    fn worker_for(&self, id: &str) -> &mpsc::Sender<StateCommand> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        let index = (hasher.finish() % self.workers.len() as u64) as usize;
        &self.workers[index]
    }

    /// Load a session; an unknown id yields an empty session
    pub async fn load(&self, id: &str) -> StateResponse<Session> {
        debug!(%id, "load: called");
        if id.trim().is_empty() {
            return Err(StateError::MissingId);
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        self.worker_for(id)
            .send(StateCommand::Load {
                id: id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Upsert the full session state under its id
    pub async fn save(&self, session: &Session) -> StateResponse<()> {
        debug!(id = %session.session_id, "save: called");
        if session.session_id.trim().is_empty() {
            return Err(StateError::MissingId);
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        self.worker_for(&session.session_id)
            .send(StateCommand::Save {
                session: Box::new(session.clone()),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Most recently updated sessions first
    pub async fn recent(&self, limit: usize) -> StateResponse<Vec<SessionSummary>> {
        debug!(%limit, "recent: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.workers[0]
            .send(StateCommand::Recent { limit, reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Stop every worker; later calls fail with `ChannelError`
    pub async fn close(&self) {
        debug!("close: called");
        for tx in self.workers.iter() {
            let _ = tx.send(StateCommand::Shutdown).await;
        }
        info!("SessionStore closed");
    }
}

#[async_trait]
impl SessionRepository for SessionStore {
    async fn load(&self, id: &str) -> StateResponse<Session> {
        SessionStore::load(self, id).await
    }

    async fn save(&self, session: &Session) -> StateResponse<()> {
        SessionStore::save(self, session).await
    }
}

async fn actor_loop(index: usize, mut store: Store, mut rx: mpsc::Receiver<StateCommand>) {
    debug!(%index, "actor_loop: called");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::Load { id, reply } => {
                debug!(%index, %id, "actor_loop: Load command");
                let _ = reply.send(load_session(&store, &id));
            }

            StateCommand::Save { session, reply } => {
                debug!(%index, id = %session.session_id, "actor_loop: Save command");
                let result = save_session(&mut store, &session);
                if let Err(e) = &result {
                    error!(id = %session.session_id, error = %e, "Failed to save session");
                }
                let _ = reply.send(result);
            }

            StateCommand::Recent { limit, reply } => {
                debug!(%index, %limit, "actor_loop: Recent command");
                let _ = reply.send(recent_sessions(&store, limit));
            }

            StateCommand::Shutdown => {
                debug!(%index, "actor_loop: Shutdown command");
                break;
            }
        }
    }

    debug!(%index, "SessionStore worker stopped");
}

fn load_session(store: &Store, id: &str) -> StateResponse<Session> {
    let Some(doc) = store.get(SESSIONS_COLLECTION, id)? else {
        debug!(%id, "load_session: unknown id, returning empty session");
        return Ok(Session::empty(id));
    };

    let mut session: Session = serde_json::from_value(Value::Object(doc.body))
        .map_err(|e| StateError::DeserializationError(e.to_string()))?;
    session.session_id = id.to_string();
    Ok(session)
}

fn save_session(store: &mut Store, session: &Session) -> StateResponse<()> {
    let fields = match serde_json::to_value(session) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(StateError::StoreError("session did not serialize to an object".to_string())),
        Err(e) => return Err(StateError::StoreError(e.to_string())),
    };
    let outcome = store.upsert(SESSIONS_COLLECTION, &session.session_id, fields)?;
    debug!(id = %session.session_id, ?outcome, "save_session: written");
    Ok(())
}

fn recent_sessions(store: &Store, limit: usize) -> StateResponse<Vec<SessionSummary>> {
    let docs = store.recent(SESSIONS_COLLECTION, limit)?;
    Ok(docs
        .into_iter()
        .map(|doc| {
            let count = |field: &str| doc.body.get(field).and_then(Value::as_array).map_or(0, Vec::len);
            SessionSummary {
                session_id: doc.key.clone(),
                message_count: count("messages"),
                transformation_count: count("transformations"),
                image_url: doc.body.get("imageUrl").and_then(Value::as_str).map(str::to_string),
                created_at: doc.created_at,
                updated_at: doc.updated_at,
            }
        })
        .collect())
}
