//! Route handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use super::AppState;
use super::error::ApiError;
use crate::domain::Session;
use crate::state::SessionSummary;
use crate::upload::UploadCredentials;

/// Default and maximum page size for the sessions listing
const DEFAULT_SESSIONS_LIMIT: usize = 10;
const MAX_SESSIONS_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub params: Value,
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    debug!("chat: called");
    let message = match body {
        Ok(Json(request)) => request.message.unwrap_or_default(),
        Err(rejection) => {
            debug!(%rejection, "chat: unreadable body");
            String::new()
        }
    };
    if message.trim().is_empty() {
        return Err(ApiError::MissingMessage);
    }

    match state.translator.translate(&message).await {
        Ok(translation) => {
            if translation.is_empty() {
                info!("chat: nothing understood");
            }
            Ok(Json(ChatResponse {
                params: translation.params(),
            }))
        }
        Err(e) => {
            warn!(error = %e, details = ?e.details(), "chat: translation failed");
            Err(e.into())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub session_id: Option<String>,
}

/// GET /api/history?sessionId=
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Session>, ApiError> {
    let session_id = query
        .session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or(ApiError::MissingSessionId)?;
    debug!(%session_id, "get_history: called");

    state.sessions.load(&session_id).await.map(Json).map_err(|e| {
        error!(%session_id, error = %e, "History GET failed");
        ApiError::LoadFailed
    })
}

/// POST /api/history
pub async fn post_history(
    State(state): State<AppState>,
    body: Result<Json<Session>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(session) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    debug!(session_id = %session.session_id, "post_history: called");
    if session.session_id.trim().is_empty() {
        return Err(ApiError::MissingSessionId);
    }

    state.sessions.save(&session).await.map_err(|e| {
        error!(session_id = %session.session_id, error = %e, "History POST failed");
        ApiError::SaveFailed
    })?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/upload-auth
pub async fn upload_auth(State(state): State<AppState>) -> Result<Json<UploadCredentials>, ApiError> {
    debug!("upload_auth: called");
    let signer = state.signer.as_ref().ok_or(ApiError::UploadNotConfigured)?;
    signer.sign().map(Json).map_err(|e| {
        error!(error = %e, "upload_auth: signing failed");
        ApiError::SigningFailed
    })
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

/// GET /api/sessions?limit=
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<SessionsQuery>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_SESSIONS_LIMIT).clamp(1, MAX_SESSIONS_LIMIT);
    debug!(%limit, "list_sessions: called");
    let sessions = state.sessions.recent(limit).await.map_err(|e| {
        error!(error = %e, "list_sessions: failed");
        ApiError::ListFailed
    })?;
    Ok(Json(SessionsResponse { sessions }))
}

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
