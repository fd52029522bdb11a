//! HTTP error mapping

use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::translator::TranslateError;

/// Errors a handler can return, each with its status and JSON body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Message is required.")]
    MissingMessage,

    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    RateLimited { retry_after: Duration },

    #[error("AI model temporarily unavailable. Please try again.")]
    Unavailable,

    #[error("Failed to process request.")]
    TranslateFailed { details: String },

    #[error("sessionId is required")]
    MissingSessionId,

    #[error("Failed to load history")]
    LoadFailed,

    #[error("Failed to save history")]
    SaveFailed,

    #[error("Failed to list sessions")]
    ListFailed,

    #[error("ImageKit credentials not configured")]
    UploadNotConfigured,

    #[error("Failed to sign upload")]
    SigningFailed,

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingMessage | Self::MissingSessionId | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::TranslateFailed { .. }
            | Self::LoadFailed
            | Self::SaveFailed
            | Self::ListFailed
            | Self::UploadNotConfigured
            | Self::SigningFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Chat errors always carry an empty `params` so clients can apply blindly
    fn is_chat_error(&self) -> bool {
        matches!(
            self,
            Self::MissingMessage | Self::RateLimited { .. } | Self::Unavailable | Self::TranslateFailed { .. }
        )
    }
}

impl From<TranslateError> for ApiError {
    fn from(e: TranslateError) -> Self {
        match e {
            TranslateError::EmptyMessage => Self::MissingMessage,
            TranslateError::RateLimited { retry_after } => Self::RateLimited { retry_after },
            TranslateError::Unavailable(_) => Self::Unavailable,
            TranslateError::Failed(details) => Self::TranslateFailed { details },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({ "error": self.to_string() });

        if self.is_chat_error() {
            body["params"] = json!({});
        }
        if let Self::TranslateFailed { details } = &self {
            body["details"] = json!(details);
        }
        let retry_secs = match &self {
            Self::RateLimited { retry_after } => Some(retry_after.as_secs().max(1)),
            _ => None,
        };
        if let Some(secs) = retry_secs {
            body["retryAfter"] = json!(secs);
        }

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
