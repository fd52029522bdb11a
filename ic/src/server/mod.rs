//! HTTP server
//!
//! JSON endpoints for translating chat messages, reading and writing session
//! history, and issuing upload credentials.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use eyre::{Context, Result};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

mod error;
mod handlers;

pub use error::ApiError;

use crate::config::Config;
use crate::llm;
use crate::prompts::PromptLoader;
use crate::state::SessionStore;
use crate::translator::Translator;
use crate::upload::UploadSigner;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<Translator>,
    pub sessions: SessionStore,
    pub signer: Option<UploadSigner>,
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/chat", post(handlers::chat))
        .route("/api/history", get(handlers::get_history).post(handlers::post_history))
        .route("/api/upload-auth", get(handlers::upload_auth))
        .route("/api/sessions", get(handlers::list_sessions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

/// Build the translator described by config
pub fn build_translator(config: &Config) -> Result<Translator> {
    let client = llm::create_client(&config.llm).context("Failed to create LLM client")?;
    let base = std::env::current_dir().context("Failed to read current directory")?;
    let prompt = PromptLoader::new(base).translate_prompt()?;
    Ok(Translator::new(client, prompt).with_settings(&config.llm, config.session.rate_limit_retry()))
}

/// Run the server until Ctrl-C
pub async fn serve(config: &Config) -> Result<()> {
    let translator = Arc::new(build_translator(config)?);
    let sessions = SessionStore::spawn(&config.storage.db_dir, config.storage.max_connections)
        .context("Failed to open session store")?;
    let signer = match UploadSigner::from_config(&config.imagekit) {
        Ok(signer) => Some(signer),
        Err(e) => {
            warn!(error = %e, "Upload credentials unavailable; /api/upload-auth will fail");
            None
        }
    };

    let app = create_router(AppState {
        translator,
        sessions: sessions.clone(),
        signer,
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .context(format!("Failed to bind {}", config.server.bind))?;
    info!("Starting server on {}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    sessions.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatMessage, Descriptor, Session};
    use crate::llm::LlmError;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{CompletionResponse, LlmClient};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    fn state(responses: Vec<Result<CompletionResponse, LlmError>>, signer: Option<UploadSigner>) -> AppState {
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new(responses));
        AppState {
            translator: Arc::new(Translator::new(llm, "system")),
            sessions: SessionStore::in_memory().unwrap(),
            signer,
        }
    }

    fn texts(texts: &[&str]) -> Vec<Result<CompletionResponse, LlmError>> {
        texts.iter().map(|t| Ok(CompletionResponse::text(*t))).collect()
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_chat_returns_params() {
        let app = create_router(state(texts(&[r#"{"aiRemoveBackground": true}"#]), None));
        let (status, body) = call(app, post_json("/api/chat", json!({"message": "Remove the background"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"params": {"aiRemoveBackground": true}}));
    }

    #[tokio::test]
    async fn test_chat_array_params() {
        let app = create_router(state(texts(&[r#"[{"aiRemoveBackground": true}, {"aiDropShadow": true}]"#]), None));
        let (status, body) = call(app, post_json("/api/chat", json!({"message": "cut out, then shadow"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["params"], json!([{"aiRemoveBackground": true}, {"aiDropShadow": true}]));
    }

    #[tokio::test]
    async fn test_chat_empty_message_is_400() {
        let app = create_router(state(vec![], None));
        let (status, body) = call(app.clone(), post_json("/api/chat", json!({"message": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message is required.");
        assert_eq!(body["params"], json!({}));

        let (status, _) = call(app, post_json("/api/chat", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_unparseable_output_is_empty_200() {
        let app = create_router(state(texts(&["I think you want a blur?"]), None));
        let (status, body) = call(app, post_json("/api/chat", json!({"message": "soften it"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"params": {}}));
    }

    #[tokio::test]
    async fn test_chat_rate_limit_is_429() {
        let app = create_router(state(
            vec![Err(LlmError::RateLimited {
                retry_after: Some(Duration::from_secs(20)),
            })],
            None,
        ));
        let (status, body) = call(app, post_json("/api/chat", json!({"message": "blur"}))).await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body,
            json!({
                "error": "Rate limit exceeded. Please wait a moment and try again.",
                "params": {},
                "retryAfter": 20
            })
        );
    }

    #[tokio::test]
    async fn test_chat_unavailable_is_503() {
        let app = create_router(state(
            vec![Err(LlmError::ModelUnavailable {
                status: 404,
                message: "not found".to_string(),
            })],
            None,
        ));
        let (status, body) = call(app, post_json("/api/chat", json!({"message": "blur"}))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["params"], json!({}));
    }

    #[tokio::test]
    async fn test_chat_other_failure_is_500_with_details() {
        let app = create_router(state(
            vec![Err(LlmError::ApiError {
                status: 400,
                message: "API key not valid".to_string(),
            })],
            None,
        ));
        let (status, body) = call(app, post_json("/api/chat", json!({"message": "blur"}))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to process request.");
        assert!(body["details"].as_str().unwrap().contains("API key not valid"));
        assert_eq!(body["params"], json!({}));
    }

    #[tokio::test]
    async fn test_history_round_trip() {
        let app = create_router(state(vec![], None));
        let step = Descriptor::from_value(json!({"focus": "face"})).unwrap();
        let session = Session {
            session_id: "abc".to_string(),
            messages: vec![ChatMessage::user("Crop to face")],
            transformations: vec![step.clone()],
            transformation_history: vec![vec![step]],
            transformation_floor: vec![],
            image_url: Some("https://ik.imagekit.io/demo/cat.jpg".to_string()),
        };

        let (status, body) = call(
            app.clone(),
            post_json("/api/history", serde_json::to_value(&session).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (status, body) = call(app, get("/api/history?sessionId=abc")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_value::<Session>(body).unwrap(), session);
    }

    #[tokio::test]
    async fn test_history_unknown_session_is_empty() {
        let app = create_router(state(vec![], None));
        let (status, body) = call(app, get("/api/history?sessionId=nobody")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionId"], "nobody");
        assert_eq!(body["messages"], json!([]));
        assert_eq!(body["transformations"], json!([]));
        assert_eq!(body["transformationHistory"], json!([]));
    }

    #[tokio::test]
    async fn test_history_missing_id_is_400() {
        let app = create_router(state(vec![], None));
        let (status, _) = call(app.clone(), get("/api/history")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(app, post_json("/api/history", json!({"messages": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "sessionId is required");
    }

    #[tokio::test]
    async fn test_history_backend_failure_is_500() {
        let state = state(vec![], None);
        state.sessions.close().await;
        let app = create_router(state);

        let (status, body) = call(app.clone(), get("/api/history?sessionId=abc")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to load history");

        let (status, _) = call(app, post_json("/api/history", json!({"sessionId": "abc"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_upload_auth() {
        let signer = UploadSigner::new("public_test", "private_test", Duration::from_secs(1800));
        let app = create_router(state(vec![], Some(signer)));
        let (status, body) = call(app, get("/api/upload-auth")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["publicKey"], "public_test");
        let token = body["token"].as_str().unwrap();
        let expire = body["expire"].as_i64().unwrap();
        let expected = crate::upload::signature("private_test", &format!("{token}{expire}")).unwrap();
        assert_eq!(body["signature"], expected.as_str());
    }

    #[tokio::test]
    async fn test_upload_auth_unconfigured_is_500() {
        let app = create_router(state(vec![], None));
        let (status, body) = call(app, get("/api/upload-auth")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "ImageKit credentials not configured");
    }

    #[tokio::test]
    async fn test_sessions_listing_and_health() {
        let state = state(vec![], None);
        state.sessions.save(&Session::empty("one")).await.unwrap();
        let app = create_router(state);

        let (status, body) = call(app.clone(), get("/api/sessions?limit=5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessions"][0]["sessionId"], "one");

        let (status, body) = call(app, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
