//! Integration tests for imagechat
//!
//! These tests drive the public API end to end: controller, store, renderer
//! and HTTP router together.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use imagechat::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
use imagechat::render::{ImageKitRenderer, Renderer};
use imagechat::server::{AppState, create_router};
use imagechat::session::{GREETING, SessionController, SessionServices, TurnOutcome, UNDONE};
use imagechat::state::{SessionRepository, SessionStore};
use imagechat::translator::Translator;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

/// Replays canned model replies in order
struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedLlm {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        })
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .map(CompletionResponse::text)
            .ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string()))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

fn services(store: &SessionStore, replies: &[&str]) -> SessionServices {
    SessionServices {
        repository: Arc::new(store.clone()) as Arc<dyn SessionRepository>,
        translator: Arc::new(Translator::new(ScriptedLlm::new(replies), "system")),
        renderer: Arc::new(ImageKitRenderer::new()) as Arc<dyn Renderer>,
        uploader: None,
        url_endpoint: "https://ik.imagekit.io/demo".to_string(),
        debounce: Duration::from_millis(20),
        max_undo_depth: None,
    }
}

fn tr_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "tr")
        .map(|(_, v)| v.into_owned())
}

// =============================================================================
// Controller + store
// =============================================================================

#[tokio::test]
async fn test_edit_session_survives_restart() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    {
        let store = SessionStore::spawn(temp_dir.path(), 2).unwrap();
        let controller = SessionController::new(
            "s1",
            services(&store, &[r#"[{"aiRemoveBackground": true}, {"aiDropShadow": true}]"#, r#"{"grayscale": true}"#]),
        );
        let opened = controller.open().await.unwrap();
        assert_eq!(opened.messages[0].content, GREETING);

        controller.set_image_url("/cat.jpg").unwrap();
        let outcome = controller.send("cut it out and add a shadow").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Applied { added: 2, .. }));
        controller.send("make it black and white").await.unwrap();

        let url = controller.render_url().unwrap();
        assert_eq!(tr_of(&url).as_deref(), Some("e-bgremove:e-dropshadow:e-grayscale"));

        assert!(controller.undo().is_some());
        assert_eq!(tr_of(&controller.render_url().unwrap()).as_deref(), Some("e-bgremove:e-dropshadow"));

        controller.flush().await.unwrap();
        store.close().await;
    }

    let store = SessionStore::spawn(temp_dir.path(), 2).unwrap();
    let controller = SessionController::new("s1", services(&store, &[]));
    let session = controller.open().await.unwrap();

    assert_eq!(session.image_url.as_deref(), Some("https://ik.imagekit.io/demo/cat.jpg"));
    assert_eq!(session.transformations.len(), 2);
    assert_eq!(session.transformation_history.len(), 1);
    assert_eq!(session.messages.last().unwrap().content, UNDONE);
    assert!(controller.can_undo());
    store.close().await;
}

#[tokio::test]
async fn test_debounced_save_lands_without_flush() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = SessionStore::spawn(temp_dir.path(), 1).unwrap();
    let controller = SessionController::new("s2", services(&store, &[r#"{"focus": "face"}"#]));
    controller.open().await.unwrap();

    controller.send("crop to the face").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let stored = store.load("s2").await.unwrap();
    assert_eq!(stored.transformations.len(), 1);
    assert_eq!(stored.messages.len(), 3);
    store.close().await;
}

// =============================================================================
// HTTP router over a file-backed store
// =============================================================================

async fn call(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_router_history_is_shared_with_controllers() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = SessionStore::spawn(temp_dir.path(), 3).unwrap();

    let controller = SessionController::new("shared", services(&store, &[r#"{"width": 400}"#]));
    controller.open().await.unwrap();
    controller.set_image_url("https://example.com/dog.png").unwrap();
    controller.send("make it 400 wide").await.unwrap();
    controller.flush().await.unwrap();

    let app = create_router(AppState {
        translator: Arc::new(Translator::new(ScriptedLlm::new(&[r#"{"blur": 10}"#]), "system")),
        sessions: store.clone(),
        signer: None,
    });

    let (status, body) = call(
        app.clone(),
        Request::get("/api/history?sessionId=shared").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imageUrl"], "https://example.com/dog.png");
    assert_eq!(body["transformations"], json!([{"width": 400}]));

    let (status, body) = call(
        app.clone(),
        Request::post("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"message": "blur it"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["params"], json!({"blur": 10}));

    let (status, body) = call(app, Request::get("/api/sessions").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"][0]["sessionId"], "shared");
    assert_eq!(body["sessions"][0]["transformationCount"], 1);

    store.close().await;
}
