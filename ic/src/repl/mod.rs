//! Interactive terminal front-end for one editing session

mod session;

pub use session::ReplSession;

use std::sync::Arc;

use eyre::{Context, Result};
use tracing::warn;

use crate::config::Config;
use crate::render::{ImageKitRenderer, Renderer};
use crate::server::build_translator;
use crate::session::{SessionController, SessionServices};
use crate::state::{SessionRepository, SessionStore};
use crate::upload::{ImageKitUploader, Uploader};

/// Run the interactive REPL
///
/// This is the main entry point for `ic chat`.
pub async fn run_interactive(config: &Config, session_id: Option<String>) -> Result<()> {
    config.validate()?;

    let sessions = SessionStore::spawn(&config.storage.db_dir, config.storage.max_connections)
        .context("Failed to open session store")?;
    let services = SessionServices {
        repository: Arc::new(sessions.clone()) as Arc<dyn SessionRepository>,
        translator: Arc::new(build_translator(config)?),
        renderer: Arc::new(ImageKitRenderer::new()) as Arc<dyn Renderer>,
        uploader: match ImageKitUploader::from_config(&config.imagekit) {
            Ok(uploader) => Some(Arc::new(uploader) as Arc<dyn Uploader>),
            Err(e) => {
                warn!(error = %e, "Uploads disabled");
                None
            }
        },
        url_endpoint: config.imagekit.url_endpoint.clone(),
        debounce: config.session.debounce(),
        max_undo_depth: config.session.max_undo_depth,
    };

    let session_id = session_id.unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
    let controller = SessionController::new(session_id, services);

    let result = ReplSession::new(controller).run().await;
    sessions.close().await;
    result
}
