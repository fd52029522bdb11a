//! Session controller
//!
//! Drives one editing conversation: the transcript, the sequencer and the
//! active image, with debounced persistence through a `SessionRepository`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::debounce::Debouncer;
use super::guard::InFlight;
use crate::domain::{ChatMessage, Descriptor, ImageReference, Sequencer, Session, mime_for};
use crate::render::Renderer;
use crate::state::{SessionRepository, StateError};
use crate::translator::{TranslateError, Translator};
use crate::upload::Uploader;

pub const GREETING: &str =
    "I'm ready. List out your requirements. (e.g., 'Crop to face, remove background, and increase contrast').";
pub const NOT_UNDERSTOOD: &str =
    "I couldn't understand that request. Try something like 'Remove background' or 'Crop to face'.";
pub const UNDONE: &str = "Undid last transformation.";
pub const CLEARED: &str = "Session cleared. Upload a new image to start editing.";
pub const UPLOADED: &str = "Image uploaded successfully! You can now describe the edits you want.";
pub const UPLOAD_FAILED: &str =
    "Upload failed. The preview shows your local image, but live transformations won't be available.";

/// Errors from controller operations
#[derive(Debug, Error, PartialEq)]
pub enum ControllerError {
    #[error("Message is required.")]
    EmptyMessage,

    #[error("A {0} is already in progress")]
    Busy(&'static str),

    #[error("An image is already active; start a new session to change it")]
    ImageActive,

    #[error("Image reference is empty")]
    InvalidImage,

    #[error("Failed to load session: {0}")]
    Load(StateError),

    #[error("Failed to save session: {0}")]
    Save(StateError),
}

/// What one chat turn did
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Descriptors were appended
    Applied { reply: String, added: usize },
    /// The translator understood nothing (or produced unusable output)
    NotUnderstood { reply: String },
    /// The translator call failed; nothing changed
    Failed { reply: String, error: TranslateError },
}

impl TurnOutcome {
    /// The assistant message appended for this turn
    pub fn reply(&self) -> &str {
        match self {
            Self::Applied { reply, .. } | Self::NotUnderstood { reply } | Self::Failed { reply, .. } => reply,
        }
    }
}

/// Result of an upload attempt
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Stored on the CDN; transformations apply
    Uploaded(ImageReference),
    /// Only the local preview is available
    PreviewOnly,
    /// The image was replaced or cleared before the upload finished
    Superseded,
}

/// Collaborators shared by every controller
#[derive(Clone)]
pub struct SessionServices {
    pub repository: Arc<dyn SessionRepository>,
    pub translator: Arc<Translator>,
    pub renderer: Arc<dyn Renderer>,
    pub uploader: Option<Arc<dyn Uploader>>,
    pub url_endpoint: String,
    pub debounce: Duration,
    pub max_undo_depth: Option<usize>,
}

#[derive(Debug, Default)]
struct ControllerState {
    messages: Vec<ChatMessage>,
    sequencer: Sequencer,
    image: Option<ImageReference>,
}

impl ControllerState {
    /// A new image never inherits transformations
    fn install_image(&mut self, image: ImageReference) {
        self.sequencer.reset();
        self.image = Some(image);
    }
}

/// One logical actor per session
pub struct SessionController {
    session_id: String,
    services: SessionServices,
    state: Mutex<ControllerState>,
    debouncer: Debouncer,
    translating: InFlight,
    uploading: InFlight,
    loaded: AtomicBool,
}

impl SessionController {
    pub fn new(session_id: impl Into<String>, services: SessionServices) -> Arc<Self> {
        let session_id = session_id.into();
        debug!(%session_id, "SessionController::new: called");
        Arc::new(Self {
            state: Mutex::new(ControllerState {
                sequencer: Sequencer::new(services.max_undo_depth),
                ..Default::default()
            }),
            debouncer: Debouncer::new(services.debounce),
            translating: InFlight::new("translation"),
            uploading: InFlight::new("upload"),
            loaded: AtomicBool::new(false),
            session_id,
            services,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load persisted state and enable saving
    ///
    /// A fresh session starts with the greeting. On failure saving stays
    /// disabled so the stored session is never overwritten by a blank one.
    pub async fn open(&self) -> Result<Session, ControllerError> {
        debug!(session_id = %self.session_id, "open: called");
        let stored = self
            .services
            .repository
            .load(&self.session_id)
            .await
            .map_err(ControllerError::Load)?;

        {
            let mut state = self.state();
            state.messages = if stored.messages.is_empty() {
                vec![ChatMessage::assistant(GREETING)]
            } else {
                stored.messages
            };
            state
                .sequencer
                .restore(stored.transformations, stored.transformation_history, stored.transformation_floor);
            state.image = stored
                .image_url
                .as_deref()
                .and_then(|raw| ImageReference::parse(raw, &self.services.url_endpoint));
        }

        self.loaded.store(true, Ordering::Release);
        info!(session_id = %self.session_id, "Session opened");
        Ok(self.snapshot())
    }

    /// Persistable view of the current state
    pub fn snapshot(&self) -> Session {
        let state = self.state();
        Session {
            session_id: self.session_id.clone(),
            messages: state.messages.clone(),
            transformations: state.sequencer.current().to_vec(),
            transformation_history: state.sequencer.history().to_vec(),
            transformation_floor: state.sequencer.floor().to_vec(),
            // Local previews are display-only and never persisted
            image_url: state
                .image
                .as_ref()
                .filter(|i| !matches!(i, ImageReference::LocalPreview(_)))
                .map(ImageReference::to_stored),
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().messages.clone()
    }

    pub fn transformations(&self) -> Vec<Descriptor> {
        self.state().sequencer.current().to_vec()
    }

    pub fn image(&self) -> Option<ImageReference> {
        self.state().image.clone()
    }

    pub fn can_undo(&self) -> bool {
        self.state().sequencer.can_undo()
    }

    /// The displayable URL for the image with every transformation applied
    pub fn render_url(&self) -> Option<String> {
        let state = self.state();
        let image = state.image.as_ref()?;
        Some(self.services.renderer.render(image, state.sequencer.current()))
    }

    /// Handle one user chat message
    pub async fn send(&self, text: &str) -> Result<TurnOutcome, ControllerError> {
        let text = text.trim();
        debug!(session_id = %self.session_id, text_len = text.len(), "send: called");
        if text.is_empty() {
            return Err(ControllerError::EmptyMessage);
        }
        let _guard = self
            .translating
            .try_acquire()
            .ok_or(ControllerError::Busy("translation"))?;

        self.state().messages.push(ChatMessage::user(text));
        self.schedule_save();

        let outcome = match self.services.translator.translate(text).await {
            Ok(translation) if translation.is_empty() => TurnOutcome::NotUnderstood {
                reply: NOT_UNDERSTOOD.to_string(),
            },
            Ok(translation) => {
                let params = translation.params();
                let added = {
                    let mut state = self.state();
                    let before = state.sequencer.current().len();
                    state.sequencer.append(translation.group).map_or(0, |seq| seq.len() - before)
                };
                if added == 0 {
                    TurnOutcome::NotUnderstood {
                        reply: NOT_UNDERSTOOD.to_string(),
                    }
                } else {
                    TurnOutcome::Applied {
                        reply: format!("Applied: {params}"),
                        added,
                    }
                }
            }
            Err(error) => {
                warn!(session_id = %self.session_id, %error, "send: translation failed");
                TurnOutcome::Failed {
                    reply: failure_reply(&error),
                    error,
                }
            }
        };

        self.state().messages.push(ChatMessage::assistant(outcome.reply()));
        self.schedule_save();
        Ok(outcome)
    }

    /// Revert the last applied turn; `None` when there is nothing to undo
    pub fn undo(&self) -> Option<Vec<Descriptor>> {
        debug!(session_id = %self.session_id, "undo: called");
        let restored = {
            let mut state = self.state();
            let restored = state.sequencer.undo()?.to_vec();
            state.messages.push(ChatMessage::assistant(UNDONE));
            restored
        };
        self.schedule_save();
        Some(restored)
    }

    /// Drop the image, transformations and transcript to start over
    pub fn clear(&self) {
        debug!(session_id = %self.session_id, "clear: called");
        {
            let mut state = self.state();
            state.image = None;
            state.sequencer.reset();
            state.messages = vec![ChatMessage::assistant(CLEARED)];
        }
        self.schedule_save();
    }

    /// Point the session at an already-hosted image
    pub fn set_image_url(&self, raw: &str) -> Result<ImageReference, ControllerError> {
        debug!(session_id = %self.session_id, "set_image_url: called");
        let image = ImageReference::parse(raw, &self.services.url_endpoint).ok_or(ControllerError::InvalidImage)?;
        self.replace_image(image.clone());
        self.schedule_save();
        Ok(image)
    }

    fn replace_image(&self, image: ImageReference) {
        self.state().install_image(image);
    }

    /// Show a local preview at once, then upload to external storage
    ///
    /// Refused while an image is active or another upload is outstanding.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadOutcome, ControllerError> {
        debug!(session_id = %self.session_id, %file_name, len = bytes.len(), "upload: called");
        let _guard = self.uploading.try_acquire().ok_or(ControllerError::Busy("upload"))?;
        if self.state().image.is_some() {
            return Err(ControllerError::ImageActive);
        }

        let preview = ImageReference::local_preview(mime_for(file_name), &bytes);
        self.replace_image(preview.clone());

        let result = match &self.services.uploader {
            Some(uploader) => uploader.upload(file_name, bytes).await.map_err(|e| e.to_string()),
            None => Err("no uploader configured".to_string()),
        };

        let outcome = {
            let mut state = self.state();
            // The preview may have been replaced or cleared while uploading
            if state.image.as_ref() != Some(&preview) {
                info!(session_id = %self.session_id, "upload: image changed meanwhile, dropping result");
                return Ok(UploadOutcome::Superseded);
            }
            match result {
                Ok(file) => {
                    let image = ImageReference::remote(&self.services.url_endpoint, &file.file_path);
                    info!(session_id = %self.session_id, %image, "upload: stored");
                    state.install_image(image.clone());
                    state.messages.push(ChatMessage::assistant(UPLOADED));
                    UploadOutcome::Uploaded(image)
                }
                Err(e) => {
                    warn!(session_id = %self.session_id, error = %e, "upload: failed, keeping local preview");
                    state.messages.push(ChatMessage::assistant(UPLOAD_FAILED));
                    UploadOutcome::PreviewOnly
                }
            }
        };

        self.schedule_save();
        Ok(outcome)
    }

    fn schedule_save(&self) {
        if !self.loaded.load(Ordering::Acquire) {
            debug!(session_id = %self.session_id, "schedule_save: not loaded yet, skipping");
            return;
        }
        let snapshot = self.snapshot();
        let repository = self.services.repository.clone();
        self.debouncer.schedule(async move {
            if let Err(e) = repository.save(&snapshot).await {
                error!(session_id = %snapshot.session_id, error = %e, "Debounced save failed");
            }
        });
    }

    /// Write the current state now, replacing any pending save
    pub async fn flush(&self) -> Result<(), ControllerError> {
        debug!(session_id = %self.session_id, "flush: called");
        self.debouncer.cancel();
        if !self.loaded.load(Ordering::Acquire) {
            return Ok(());
        }
        self.services
            .repository
            .save(&self.snapshot())
            .await
            .map_err(ControllerError::Save)
    }

    /// Cancel any pending save
    pub fn teardown(&self) {
        debug!(session_id = %self.session_id, "teardown: called");
        self.debouncer.cancel();
    }
}

/// Assistant text for a failed turn; rate limits carry the suggested wait
fn failure_reply(error: &TranslateError) -> String {
    match error {
        TranslateError::RateLimited { retry_after } => format!(
            "Rate limit exceeded. Please wait {}s and try again.",
            retry_after.as_secs().max(1)
        ),
        other => other.to_string(),
    }
}
