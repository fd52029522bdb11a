//! imagechat - conversational image editing
//!
//! A user describes edits in plain language; an LLM translates each request
//! into transformation descriptors; the accumulated descriptor list is
//! rendered as an ImageKit CDN URL.
//!
//! # Modules
//!
//! - [`domain`] - descriptors, sessions, image references and the sequencer
//! - [`translator`] - request-to-descriptor translation over an [`llm`] client
//! - [`render`] - transformation URL composition
//! - [`session`] - per-session controller with debounced saves
//! - [`state`] - session persistence actor over `sessionstore`
//! - [`upload`] - upload credential signing and the storage client
//! - [`server`] - HTTP endpoints
//! - [`repl`] - interactive terminal front-end

pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod prompts;
pub mod render;
pub mod repl;
pub mod server;
pub mod session;
pub mod state;
pub mod translator;
pub mod upload;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use domain::{ChatMessage, Descriptor, DescriptorGroup, ImageReference, Role, Sequencer, Session};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
pub use render::{ImageKitRenderer, Renderer};
pub use server::{AppState, create_router};
pub use session::{SessionController, SessionServices, TurnOutcome, UploadOutcome};
pub use state::{SessionRepository, SessionStore, StateError};
pub use translator::{TranslateError, Translation, Translator};
pub use upload::{UploadCredentials, UploadSigner, Uploader};
