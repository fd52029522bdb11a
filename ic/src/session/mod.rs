//! Per-session control: in-flight guards, debounced saves, the controller

mod controller;
mod debounce;
mod guard;

pub use controller::{
    CLEARED, ControllerError, GREETING, NOT_UNDERSTOOD, SessionController, SessionServices, TurnOutcome, UNDONE,
    UPLOAD_FAILED, UPLOADED, UploadOutcome,
};
pub use debounce::Debouncer;
pub use guard::{InFlight, InFlightGuard};
