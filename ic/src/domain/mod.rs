//! Domain types: descriptors, the sequencer, sessions and image references

mod descriptor;
mod image;
mod sequencer;
mod session;

pub use descriptor::{Descriptor, DescriptorGroup};
pub use image::{ImageReference, mime_for};
pub use sequencer::Sequencer;
pub use session::{ChatMessage, Role, Session};
