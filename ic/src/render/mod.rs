//! Rendering a reference plus a transformation sequence into a displayable URL

mod imagekit;
pub mod vocabulary;

pub use imagekit::ImageKitRenderer;

use crate::domain::{Descriptor, ImageReference};

/// Pure function from image + ordered steps to a resource locator
pub trait Renderer: Send + Sync {
    fn render(&self, image: &ImageReference, steps: &[Descriptor]) -> String;
}
