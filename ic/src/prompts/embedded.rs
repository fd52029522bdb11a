//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Request → transformation JSON prompt
pub const TRANSLATE: &str = include_str!("../../prompts/translate.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "translate" => {
            debug!("get_embedded: matched translate");
            Some(TRANSLATE)
        }
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
