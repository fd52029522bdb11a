//! Operation vocabulary
//!
//! The SDK-style names the translator is taught to emit, paired with the
//! CDN URL parameters they compose to.

use serde::Serialize;
use tracing::debug;

/// Grouping used when presenting the vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    Basic,
    Crop,
    Ai,
    Effect,
}

impl Category {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Basic => "Basic Transformations",
            Self::Crop => "Crop & Focus",
            Self::Ai => "AI Transformations",
            Self::Effect => "Effects & Filters",
        }
    }
}

/// How a value is rendered after the URL parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueStyle {
    /// `param-value`
    Plain,
    /// `true` renders the bare parameter; other values render as `param-value`
    Flag,
    /// A free-text prompt: `param-prompt-text` (or base64 via `prompte-`)
    Prompt,
    /// `true`, or an object of sub-options joined with `_`
    Options,
}

/// One operation the translator may emit
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    pub name: &'static str,
    pub param: &'static str,
    #[serde(skip)]
    pub category: Category,
    #[serde(skip)]
    pub style: ValueStyle,
    pub kind: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

const fn op(
    name: &'static str,
    param: &'static str,
    category: Category,
    style: ValueStyle,
    kind: &'static str,
    description: &'static str,
    example: &'static str,
) -> Operation {
    Operation {
        name,
        param,
        category,
        style,
        kind,
        description,
        example,
    }
}

use Category::{Ai, Basic, Crop, Effect};
use ValueStyle::{Flag, Options, Plain, Prompt};

/// Top-level operations
pub static OPERATIONS: &[Operation] = &[
    op("width", "w", Basic, Plain, "number/string", "Width in pixels or expression", r#""width": 500"#),
    op("height", "h", Basic, Plain, "number/string", "Height in pixels or expression", r#""height": 300"#),
    op("aspectRatio", "ar", Basic, Plain, "string", "Aspect ratio (use underscore)", r#""aspectRatio": "16_9""#),
    op("quality", "q", Basic, Plain, "number", "Quality 1-100", r#""quality": 80"#),
    op("format", "f", Basic, Plain, "string", "Output format", r#""format": "webp""#),
    op("radius", "r", Basic, Plain, "number/string", "Border radius, \"max\" for circle", r#""radius": "max""#),
    op("background", "bg", Basic, Plain, "string", "Background color (hex without #)", r#""background": "FFFFFF""#),
    op("blur", "bl", Basic, Plain, "number", "Blur amount", r#""blur": 10"#),
    op("rotation", "rt", Basic, Plain, "number", "Rotation degrees", r#""rotation": 90"#),
    op("cropMode", "cm", Crop, Plain, "string", "Crop strategy", r#""cropMode": "pad_resize""#),
    op("focus", "fo", Crop, Plain, "string", "Focus area: face, auto, center, or object name", r#""focus": "face""#),
    op("zoom", "z", Crop, Plain, "number", "Zoom level for face crop", r#""zoom": 0.5"#),
    op("x", "x", Crop, Plain, "number", "X coordinate for crop", r#""x": 100"#),
    op("y", "y", Crop, Plain, "number", "Y coordinate for crop", r#""y": 50"#),
    op("aiRemoveBackground", "e-bgremove", Ai, Flag, "boolean", "Cost-efficient background removal", r#""aiRemoveBackground": true"#),
    op("aiRemoveBackgroundExternal", "e-removedotbg", Ai, Flag, "boolean", "Premium background removal (third party)", r#""aiRemoveBackgroundExternal": true"#),
    op("aiUpscale", "e-upscale", Ai, Flag, "boolean", "Increase resolution to 16MP", r#""aiUpscale": true"#),
    op("aiRetouch", "e-retouch", Ai, Flag, "boolean", "Improve image quality", r#""aiRetouch": true"#),
    op("aiVariation", "e-genvar", Ai, Flag, "boolean", "Generate image variations", r#""aiVariation": true"#),
    op("aiDropShadow", "e-dropshadow", Ai, Options, "boolean/object", "Realistic AI drop shadow; options azimuth, elevation, saturation", r#""aiDropShadow": { "azimuth": 90 }"#),
    op("aiChangeBackground", "e-changebg", Ai, Prompt, "string", "Change background from a text prompt", r#""aiChangeBackground": "beach sunset""#),
    op("grayscale", "e-grayscale", Effect, Flag, "boolean", "Convert to grayscale", r#""grayscale": true"#),
    op("contrastStretch", "e-contrast", Effect, Flag, "boolean", "Adjust contrast", r#""contrastStretch": true"#),
    op("sharpen", "e-sharpen", Effect, Flag, "boolean/number", "Sharpen image", r#""sharpen": 5"#),
    op("shadow", "e-shadow", Effect, Flag, "boolean", "Add simple shadow", r#""shadow": true"#),
];

/// Parameters allowed inside an overlay's own transformation list
pub static LAYER_PARAMS: &[(&str, &str)] = &[
    ("width", "w"),
    ("height", "h"),
    ("fontSize", "fs"),
    ("fontColor", "co"),
    ("fontFamily", "ff"),
    ("background", "bg"),
    ("padding", "pa"),
    ("radius", "r"),
    ("rotation", "rt"),
    ("alpha", "al"),
    ("typography", "tg"),
];

/// Sub-option abbreviations for `Options`-style values
pub static OPTION_PARAMS: &[(&str, &str)] = &[("azimuth", "az"), ("elevation", "el"), ("saturation", "st")];

/// Find an operation by its SDK name
pub fn lookup(name: &str) -> Option<&'static Operation> {
    let found = OPERATIONS.iter().find(|o| o.name == name);
    if found.is_none() {
        debug!(%name, "lookup: unknown operation");
    }
    found
}

pub(crate) fn abbreviate(table: &[(&str, &'static str)], name: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
}

/// Operations grouped by category, in presentation order
pub fn by_category() -> Vec<(Category, Vec<&'static Operation>)> {
    [Basic, Crop, Ai, Effect]
        .into_iter()
        .map(|c| (c, OPERATIONS.iter().filter(|o| o.category == c).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_and_params_unique() {
        let names: HashSet<_> = OPERATIONS.iter().map(|o| o.name).collect();
        let params: HashSet<_> = OPERATIONS.iter().map(|o| o.param).collect();
        assert_eq!(names.len(), OPERATIONS.len());
        assert_eq!(params.len(), OPERATIONS.len());
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("aiRemoveBackground").unwrap().param, "e-bgremove");
        assert_eq!(lookup("width").unwrap().param, "w");
        assert!(lookup("e-bgremove").is_none());
    }

    #[test]
    fn test_by_category_covers_everything() {
        let total: usize = by_category().iter().map(|(_, ops)| ops.len()).sum();
        assert_eq!(total, OPERATIONS.len());
    }
}
