//! ImageKit URL composition
//!
//! Each descriptor becomes one chained step: its operations render as
//! `param-value` joined with `,`, steps are joined with `:`, and the result
//! is set as the `tr` query parameter of the image URL.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use super::Renderer;
use super::vocabulary::{self, LAYER_PARAMS, OPTION_PARAMS, ValueStyle, abbreviate};
use crate::domain::{Descriptor, ImageReference};

/// Composes CDN URLs from an image reference and a transformation sequence
#[derive(Debug, Clone, Default)]
pub struct ImageKitRenderer;

impl ImageKitRenderer {
    pub fn new() -> Self {
        Self
    }

    /// The `tr` value for a sequence, or `None` when no step renders
    pub fn transformation_string(&self, steps: &[Descriptor]) -> Option<String> {
        debug!(step_count = steps.len(), "transformation_string: called");
        let rendered: Vec<String> = steps
            .iter()
            .map(render_step)
            .filter(|s| !s.is_empty())
            .collect();
        if rendered.is_empty() {
            None
        } else {
            Some(rendered.join(":"))
        }
    }
}

impl Renderer for ImageKitRenderer {
    fn render(&self, image: &ImageReference, steps: &[Descriptor]) -> String {
        debug!(%image, step_count = steps.len(), "ImageKitRenderer::render: called");
        let base = image.to_stored();
        if !image.is_transformable() {
            debug!("ImageKitRenderer::render: image not transformable, returning as-is");
            return base;
        }

        let Some(tr) = self.transformation_string(steps) else {
            return base;
        };

        match Url::parse(&base) {
            Ok(mut url) => {
                let others: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(k, _)| k != "tr")
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
                {
                    let mut query = url.query_pairs_mut();
                    query.clear();
                    for (k, v) in &others {
                        query.append_pair(k, v);
                    }
                    query.append_pair("tr", &tr);
                }
                url.to_string()
            }
            Err(e) => {
                debug!(error = %e, "ImageKitRenderer::render: unparseable base, appending raw query");
                let (path, existing) = match base.split_once('?') {
                    Some((p, q)) => (p, Some(q)),
                    None => (base.as_str(), None),
                };
                match existing {
                    Some(q) => format!("{path}?{q}&tr={tr}"),
                    None => format!("{path}?tr={tr}"),
                }
            }
        }
    }
}

/// Render one descriptor as a comma-joined parameter list
fn render_step(step: &Descriptor) -> String {
    step.ops()
        .filter_map(|(name, value)| render_op(name, value))
        .collect::<Vec<_>>()
        .join(",")
}

fn render_op(name: &str, value: &Value) -> Option<String> {
    if is_blank(value) {
        return None;
    }

    if name == "overlay" {
        return value.as_object().and_then(render_overlay);
    }

    let Some(op) = vocabulary::lookup(name) else {
        // Unknown operations pass through verbatim
        return match value {
            Value::Bool(true) => Some(name.to_string()),
            other => Some(format!("{name}-{}", scalar(other)?)),
        };
    };

    match (op.style, value) {
        (ValueStyle::Flag | ValueStyle::Options, Value::Bool(true)) => Some(op.param.to_string()),
        (ValueStyle::Options, Value::Object(options)) => {
            let parts: Vec<String> = options
                .iter()
                .filter(|(_, v)| !is_blank(v))
                .filter_map(|(k, v)| {
                    let key = abbreviate(OPTION_PARAMS, k).unwrap_or(k.as_str());
                    Some(format!("{key}-{}", scalar(v)?))
                })
                .collect();
            if parts.is_empty() {
                Some(op.param.to_string())
            } else {
                Some(format!("{}-{}", op.param, parts.join("_")))
            }
        }
        (ValueStyle::Prompt, Value::String(text)) => Some(prompt_param(op.param, text)),
        (_, other) => Some(format!("{}-{}", op.param, scalar(other)?)),
    }
}

/// Free text is inlined when it is plain words, otherwise base64-encoded
fn prompt_param(param: &str, text: &str) -> String {
    if text.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ') {
        format!("{param}-prompt-{text}")
    } else {
        format!("{param}-prompte-{}", URL_SAFE_NO_PAD.encode(text))
    }
}

/// Overlays render as a layer block: `l-<type>,...,l-end`
fn render_overlay(overlay: &Map<String, Value>) -> Option<String> {
    let kind = overlay.get("type").and_then(Value::as_str)?;
    let mut parts = vec![format!("l-{kind}")];

    match kind {
        "text" => {
            let text = overlay.get("text").and_then(Value::as_str)?;
            parts.push(format!("ie-{}", URL_SAFE_NO_PAD.encode(text)));
        }
        _ => {
            let input = overlay.get("input").and_then(Value::as_str)?;
            parts.push(format!("i-{}", input.trim_start_matches('/').replace('/', "@@")));
        }
    }

    if let Some(position) = overlay.get("position").and_then(Value::as_object) {
        for (axis, key) in [("x", "lx"), ("y", "ly"), ("focus", "lfo")] {
            if let Some(v) = position.get(axis).and_then(scalar) {
                parts.push(format!("{key}-{v}"));
            }
        }
    }

    let nested = overlay.get("transformation").and_then(Value::as_array);
    for step in nested.into_iter().flatten().filter_map(Value::as_object) {
        for (k, v) in step {
            if is_blank(v) {
                continue;
            }
            let key = abbreviate(LAYER_PARAMS, k).unwrap_or(k.as_str());
            if let Some(v) = scalar(v) {
                parts.push(format!("{key}-{v}"));
            }
        }
    }

    parts.push("l-end".to_string());
    Some(parts.join(","))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(value: Value) -> Descriptor {
        Descriptor::from_value(value).unwrap()
    }

    fn image() -> ImageReference {
        ImageReference::remote("https://ik.imagekit.io/demo", "/cat.jpg")
    }

    #[test]
    fn test_empty_sequence_returns_base_url() {
        let url = ImageKitRenderer::new().render(&image(), &[]);
        assert_eq!(url, "https://ik.imagekit.io/demo/cat.jpg");
    }

    #[test]
    fn test_basic_params_join_within_step() {
        let tr = ImageKitRenderer::new()
            .transformation_string(&[d(json!({"width": 500, "grayscale": true}))])
            .unwrap();
        assert_eq!(tr, "w-500,e-grayscale");
    }

    #[test]
    fn test_steps_chain_with_colon() {
        let tr = ImageKitRenderer::new()
            .transformation_string(&[d(json!({"aiRemoveBackground": true})), d(json!({"aiDropShadow": true}))])
            .unwrap();
        assert_eq!(tr, "e-bgremove:e-dropshadow");
    }

    #[test]
    fn test_render_sets_tr_query() {
        let url = ImageKitRenderer::new().render(&image(), &[d(json!({"focus": "face"}))]);
        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.path(), "/demo/cat.jpg");
        let tr: Vec<_> = parsed.query_pairs().filter(|(k, _)| k == "tr").map(|(_, v)| v.into_owned()).collect();
        assert_eq!(tr, vec!["fo-face".to_string()]);
    }

    #[test]
    fn test_existing_query_is_kept_and_tr_replaced() {
        let img = ImageReference::remote("https://ik.imagekit.io/demo", "/cat.jpg?v=2&tr=w-10");
        let url = ImageKitRenderer::new().render(&img, &[d(json!({"height": 300}))]);
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        assert_eq!(
            pairs,
            vec![("v".to_string(), "2".to_string()), ("tr".to_string(), "h-300".to_string())]
        );
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let tr = ImageKitRenderer::new().transformation_string(&[d(json!({"width": null, "blur": "", "grayscale": false}))]);
        assert!(tr.is_none());
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let tr = ImageKitRenderer::new()
            .transformation_string(&[d(json!({"dpr": 2, "orig": true}))])
            .unwrap();
        assert_eq!(tr, "dpr-2,orig");
    }

    #[test]
    fn test_drop_shadow_options() {
        let tr = ImageKitRenderer::new()
            .transformation_string(&[d(json!({"aiDropShadow": {"azimuth": 90, "elevation": 45}}))])
            .unwrap();
        assert_eq!(tr, "e-dropshadow-az-90_el-45");
    }

    #[test]
    fn test_change_background_prompt() {
        let r = ImageKitRenderer::new();
        assert_eq!(
            r.transformation_string(&[d(json!({"aiChangeBackground": "beach sunset"}))]).unwrap(),
            "e-changebg-prompt-beach sunset"
        );
        let encoded = r
            .transformation_string(&[d(json!({"aiChangeBackground": "snow, mountains"}))])
            .unwrap();
        assert_eq!(
            encoded,
            format!("e-changebg-prompte-{}", URL_SAFE_NO_PAD.encode("snow, mountains"))
        );
    }

    #[test]
    fn test_text_overlay_layer() {
        let tr = ImageKitRenderer::new()
            .transformation_string(&[d(json!({
                "overlay": {"type": "text", "text": "SALE", "transformation": [{"fontSize": 50, "fontColor": "FFFFFF"}]}
            }))])
            .unwrap();
        assert_eq!(tr, format!("l-text,ie-{},fs-50,co-FFFFFF,l-end", URL_SAFE_NO_PAD.encode("SALE")));
    }

    #[test]
    fn test_image_overlay_layer() {
        let tr = ImageKitRenderer::new()
            .transformation_string(&[d(json!({
                "overlay": {"type": "image", "input": "brand/logo.png", "position": {"x": 10, "y": 10}}
            }))])
            .unwrap();
        assert_eq!(tr, "l-image,i-brand@@logo.png,lx-10,ly-10,l-end");
    }

    #[test]
    fn test_untransformable_image_ignores_steps() {
        let preview = ImageReference::local_preview("image/png", b"abc");
        let url = ImageKitRenderer::new().render(&preview, &[d(json!({"blur": 10}))]);
        assert_eq!(url, preview.to_stored());
    }
}
