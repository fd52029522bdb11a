//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;
use crate::render::vocabulary::{self, LAYER_PARAMS, Operation};

/// One vocabulary table in the rendered prompt
#[derive(Debug, Clone, Serialize)]
pub struct CategoryContext {
    pub title: &'static str,
    pub operations: Vec<&'static Operation>,
}

/// Context for rendering the translate template
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    pub categories: Vec<CategoryContext>,
    pub layer_params: Vec<&'static str>,
}

impl PromptContext {
    /// Context describing the full operation vocabulary
    pub fn vocabulary() -> Self {
        debug!("PromptContext::vocabulary: called");
        Self {
            categories: vocabulary::by_category()
                .into_iter()
                .map(|(category, operations)| CategoryContext {
                    title: category.title(),
                    operations,
                })
                .collect(),
            layer_params: LAYER_PARAMS.iter().map(|(name, _)| *name).collect(),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.imagechat/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a prompt loader rooted at `base`
    ///
    /// Templates in `<base>/.imagechat/prompts/` override the embedded ones.
    pub fn new(base: impl AsRef<Path>) -> Self {
        let user_dir = base.as_ref().join(".imagechat/prompts");
        let user_dir_exists = user_dir.exists();
        debug!(?user_dir, %user_dir_exists, "PromptLoader::new: called");

        Self {
            hbs: Self::engine(),
            user_dir: if user_dir_exists { Some(user_dir) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.imagechat/prompts/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in user override");
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, context: &PromptContext) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}'", template_name);

        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// The translator's system prompt with the vocabulary filled in
    pub fn translate_prompt(&self) -> Result<String> {
        debug!("PromptLoader::translate_prompt: called");
        self.render("translate", &PromptContext::vocabulary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_translate_prompt_lists_vocabulary() {
        let prompt = PromptLoader::embedded_only().translate_prompt().unwrap();

        assert!(prompt.contains("### AI Transformations"));
        assert!(prompt.contains("| aiRemoveBackground | e-bgremove | boolean |"));
        assert!(prompt.contains(r#"| radius | r | number/string | Border radius, "max" for circle |"#));
        assert!(prompt.contains("fontSize, fontColor"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_every_operation_is_in_prompt() {
        let prompt = PromptLoader::embedded_only().translate_prompt().unwrap();
        for op in vocabulary::OPERATIONS {
            assert!(prompt.contains(&format!("| {} | {} |", op.name, op.param)), "missing {}", op.name);
        }
    }

    #[test]
    fn test_user_override_wins() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(".imagechat/prompts");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("translate.pmt"), "Custom: {{#each categories}}{{title}};{{/each}}").unwrap();

        let prompt = PromptLoader::new(temp.path()).translate_prompt().unwrap();
        assert!(prompt.starts_with("Custom: Basic Transformations;"));
    }

    #[test]
    fn test_unknown_template_errors() {
        let result = PromptLoader::embedded_only().render("nope", &PromptContext::vocabulary());
        assert!(result.is_err());
    }
}
