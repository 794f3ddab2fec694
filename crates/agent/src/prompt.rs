//! Prompt templates for the reasoning stage.
//!
//! Templates ship inside the binary. A configured `agent.prompt_dir`
//! replaces them: when set, the template must exist there.

use datacopilot_core::error::{Error, Result};
use std::path::PathBuf;
use tracing::{debug, error};

/// Template name of the analyst system instruction.
pub const ANALYSIS_TEMPLATE: &str = "analysis.md";

const BUILTIN_ANALYSIS: &str = include_str!("../prompts/analysis.md");

/// Loads prompt templates by name.
#[derive(Debug, Clone, Default)]
pub struct PromptLoader {
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Use only the templates compiled into the binary.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Read templates from `dir` instead of the built-in set.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            override_dir: Some(dir.into()),
        }
    }

    /// Load the raw template text.
    pub fn load(&self, name: &str) -> Result<String> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(name);
            debug!(path = %path.display(), "Loading prompt template");
            return std::fs::read_to_string(&path).map_err(|e| {
                error!(path = %path.display(), error = %e, "Prompt template not readable");
                Error::Prompt {
                    name: name.to_string(),
                    reason: format!("{}: {e}", path.display()),
                }
            });
        }

        builtin(name).map(str::to_string).ok_or_else(|| Error::Prompt {
            name: name.to_string(),
            reason: "no built-in template with this name".into(),
        })
    }

    /// Load a template and fill in `{{dataset_id}}`.
    pub fn render(&self, name: &str, dataset_id: &str) -> Result<String> {
        Ok(self.load(name)?.replace("{{dataset_id}}", dataset_id))
    }
}

fn builtin(name: &str) -> Option<&'static str> {
    match name {
        ANALYSIS_TEMPLATE => Some(BUILTIN_ANALYSIS),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_analysis_renders_dataset() {
        let text = PromptLoader::builtin()
            .render(ANALYSIS_TEMPLATE, "bigquery-public-data.thelook_ecommerce")
            .unwrap();
        assert!(text.contains("bigquery-public-data.thelook_ecommerce"));
        assert!(!text.contains("{{dataset_id}}"));
        assert!(text.contains("inspect_schema"));
    }

    #[test]
    fn unknown_builtin_is_prompt_error() {
        let err = PromptLoader::builtin().load("summary.md").unwrap_err();
        assert!(matches!(err, Error::Prompt { ref name, .. } if name == "summary.md"));
    }

    #[test]
    fn override_dir_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ANALYSIS_TEMPLATE), "Custom for {{dataset_id}}").unwrap();
        let text = PromptLoader::from_dir(dir.path())
            .render(ANALYSIS_TEMPLATE, "p.d")
            .unwrap();
        assert_eq!(text, "Custom for p.d");
    }

    #[test]
    fn configured_but_missing_template_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PromptLoader::from_dir(dir.path()).load(ANALYSIS_TEMPLATE).unwrap_err();
        assert!(err.to_string().contains("analysis.md"));
    }
}
