//! Grouping the model catalog for display.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::types::ModelInfo;

/// Models sharing one base model id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelGroup<'a> {
    /// The shared base model id.
    pub base_model_id: String,
    /// Members, sorted by short name.
    pub models: Vec<&'a ModelInfo>,
}

/// Groups `models` by base model id.
///
/// Groups come back in ascending key order and members in ascending order of
/// their short name; every input appears exactly once.  A model that reports
/// no base id is grouped under its own short name.
pub fn group_models(models: &[ModelInfo]) -> Vec<ModelGroup<'_>> {
    let mut groups: BTreeMap<&str, Vec<&ModelInfo>> = BTreeMap::new();
    for model in models {
        let key = if model.base_model_id.is_empty() {
            model.short_name()
        } else {
            model.base_model_id.as_str()
        };
        groups.entry(key).or_default().push(model);
    }

    groups
        .into_iter()
        .map(|(base_model_id, mut models)| {
            models.sort_by(|a, b| {
                a.short_name()
                    .cmp(b.short_name())
                    .then_with(|| a.name.cmp(&b.name))
            });
            ModelGroup {
                base_model_id: base_model_id.to_string(),
                models,
            }
        })
        .collect()
}

/// The Markdown shown for the in-chat `/models` command.
pub fn chat_catalog_markdown(models: &[ModelInfo], current_model: &str) -> String {
    let mut out = String::from("# Available Models\n\n");
    for group in group_models(models) {
        let _ = write!(out, "## {}\n\n", group.base_model_id);
        for model in &group.models {
            let _ = writeln!(out, "* **{}**", model.short_name());
        }
        out.push('\n');
    }
    let _ = write!(out, "**Current model:** {current_model}\n\n");
    out.push_str("To change models, type: `/model MODEL_NAME`");
    out
}

/// The Markdown document printed by `gemi models`.
pub fn catalog_document_markdown(models: &[ModelInfo]) -> String {
    let mut out = String::new();
    for (i, group) in group_models(models).iter().enumerate() {
        if i > 0 {
            out.push_str("---\n\n");
        }
        let _ = write!(out, "# {}\n\n", group.base_model_id);
        for model in &group.models {
            let _ = writeln!(
                out,
                "* **{}** (version: {})",
                model.short_name(),
                model.version
            );
        }
        out.push('\n');
    }

    out.push_str("# Usage Instructions\n\n");
    out.push_str("To use a specific model:\n\n");
    out.push_str("```bash\n");
    out.push_str("gemi chat --model MODEL_NAME\n");
    out.push_str("gemi generate --model MODEL_NAME --prompt \"Your prompt\"\n");
    out.push_str("```\n\n");
    out.push_str("In chat mode, you can also switch models using:\n\n");
    out.push_str("```\n/model MODEL_NAME\n```\n");
    out
}
