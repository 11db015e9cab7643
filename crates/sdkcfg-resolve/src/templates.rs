//! Template contributions handed to the generation engine.

use sdkcfg_catalog::ModuleDescriptor;
use serde::{Deserialize, Serialize};

/// One template the generation engine should run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TemplateContribution {
    pub module: String,
    pub template: String,
    pub output: String,
    pub always_run: bool,
}

/// Collect contributions in module order, then declaration order.
///
/// Nothing is filtered: skipping instance-gated templates with no
/// instances is left to the generation engine.
pub fn collect<'a>(modules: impl IntoIterator<Item = &'a ModuleDescriptor>) -> Vec<TemplateContribution> {
    modules
        .into_iter()
        .flat_map(|m| {
            m.templates.iter().map(move |t| TemplateContribution {
                module: m.name.clone(),
                template: t.template.clone(),
                output: t.output.clone(),
                always_run: t.always_run,
            })
        })
        .collect()
}
