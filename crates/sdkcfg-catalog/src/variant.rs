//! Variant resolution: merging a family-specific fragment into a base
//! descriptor.
//!
//! The merge is shaped per field category:
//!
//! | category | fields | rule |
//! |---|---|---|
//! | scalar | display name, description, version, max instances | fragment replaces |
//! | list | config, templates, requires | base then fragment |
//! | nested | static, link, constants | merged one level deep |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::descriptor::{
    ConfigOption, LibraryEntry, LinkSpec, ModuleDescriptor, StaticBlock, TemplateSpec,
};
use crate::error::{CatalogError, Result};

/// Variant key: the derived string that picks one fragment.
pub type VariantKey = String;

/// Partial link specification contributed by a variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinkFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtos_suffix: Option<bool>,
}

/// A family-specific implementation fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VariantFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<ConfigOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<TemplateSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default, rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_block: Option<StaticBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkFragment>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constants: BTreeMap<String, u64>,
}

/// Merge `fragment` into a copy of `base`.
pub fn merge(base: &ModuleDescriptor, fragment: &VariantFragment) -> ModuleDescriptor {
    let mut out = base.clone();

    // Scalars.
    if let Some(v) = &fragment.display_name {
        out.display_name = Some(v.clone());
    }
    if let Some(v) = &fragment.description {
        out.description = Some(v.clone());
    }
    if let Some(v) = &fragment.version {
        out.version = Some(v.clone());
    }
    if let Some(v) = fragment.max_instances {
        out.max_instances = Some(v);
    }

    // Lists.
    out.config.extend(fragment.config.iter().cloned());
    out.templates.extend(fragment.templates.iter().cloned());
    out.requires.extend(fragment.requires.iter().cloned());

    // Nested.
    if let Some(frag_static) = &fragment.static_block {
        out.static_block = Some(merge_static(base.static_block.as_ref(), frag_static));
    }
    if let Some(frag_link) = &fragment.link {
        out.link = Some(merge_link(base.link.as_ref(), frag_link));
    }
    for (name, value) in &fragment.constants {
        out.constants.insert(name.clone(), *value);
    }

    out
}

fn merge_static(base: Option<&StaticBlock>, fragment: &StaticBlock) -> StaticBlock {
    let mut out = base.cloned().unwrap_or_default();
    out.config.extend(fragment.config.iter().cloned());
    for (key, value) in &fragment.attributes {
        out.attributes.insert(key.clone(), value.clone());
    }
    out
}

fn merge_link(base: Option<&LinkSpec>, fragment: &LinkFragment) -> LinkSpec {
    let mut out = base.cloned().unwrap_or_default();
    if let Some(root) = &fragment.root {
        out.root = Some(root.clone());
    }
    out.libraries.extend(fragment.libraries.iter().cloned());
    out.deps.extend(fragment.deps.iter().cloned());
    if let Some(flag) = fragment.rtos_suffix {
        out.rtos_suffix = flag;
    }
    out
}

/// Select the fragment for `key` and merge it into `base`.
///
/// A missing key is fatal: the device reached a module that claims to
/// support it but has no implementation for its family.
pub fn resolve_variant(
    base: &ModuleDescriptor,
    key: &str,
    implementations: &BTreeMap<VariantKey, VariantFragment>,
) -> Result<ModuleDescriptor> {
    let fragment = implementations
        .get(key)
        .ok_or_else(|| CatalogError::UnknownVariant {
            module: base.name.clone(),
            key: key.to_string(),
            available: implementations.keys().cloned().collect(),
        })?;
    tracing::debug!(module = %base.name, variant = key, "merging variant fragment");
    Ok(merge(base, fragment))
}
