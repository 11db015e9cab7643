//! Module descriptor catalog for sdkcfg.
//!
//! This crate provides:
//! - **Descriptors:** typed module records (options, support rules, link and
//!   template specifications)
//! - **Variants:** family-specific fragments merged into a base descriptor
//! - **Manifests:** the `*.module.toml` file format and its validation
//! - **Registry:** the ordered, read-only set of descriptors an SDK ships

pub mod descriptor;
pub mod error;
pub mod module_manifest;
pub mod registry;
pub mod variant;

pub use descriptor::{
    ConditionalLibrary, ConfigOption, ConfigValue, DisplayFormat, LibraryEntry, LinkSpec,
    ModuleDescriptor, Radix, StaticBlock, TemplateSpec, VariantSource,
};
pub use error::{CatalogError, Result};
pub use module_manifest::ModuleManifest;
pub use registry::{ModuleRegistry, ModuleSearchResult, DESCRIPTOR_SUFFIX};
pub use variant::{merge, resolve_variant, LinkFragment, VariantFragment, VariantKey};
