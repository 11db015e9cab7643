//! `*.module.toml` descriptor files.
//!
//! A manifest holds the base descriptor under `[module]` and the variant
//! implementations under `[variants.<key>]`:
//!
//! ```toml
//! [module]
//! name = "/ti/drivers/GPIO"
//! support = "unconditional"
//! variant-key = "driver-family"
//!
//! [variants.CC26XX]
//! max-instances = 31
//!
//! [variants.LPF3]
//! max-instances = 26
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use sdkcfg_device::DeviceContext;
use serde::{Deserialize, Serialize};

use crate::descriptor::{ConfigOption, LibraryEntry, ModuleDescriptor, MAX_BIT_SIZE};
use crate::error::{CatalogError, Result};
use crate::variant::{resolve_variant, VariantFragment, VariantKey};

/// A module descriptor file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Base descriptor (required).
    pub module: ModuleDescriptor,
    /// Variant implementations keyed by variant key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<VariantKey, VariantFragment>,
}

impl ModuleManifest {
    /// Wrap a descriptor that has no variants.
    pub fn from_descriptor(module: ModuleDescriptor) -> Self {
        Self {
            module,
            variants: BTreeMap::new(),
        }
    }

    /// Parse and validate a manifest from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        let manifest: ModuleManifest = toml::from_str(input)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| CatalogError::Load {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    /// Serialize this manifest to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.module.name
    }

    /// Check the manifest for authoring errors.
    pub fn validate(&self) -> Result<()> {
        let m = &self.module;
        let invalid = |detail: String| CatalogError::InvalidDescriptor {
            module: m.name.clone(),
            detail,
        };

        if m.name.is_empty() {
            return Err(invalid("module.name is required".into()));
        }
        if !m.name.starts_with('/') {
            return Err(invalid("module.name must be a path starting with '/'".into()));
        }
        if let Some(version) = &m.version {
            semver::Version::parse(version)?;
        }
        if m.max_instances == Some(0) {
            return Err(invalid("max-instances must be at least 1".into()));
        }

        m.support.compile().map_err(|e| CatalogError::AmbiguousRule {
            module: m.name.clone(),
            rule: m.support.to_string(),
            detail: e.to_string(),
        })?;

        if m.requires.iter().any(|r| r == &m.name) {
            return Err(invalid("a module cannot require itself".into()));
        }

        match (m.variant_key, self.variants.is_empty()) {
            (Some(key), true) => {
                return Err(invalid(format!(
                    "variant-key is {key:?} but no [variants] are declared"
                )))
            }
            (None, false) => {
                return Err(invalid("[variants] declared without a variant-key".into()))
            }
            _ => {}
        }

        for (key, fragment) in &self.variants {
            if let Some(version) = &fragment.version {
                semver::Version::parse(version)?;
            }
            if fragment.requires.iter().any(|r| r == &m.name) {
                return Err(invalid(format!("variant '{key}' makes the module require itself")));
            }
        }

        check_unique(
            m.config.iter().map(|o| o.name.as_str()),
            "config option",
            &m.name,
        )?;
        check_display_formats(&m.config, &m.name)?;
        if let Some(block) = &m.static_block {
            check_display_formats(&block.config, &m.name)?;
        }
        for fragment in self.variants.values() {
            check_display_formats(&fragment.config, &m.name)?;
            if let Some(block) = &fragment.static_block {
                check_display_formats(&block.config, &m.name)?;
            }
            if let Some(link) = &fragment.link {
                check_library_conditions(&link.libraries, &m.name)?;
            }
        }
        for template in &m.templates {
            if template.output.is_empty() || template.template.is_empty() {
                return Err(invalid("templates need both a template and an output".into()));
            }
        }
        if let Some(link) = &m.link {
            check_unique(link.libraries.iter().map(LibraryEntry::name), "library", &m.name)?;
            check_library_conditions(&link.libraries, &m.name)?;
        }

        Ok(())
    }

    /// The descriptor as it applies to `ctx`, with its variant merged in.
    ///
    /// Returns the merged descriptor and the variant key used, if any.
    pub fn resolve_for(&self, ctx: &DeviceContext) -> Result<(ModuleDescriptor, Option<VariantKey>)> {
        match self.module.variant_key {
            None => Ok((self.module.clone(), None)),
            Some(source) => {
                let key = source.key_for(ctx);
                let merged = resolve_variant(&self.module, &key, &self.variants)?;
                check_unique(
                    merged.config.iter().map(|o| o.name.as_str()),
                    "config option",
                    &merged.name,
                )?;
                if let Some(link) = &merged.link {
                    check_unique(link.libraries.iter().map(LibraryEntry::name), "library", &merged.name)?;
                }
                Ok((merged, Some(key)))
            }
        }
    }
}

/// Hex display widths are derived from `bit-size`, so it must fit a `u64`.
fn check_display_formats(options: &[ConfigOption], module: &str) -> Result<()> {
    for option in options {
        if let Some(bits) = option.display_format.and_then(|f| f.bit_size) {
            if bits == 0 || bits > MAX_BIT_SIZE {
                return Err(CatalogError::InvalidDescriptor {
                    module: module.to_string(),
                    detail: format!(
                        "option '{}': bit-size {bits} is outside 1..={MAX_BIT_SIZE}",
                        option.name
                    ),
                });
            }
        }
    }
    Ok(())
}

fn check_library_conditions(libraries: &[LibraryEntry], module: &str) -> Result<()> {
    for library in libraries {
        if library.name().is_empty() {
            return Err(CatalogError::InvalidDescriptor {
                module: module.to_string(),
                detail: "library names cannot be empty".into(),
            });
        }
        if let Some(bad) = library.conditions().find(|c| !c.starts_with('/')) {
            return Err(CatalogError::InvalidDescriptor {
                module: module.to_string(),
                detail: format!("library '{}' is conditional on '{bad}', which is not a module path", library.name()),
            });
        }
    }
    Ok(())
}

fn check_unique<'a>(names: impl Iterator<Item = &'a str>, what: &str, module: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(CatalogError::InvalidDescriptor {
                module: module.to_string(),
                detail: format!("{what} '{name}' is declared more than once"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ConfigValue, Radix, VariantSource};
    use sdkcfg_device::{DeviceDatabase, RtosKind, SupportRule};

    fn ctx(device: &str) -> DeviceContext {
        DeviceContext::from_source(
            &DeviceDatabase::builtin(),
            device,
            RtosKind::FreeRtos,
            Vec::<String>::new(),
        )
        .unwrap()
    }

    const GPIO: &str = r#"
[module]
name = "/ti/drivers/GPIO"
display-name = "GPIO"
version = "1.2.0"
max-instances = 8
support = "unconditional"
variant-key = "driver-family"

[[module.config]]
name = "mode"
default = "Output"

[module.static]
attributes = { initPriority = 1 }

[[module.static.config]]
name = "baseAddress"
default = 0x40022000
display-format = { radix = "hex", bit-size = 32 }

[[module.templates]]
template = "/ti/drivers/GPIO.Board.c.xdt"
output = "ti_drivers_config.c"
always-run = true

[module.link]
root = "ti/drivers"
libraries = ["drivers"]

[variants.CC26XX]
max-instances = 31

[[variants.CC26XX.config]]
name = "pull"
default = "None"

[variants.LPF3]
max-instances = 26
"#;

    #[test]
    fn parse_full_manifest() {
        let manifest = ModuleManifest::parse(GPIO).unwrap();
        assert_eq!(manifest.name(), "/ti/drivers/GPIO");
        assert_eq!(manifest.module.variant_key, Some(VariantSource::DriverFamily));
        assert_eq!(manifest.module.support, SupportRule::Unconditional);
        assert_eq!(manifest.variants.len(), 2);
        let st = manifest.module.static_block.as_ref().unwrap();
        assert_eq!(st.attributes["initPriority"], ConfigValue::Integer(1));
        assert_eq!(st.config[0].display_format.unwrap().radix, Radix::Hex);
        assert_eq!(st.config[0].render_default(), "0x40022000");
        assert!(manifest.module.templates[0].always_run);
    }

    #[test]
    fn resolve_for_merges_family_fragment() {
        let manifest = ModuleManifest::parse(GPIO).unwrap();
        let (merged, key) = manifest.resolve_for(&ctx("CC1352P7RGZ")).unwrap();
        assert_eq!(key.as_deref(), Some("CC26XX"));
        assert_eq!(merged.max_instances, Some(31));
        assert!(merged.option("pull").is_some());

        let (merged, key) = manifest.resolve_for(&ctx("CC2340R5RKP")).unwrap();
        assert_eq!(key.as_deref(), Some("LPF3"));
        assert_eq!(merged.max_instances, Some(26));
        assert!(merged.option("pull").is_none());
    }

    #[test]
    fn resolve_for_without_variants_returns_base() {
        let manifest = ModuleManifest::from_descriptor(ModuleDescriptor::new(
            "/ti/log/LogSinkUART",
            SupportRule::Unconditional,
        ));
        let (merged, key) = manifest.resolve_for(&ctx("CC2340R5RKP")).unwrap();
        assert!(key.is_none());
        assert_eq!(merged, manifest.module);
    }

    #[test]
    fn resolve_for_unknown_variant() {
        let mut manifest = ModuleManifest::parse(GPIO).unwrap();
        manifest.variants.remove("LPF3");
        let err = manifest.resolve_for(&ctx("CC2340R5RKP")).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownVariant { ref key, .. } if key == "LPF3"));
    }

    #[test]
    fn merged_duplicate_option_rejected() {
        let mut manifest = ModuleManifest::parse(GPIO).unwrap();
        let dup = manifest.module.config[0].clone();
        manifest.variants.get_mut("LPF3").unwrap().config.push(dup);
        let err = manifest.resolve_for(&ctx("CC2340R5RKP")).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn support_is_required() {
        let input = r#"
[module]
name = "/ti/drivers/DMA"
"#;
        assert!(matches!(ModuleManifest::parse(input), Err(CatalogError::Toml(_))));
    }

    #[test]
    fn empty_device_list_is_accepted() {
        let input = r#"
[module]
name = "/ti/bleapp/ble_app_util"
support = { devices = [] }
"#;
        let manifest = ModuleManifest::parse(input).unwrap();
        assert_eq!(manifest.module.support, SupportRule::none());
    }

    #[test]
    fn reject_bad_pattern() {
        let input = r#"
[module]
name = "/ti/drivers/DMA"
support = { devices = [{ pattern = "CC26[" }] }
"#;
        let err = ModuleManifest::parse(input).unwrap_err();
        assert!(matches!(err, CatalogError::AmbiguousRule { ref module, .. } if module == "/ti/drivers/DMA"));
    }

    #[test]
    fn reject_relative_name() {
        let input = r#"
[module]
name = "drivers/DMA"
support = "unconditional"
"#;
        assert!(ModuleManifest::parse(input).is_err());
    }

    #[test]
    fn reject_invalid_version() {
        let input = r#"
[module]
name = "/ti/display/Display"
version = "1.0.0.0"
support = "unconditional"
"#;
        assert!(matches!(
            ModuleManifest::parse(input),
            Err(CatalogError::SemverVersion(_))
        ));
    }

    #[test]
    fn reject_variant_key_without_variants() {
        let input = r#"
[module]
name = "/ti/drivers/GPIO"
support = "unconditional"
variant-key = "family"
"#;
        assert!(ModuleManifest::parse(input).is_err());
    }

    #[test]
    fn reject_variants_without_key() {
        let input = r#"
[module]
name = "/ti/drivers/GPIO"
support = "unconditional"

[variants.CC26XX]
max-instances = 2
"#;
        assert!(ModuleManifest::parse(input).is_err());
    }

    #[test]
    fn reject_self_requirement() {
        let input = r#"
[module]
name = "/ti/tfm/SecureCB"
support = "unconditional"
requires = ["/ti/tfm/SecureCB"]
"#;
        assert!(ModuleManifest::parse(input).is_err());
    }

    #[test]
    fn reject_duplicate_library() {
        let input = r#"
[module]
name = "/ti/display/Display"
support = "unconditional"

[module.link]
libraries = ["display", "display"]
"#;
        let err = ModuleManifest::parse(input).unwrap_err();
        assert!(err.to_string().contains("library 'display'"));
    }

    #[test]
    fn reject_bit_size_out_of_range() {
        let with_bits = |bits: u32| {
            format!(
                r#"
[module]
name = "/ti/common/mcuboot"
support = "unconditional"

[[module.config]]
name = "bootloaderBaseAddress"
default = 0
display-format = {{ radix = "hex", bit-size = {bits} }}
"#
            )
        };
        for bits in [0, 65, 4096] {
            let err = ModuleManifest::parse(&with_bits(bits)).unwrap_err();
            assert!(err.to_string().contains("bit-size"), "{bits}: {err}");
        }
        let manifest = ModuleManifest::parse(&with_bits(64)).unwrap();
        assert_eq!(manifest.module.config[0].render_default(), "0x0000000000000000");
    }

    #[test]
    fn reject_bit_size_in_variant_static_block() {
        let mut manifest = ModuleManifest::parse(GPIO).unwrap();
        let mut option = manifest.module.static_block.as_ref().unwrap().config[0].clone();
        option.name = "wideBase".into();
        option.display_format = Some(crate::descriptor::DisplayFormat {
            radix: Radix::Hex,
            bit_size: Some(128),
        });
        manifest.variants.get_mut("LPF3").unwrap().static_block = Some(crate::StaticBlock {
            config: vec![option],
            ..Default::default()
        });
        assert!(matches!(
            manifest.validate(),
            Err(CatalogError::InvalidDescriptor { ref detail, .. }) if detail.contains("wideBase")
        ));
    }

    #[test]
    fn conditional_libraries_validated() {
        let input = r#"
[module]
name = "/ti/ti154stack/ti154stack"
support = "unconditional"

[module.link]
libraries = ["maclib_sm", { name = "maclib_osal", unless-module = "/ti/dmm/dmm" }]
"#;
        let manifest = ModuleManifest::parse(input).unwrap();
        let link = manifest.module.link.as_ref().unwrap();
        assert_eq!(link.libraries[1].name(), "maclib_osal");

        let relative = input.replace("\"/ti/dmm/dmm\"", "\"dmm\"");
        let err = ModuleManifest::parse(&relative).unwrap_err();
        assert!(err.to_string().contains("not a module path"), "{err}");

        let duplicate = input.replace("maclib_osal", "maclib_sm");
        assert!(ModuleManifest::parse(&duplicate).is_err());
    }

    #[test]
    fn round_trip_toml() {
        let manifest = ModuleManifest::parse(GPIO).unwrap();
        let serialized = manifest.to_toml().unwrap();
        let reparsed = ModuleManifest::parse(&serialized).unwrap();
        assert_eq!(reparsed, manifest);
    }

    #[test]
    fn load_wraps_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.module.toml");
        std::fs::write(&path, "[module]\nname = \"\"\nsupport = \"unconditional\"\n").unwrap();
        let err = ModuleManifest::load(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Load { .. }));
        assert!(err.to_string().contains("bad.module.toml"));
    }
}
