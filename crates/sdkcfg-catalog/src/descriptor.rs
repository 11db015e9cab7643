//! Typed module descriptor records.
//!
//! A descriptor declares one configurable module: its options, which
//! devices and kernels it supports, which modules it needs, which
//! templates it feeds, and which libraries it links.

use std::collections::BTreeMap;
use std::fmt;

use sdkcfg_device::{DeviceContext, RtosKind, SupportRule};
use serde::{Deserialize, Serialize};

/// A configuration option default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Integer(i) => write!(f, "{i}"),
            ConfigValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Radix for numeric display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Radix {
    Dec,
    Hex,
}

/// Widest integer a display format can describe.
pub const MAX_BIT_SIZE: u32 = 64;

/// How a numeric option is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayFormat {
    pub radix: Radix,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_size: Option<u32>,
}

impl DisplayFormat {
    /// 32-bit hexadecimal, the format used for addresses.
    pub const HEX32: DisplayFormat = DisplayFormat {
        radix: Radix::Hex,
        bit_size: Some(32),
    };

    /// Render an integer in this format.
    pub fn render(&self, value: u64) -> String {
        match self.radix {
            Radix::Dec => value.to_string(),
            Radix::Hex => {
                let width = self
                    .bit_size
                    .map(|b| b.min(MAX_BIT_SIZE).div_ceil(4) as usize)
                    .unwrap_or(0);
                format!("0x{value:0width$X}")
            }
        }
    }
}

/// One configuration option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigOption {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub default: ConfigValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_format: Option<DisplayFormat>,
}

impl ConfigOption {
    pub fn new(name: impl Into<String>, default: ConfigValue) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            default,
            display_format: None,
        }
    }

    /// Default value rendered with the option's display format.
    pub fn render_default(&self) -> String {
        match (&self.default, self.display_format) {
            (ConfigValue::Integer(i), Some(fmt)) if *i >= 0 => fmt.render(*i as u64),
            (value, _) => value.to_string(),
        }
    }
}

/// Module-level (static) block: options that exist once per module rather
/// than once per instance, plus free-form attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StaticBlock {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<ConfigOption>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, ConfigValue>,
}

/// An output template a module asks the generation engine to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TemplateSpec {
    /// Template identifier (e.g. "/ti/display/Display.Board.c.xdt").
    pub template: String,
    /// Output path relative to the generated-files directory.
    pub output: String,
    /// Run even when the module has no instances.
    #[serde(default)]
    pub always_run: bool,
}

/// One library in a link specification.
///
/// Written either as a bare name or as a table whose library is linked
/// only when another module is (or is not) part of the configuration:
///
/// ```toml
/// libraries = ["maclib_sm", { name = "maclib_osal", unless-module = "/ti/dmm/dmm" }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LibraryEntry {
    Plain(String),
    Conditional(ConditionalLibrary),
}

/// A library gated on the presence of other modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConditionalLibrary {
    pub name: String,
    /// Link only when this module is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_module: Option<String>,
    /// Link only when this module is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unless_module: Option<String>,
}

impl LibraryEntry {
    /// Library base name.
    pub fn name(&self) -> &str {
        match self {
            LibraryEntry::Plain(name) => name,
            LibraryEntry::Conditional(c) => &c.name,
        }
    }

    /// Whether the library is linked, given which modules are present.
    pub fn applies(&self, present: impl Fn(&str) -> bool) -> bool {
        match self {
            LibraryEntry::Plain(_) => true,
            LibraryEntry::Conditional(c) => {
                let wanted = c.when_module.as_deref().map_or(true, &present);
                let excluded = c.unless_module.as_deref().is_some_and(&present);
                wanted && !excluded
            }
        }
    }

    /// Module names the entry's conditions refer to.
    pub fn conditions(&self) -> impl Iterator<Item = &str> {
        let (when, unless) = match self {
            LibraryEntry::Plain(_) => (None, None),
            LibraryEntry::Conditional(c) => (c.when_module.as_deref(), c.unless_module.as_deref()),
        };
        when.into_iter().chain(unless)
    }
}

impl From<&str> for LibraryEntry {
    fn from(name: &str) -> Self {
        LibraryEntry::Plain(name.to_string())
    }
}

impl fmt::Display for LibraryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryEntry::Plain(name) => f.write_str(name),
            LibraryEntry::Conditional(c) => {
                f.write_str(&c.name)?;
                if let Some(m) = &c.when_module {
                    write!(f, " (with {m})")?;
                }
                if let Some(m) = &c.unless_module {
                    write!(f, " (without {m})")?;
                }
                Ok(())
            }
        }
    }
}

/// Libraries a module contributes to the linker command file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinkSpec {
    /// Package root containing `lib/` (defaults to the module name without
    /// its leading slash and last segment).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// Library base names; family, kernel, and secure suffixes are appended.
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    /// Modules whose libraries this one depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    /// Append the kernel suffix (`_freertos`, `_tirtos7`).
    #[serde(default)]
    pub rtos_suffix: bool,
}

/// Context attribute used to select a variant implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariantSource {
    Family,
    DriverFamily,
    Isa,
    Rtos,
}

impl VariantSource {
    /// Derive the variant key for `ctx`.
    pub fn key_for(self, ctx: &DeviceContext) -> String {
        match self {
            VariantSource::Family => ctx.family.clone(),
            VariantSource::DriverFamily => ctx.driver_family.clone(),
            VariantSource::Isa => ctx.isa.to_string(),
            VariantSource::Rtos => ctx.rtos.to_string(),
        }
    }
}

/// A module descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleDescriptor {
    /// Unique path-like name (e.g. "/ti/drivers/DMA").
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Semantic version of the module's libraries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,
    /// Devices the module supports. Required: there is no implicit default.
    pub support: SupportRule,
    /// Kernels the module supports; empty means any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rtos: Vec<RtosKind>,
    /// Only active when the user has added it to the configuration.
    #[serde(default)]
    pub opt_in: bool,
    /// Co-requisite modules that must be active.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    /// Establishes TrustZone secure/non-secure partitioning when active.
    #[serde(default)]
    pub secure_partition: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_key: Option<VariantSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<ConfigOption>,
    #[serde(default, rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_block: Option<StaticBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<TemplateSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkSpec>,
    /// Named integer constants embedded into generated headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constants: BTreeMap<String, u64>,
}

impl ModuleDescriptor {
    /// A descriptor with only a name and support rule set.
    pub fn new(name: impl Into<String>, support: SupportRule) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: None,
            version: None,
            max_instances: None,
            support,
            rtos: Vec::new(),
            opt_in: false,
            requires: Vec::new(),
            secure_partition: false,
            variant_key: None,
            config: Vec::new(),
            static_block: None,
            templates: Vec::new(),
            link: None,
            constants: BTreeMap::new(),
        }
    }

    /// Whether the module supports `rtos`.
    pub fn supports_rtos(&self, rtos: RtosKind) -> bool {
        self.rtos.is_empty() || self.rtos.contains(&rtos)
    }

    /// Look up a per-instance option by name.
    pub fn option(&self, name: &str) -> Option<&ConfigOption> {
        self.config.iter().find(|o| o.name == name)
    }

    /// Package root for library paths.
    ///
    /// `/ti/display/Display` becomes `ti/display`.
    pub fn package_root(&self) -> String {
        if let Some(root) = self.link.as_ref().and_then(|l| l.root.clone()) {
            return root;
        }
        let trimmed = self.name.trim_start_matches('/');
        match trimmed.rsplit_once('/') {
            Some((parent, _)) => parent.to_string(),
            None => trimmed.to_string(),
        }
    }

    /// Name shown to users; falls back to the last path segment.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| self.name.rsplit('/').next().unwrap_or(&self.name))
    }
}
