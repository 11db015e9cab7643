//! Library/link descriptors.
//!
//! Library paths have the form
//! `<root>/lib/<toolchain>/<isa>/<library>_<family>[<rtos>][_ns].a`.
//! Construction is pure string formatting; whether the file exists is the
//! generation engine's concern.

use std::collections::{BTreeSet, HashMap};

use sdkcfg_catalog::{LibraryEntry, LinkSpec, ModuleDescriptor};
use sdkcfg_device::{DeviceContext, Isa, RtosKind, ToolchainResolver};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Version reported for modules that do not declare one.
pub const DEFAULT_LIBRARY_VERSION: &str = "1.0.0";

/// Whether the device has a secure/non-secure library split.
///
/// Devices whose database entry carries a non-secure vector table base run
/// TrustZone and ship `_ns` library builds.
pub fn is_secure_capable(ctx: &DeviceContext) -> bool {
    ctx.ns_vector_table.is_some()
}

/// Everything that shapes a library path besides the module itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub family: String,
    pub isa: Isa,
    pub toolchain_dir: String,
    pub rtos: RtosKind,
    /// TrustZone partitioning is active for this build.
    pub secure: bool,
    /// The device ships non-secure library builds.
    pub trustzone: bool,
    /// Modules present in the configuration, for conditional libraries.
    pub present: BTreeSet<String>,
}

impl LinkTarget {
    pub fn new(ctx: &DeviceContext, toolchain: &dyn ToolchainResolver, secure: bool) -> Self {
        Self {
            family: ctx.family.clone(),
            isa: ctx.isa,
            toolchain_dir: toolchain.toolchain_dir(),
            rtos: ctx.rtos,
            secure,
            trustzone: is_secure_capable(ctx),
            present: BTreeSet::new(),
        }
    }

    /// Record modules present in the configuration.
    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.present.extend(modules.into_iter().map(Into::into));
        self
    }

    /// Libraries resolve to their non-secure build.
    pub fn non_secure(&self) -> bool {
        self.secure && self.trustzone
    }

    /// Whether `entry` is linked in this configuration.
    pub fn links(&self, entry: &LibraryEntry) -> bool {
        entry.applies(|module| self.present.contains(module))
    }
}

/// Libraries one module contributes, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinkDescriptor {
    pub module: String,
    pub libraries: Vec<String>,
    pub version: String,
    pub deps: Vec<String>,
}

/// Format one library path.
pub fn library_path(root: &str, library: &str, target: &LinkTarget, rtos_suffix: bool) -> String {
    let mut file = format!("{library}_{}", target.family);
    if rtos_suffix {
        file.push_str(target.rtos.lib_suffix());
    }
    if target.non_secure() {
        file.push_str("_ns");
    }
    format!(
        "{root}/lib/{}/{}/{file}.a",
        target.toolchain_dir,
        target.isa.dir_name()
    )
}

/// Build the link descriptor for `module` from its link specification.
///
/// Conditional libraries are kept only when their module conditions hold
/// against `target.present`.
pub fn build_link_descriptor(module: &ModuleDescriptor, spec: &LinkSpec, target: &LinkTarget) -> LinkDescriptor {
    let root = spec.root.clone().unwrap_or_else(|| module.package_root());
    LinkDescriptor {
        module: module.name.clone(),
        libraries: spec
            .libraries
            .iter()
            .filter(|entry| target.links(entry))
            .map(|entry| library_path(&root, entry.name(), target, spec.rtos_suffix))
            .collect(),
        version: module
            .version
            .clone()
            .unwrap_or_else(|| DEFAULT_LIBRARY_VERSION.to_string()),
        deps: spec.deps.clone(),
    }
}

/// Check a run's link descriptors against the resolved module set.
///
/// Every dependency must name a resolved module, and no library path may
/// appear twice.
pub fn check_links(links: &[LinkDescriptor], resolved: &BTreeSet<&str>, device_id: &str) -> Result<()> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for link in links {
        if let Some(dep) = link.deps.iter().find(|d| !resolved.contains(d.as_str())) {
            return Err(ConfigError::DanglingDependency {
                device_id: device_id.to_string(),
                module: link.module.clone(),
                dependency: dep.clone(),
            });
        }
        for library in &link.libraries {
            if let Some(first) = owners.insert(library.as_str(), link.module.as_str()) {
                return Err(ConfigError::DuplicateLibrary {
                    device_id: device_id.to_string(),
                    library: library.clone(),
                    first: first.to_string(),
                    second: link.module.clone(),
                });
            }
        }
    }
    Ok(())
}
