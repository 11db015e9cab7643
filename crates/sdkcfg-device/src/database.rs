//! Device attribute database.
//!
//! Maps a device identifier to the attributes resolution keys on: the
//! library family (`cc13x4`), the driver family used for variant dispatch
//! (`CC26XX`), and the core ISA. Entries are tried in order and the first
//! whose support rule matches wins, so more specific patterns (e.g. the
//! `x7` parts) must precede the general ones.
//!
//! Databases are stored as `devices.toml`:
//!
//! ```toml
//! [[family]]
//! support = { devices = [{ pattern = "CC13.4" }] }
//! family = "cc13x4"
//! driver-family = "CC26XX"
//! isa = "m33f"
//! ns-vector-table = 0x38000
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, Result};
use crate::isa::Isa;
use crate::matcher::SupportRule;

/// Read-only lookup of device attributes by identifier.
pub trait DeviceAttributeSource {
    /// Attributes for `device_id`, or [`DeviceError::UnsupportedDevice`].
    fn attributes(&self, device_id: &str) -> Result<DeviceAttributes>;
}

/// Attributes derived for one device identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceAttributes {
    pub device_id: String,
    pub family: String,
    pub driver_family: String,
    pub isa: Isa,
    /// Flash vector table of a TrustZone non-secure image.
    pub ns_vector_table: Option<u64>,
}

/// One row of the device database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FamilyEntry {
    /// Which device identifiers belong to this family.
    pub support: SupportRule,
    /// Library family name (e.g. "cc13x2x7").
    pub family: String,
    /// Driver family used to select driver implementation variants.
    pub driver_family: String,
    /// Core instruction set.
    pub isa: Isa,
    /// Base address of the non-secure image's vector table when the
    /// family is partitioned with TrustZone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ns_vector_table: Option<u64>,
}

impl FamilyEntry {
    fn new(patterns: &str, family: &str, driver_family: &str, isa: Isa) -> Self {
        Self {
            support: SupportRule::patterns([patterns]),
            family: family.into(),
            driver_family: driver_family.into(),
            isa,
            ns_vector_table: None,
        }
    }

    fn with_ns_vector_table(mut self, address: u64) -> Self {
        self.ns_vector_table = Some(address);
        self
    }
}

/// A validation issue found in a device database.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// Ordered family table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDatabase {
    #[serde(rename = "family")]
    pub entries: Vec<FamilyEntry>,
}

/// Non-secure image base on the generation-4 parts when TF-M owns the
/// start of flash.
const GEN4_NS_VECTOR_TABLE: u64 = 0x0003_8000;

impl DeviceDatabase {
    /// The SDK's built-in family dispatch table.
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                FamilyEntry::new("CC13.4", "cc13x4", "CC26XX", Isa::M33f)
                    .with_ns_vector_table(GEN4_NS_VECTOR_TABLE),
                FamilyEntry::new("CC26.4|CC2653", "cc26x4", "CC26XX", Isa::M33f)
                    .with_ns_vector_table(GEN4_NS_VECTOR_TABLE),
                FamilyEntry::new("CC13.2.7", "cc13x2x7", "CC26XX", Isa::M4f),
                FamilyEntry::new("CC26.2.7", "cc26x2x7", "CC26XX", Isa::M4f),
                FamilyEntry::new("CC13.2", "cc13x2", "CC26XX", Isa::M4f),
                FamilyEntry::new("CC26.2", "cc26x2", "CC26XX", Isa::M4f),
                FamilyEntry::new("CC13.1", "cc13x1", "CC26XX", Isa::M4),
                FamilyEntry::new("CC26.1", "cc26x1", "CC26XX", Isa::M4),
                FamilyEntry::new("CC23.0", "cc23x0", "LPF3", Isa::M0p),
                FamilyEntry::new("CC27", "cc27xx", "LPF3", Isa::M33),
            ],
        }
    }

    /// Load a database from a `devices.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DeviceError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a database from a TOML string and reject structural errors.
    pub fn parse(toml_str: &str) -> Result<Self> {
        let db: DeviceDatabase = toml::from_str(toml_str)?;
        if let Err(issues) = db.validate() {
            if let Some(first) = issues.iter().find(|i| i.severity == "error") {
                return Err(DeviceError::Validation {
                    detail: first.message.clone(),
                });
            }
        }
        Ok(db)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check the table for structural problems.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        if self.entries.is_empty() {
            issues.push(ValidationIssue {
                severity: "error",
                message: "device database has no family entries".into(),
            });
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            if entry.family.is_empty() {
                issues.push(ValidationIssue {
                    severity: "error",
                    message: format!("entry with rule {} has an empty family name", entry.support),
                });
            }
            if !seen.insert(entry.family.as_str()) {
                issues.push(ValidationIssue {
                    severity: "error",
                    message: format!("family '{}' is listed more than once", entry.family),
                });
            }
            if let Err(e) = entry.support.compile() {
                issues.push(ValidationIssue {
                    severity: "error",
                    message: format!("family '{}': {e}", entry.family),
                });
            }
            if entry.ns_vector_table.is_some() && !entry.isa.has_trustzone() {
                issues.push(ValidationIssue {
                    severity: "warning",
                    message: format!(
                        "family '{}' declares a non-secure vector table but {} has no TrustZone",
                        entry.family, entry.isa
                    ),
                });
            }
            if entry.ns_vector_table.is_some_and(|a| a > u64::from(u32::MAX)) {
                issues.push(ValidationIssue {
                    severity: "error",
                    message: format!(
                        "family '{}' non-secure vector table is outside the 32-bit address space",
                        entry.family
                    ),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Look up a family entry by family name.
    pub fn family(&self, name: &str) -> Option<&FamilyEntry> {
        self.entries.iter().find(|e| e.family == name)
    }
}

impl Default for DeviceDatabase {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DeviceAttributeSource for DeviceDatabase {
    fn attributes(&self, device_id: &str) -> Result<DeviceAttributes> {
        for entry in &self.entries {
            if entry.support.compile()?.matches(device_id) {
                return Ok(DeviceAttributes {
                    device_id: device_id.to_string(),
                    family: entry.family.clone(),
                    driver_family: entry.driver_family.clone(),
                    isa: entry.isa,
                    ns_vector_table: entry.ns_vector_table,
                });
            }
        }
        Err(DeviceError::UnsupportedDevice {
            device_id: device_id.to_string(),
        })
    }
}
