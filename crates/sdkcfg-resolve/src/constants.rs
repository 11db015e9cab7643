//! Derived numeric constants for generated headers.

use std::collections::BTreeMap;

use sdkcfg_catalog::ModuleDescriptor;
use sdkcfg_device::DeviceContext;

use crate::error::{ConfigError, Result};

/// Non-secure image base, emitted when TrustZone partitioning is active.
pub const FLASH_VECTOR_TABLE_ADDRESS: &str = "FLASH_VECTOR_TABLE_ADDRESS";
/// Set to 1 when TrustZone partitioning is active.
pub const TFM_ENABLED: &str = "TFM_ENABLED";

/// Owner recorded for constants the run derives itself.
const DERIVED: &str = "<device>";

/// Accumulates constants and remembers which module set each one.
#[derive(Debug, Default)]
pub struct ConstantTable {
    values: BTreeMap<String, (u64, String)>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name = value` for `owner`. Re-setting the same value is a
    /// no-op; a different value is a conflict.
    pub fn insert(&mut self, name: &str, value: u64, owner: &str) -> Result<()> {
        match self.values.get(name) {
            Some((existing, first)) if *existing != value => Err(ConfigError::ConflictingConstant {
                name: name.to_string(),
                first: first.clone(),
                first_value: *existing,
                second: owner.to_string(),
                second_value: value,
            }),
            Some(_) => Ok(()),
            None => {
                self.values.insert(name.to_string(), (value, owner.to_string()));
                Ok(())
            }
        }
    }

    pub fn into_map(self) -> BTreeMap<String, u64> {
        self.values.into_iter().map(|(k, (v, _))| (k, v)).collect()
    }
}

/// Derive the run's constants from the context and the active modules.
pub fn derive<'a>(
    ctx: &DeviceContext,
    secure: bool,
    modules: impl IntoIterator<Item = &'a ModuleDescriptor>,
) -> Result<BTreeMap<String, u64>> {
    let mut table = ConstantTable::new();

    if let (true, Some(base)) = (secure, ctx.ns_vector_table) {
        table.insert(FLASH_VECTOR_TABLE_ADDRESS, base, DERIVED)?;
        table.insert(TFM_ENABLED, 1, DERIVED)?;
    }

    for module in modules {
        for (name, value) in &module.constants {
            table.insert(name, *value, &module.name)?;
        }
    }
    Ok(table.into_map())
}
