//! Per-run device context.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::database::{DeviceAttributeSource, DeviceAttributes};
use crate::error::Result;
use crate::isa::Isa;
use crate::rtos::RtosKind;

/// Everything resolution needs to know about the target, fixed for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceContext {
    pub device_id: String,
    pub family: String,
    pub driver_family: String,
    pub isa: Isa,
    pub rtos: RtosKind,
    pub ns_vector_table: Option<u64>,
    /// Modules the user has already added to the configuration.
    pub enabled_modules: BTreeSet<String>,
}

impl DeviceContext {
    /// Build a context by looking the device up in `source`.
    pub fn from_source<I, S>(
        source: &dyn DeviceAttributeSource,
        device_id: &str,
        rtos: RtosKind,
        enabled_modules: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attrs = source.attributes(device_id)?;
        Ok(Self::from_attributes(attrs, rtos, enabled_modules))
    }

    /// Build a context from already-resolved attributes.
    pub fn from_attributes<I, S>(attrs: DeviceAttributes, rtos: RtosKind, enabled_modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            device_id: attrs.device_id,
            family: attrs.family,
            driver_family: attrs.driver_family,
            isa: attrs.isa,
            rtos,
            ns_vector_table: attrs.ns_vector_table,
            enabled_modules: enabled_modules.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `module` was added to the active configuration by the user.
    pub fn has_module(&self, module: &str) -> bool {
        self.enabled_modules.contains(module)
    }
}
