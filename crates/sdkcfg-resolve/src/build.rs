//! The build descriptor: the complete output of one resolution run.

use std::collections::BTreeMap;

use sdkcfg_device::{DeviceContext, Isa, RtosKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::gate::ModuleGate;
use crate::link::LinkDescriptor;
use crate::templates::TemplateContribution;

/// The target a build descriptor was resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceSummary {
    pub device_id: String,
    pub family: String,
    pub driver_family: String,
    pub isa: Isa,
    pub rtos: RtosKind,
    pub toolchain: String,
    pub secure: bool,
}

impl DeviceSummary {
    pub fn new(ctx: &DeviceContext, toolchain: String, secure: bool) -> Self {
        Self {
            device_id: ctx.device_id.clone(),
            family: ctx.family.clone(),
            driver_family: ctx.driver_family.clone(),
            isa: ctx.isa,
            rtos: ctx.rtos,
            toolchain,
            secure,
        }
    }
}

/// An active module as it appears in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedModule {
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Everything the generation engine needs for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildDescriptor {
    pub device: DeviceSummary,
    /// Active modules in activation order.
    pub modules: Vec<ResolvedModule>,
    pub links: Vec<LinkDescriptor>,
    pub templates: Vec<TemplateContribution>,
    pub constants: BTreeMap<String, u64>,
    /// Per-module gate decisions, for diagnostics only.
    #[serde(skip)]
    pub gates: Vec<ModuleGate>,
}

impl BuildDescriptor {
    /// Whether `module` is in the resolved set.
    pub fn is_active(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m.name == module)
    }

    /// All library paths, in link order.
    pub fn libraries(&self) -> impl Iterator<Item = &str> {
        self.links
            .iter()
            .flat_map(|l| l.libraries.iter().map(String::as_str))
    }

    /// Pretty JSON with stable field order and key-ordered maps.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// SHA-256 of the JSON form, as lowercase hex.
    pub fn fingerprint(&self) -> serde_json::Result<String> {
        let json = serde_json::to_vec(self)?;
        let digest = Sha256::digest(&json);
        Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
    }
}
