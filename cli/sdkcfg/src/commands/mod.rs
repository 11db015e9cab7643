//! CLI command implementations.

pub mod check;
pub mod device;
pub mod init;
pub mod module;
pub mod resolve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sdkcfg_catalog::ModuleRegistry;
use sdkcfg_device::DeviceDatabase;

use crate::manifest::SdkcfgManifest;

/// Catalog and device database locations for one invocation.
///
/// Command-line paths win over the project manifest; without either the
/// `catalog/` directory next to the manifest (or cwd) is used.
#[derive(Debug)]
pub struct Sources {
    pub manifest: Option<SdkcfgManifest>,
    pub project_dir: PathBuf,
    pub catalog_paths: Vec<PathBuf>,
    pub devices_path: Option<PathBuf>,
}

impl Sources {
    pub fn new(
        manifest: Option<SdkcfgManifest>,
        project_dir: PathBuf,
        catalog_flags: Vec<PathBuf>,
        devices_flag: Option<PathBuf>,
    ) -> Self {
        let catalog_paths = if !catalog_flags.is_empty() {
            catalog_flags
        } else if let Some(m) = &manifest {
            m.catalog_paths(&project_dir)
        } else {
            vec![project_dir.join("catalog")]
        };
        let devices_path = devices_flag.or_else(|| {
            manifest
                .as_ref()
                .and_then(|m| m.catalog.devices.as_ref())
                .map(|d| project_dir.join(d))
        });
        Self {
            manifest,
            project_dir,
            catalog_paths,
            devices_path,
        }
    }

    /// Load every descriptor from the catalog paths.
    pub fn registry(&self) -> Result<ModuleRegistry> {
        let registry = ModuleRegistry::load_paths(&self.catalog_paths).with_context(|| {
            format!("loading catalog from {}", display_paths(&self.catalog_paths))
        })?;
        tracing::debug!(modules = registry.len(), "catalog loaded");
        Ok(registry)
    }

    /// The device database override, or the built-in table.
    pub fn devices(&self) -> Result<DeviceDatabase> {
        match &self.devices_path {
            Some(path) => DeviceDatabase::load(path)
                .with_context(|| format!("loading device database {}", path.display())),
            None => Ok(DeviceDatabase::builtin()),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a `--format` value.
pub(crate) fn parse_format(format: Option<&str>) -> Result<OutputFormat> {
    match format.unwrap_or("human") {
        "human" => Ok(OutputFormat::Human),
        "json" => Ok(OutputFormat::Json),
        other => anyhow::bail!("unknown format '{other}' (expected human or json)"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Human,
    Json,
}

/// Write `contents` to `path`, creating parent directories.
pub(crate) fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}
