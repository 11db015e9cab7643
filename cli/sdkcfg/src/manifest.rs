//! `sdkcfg.toml` project manifest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sdkcfg_device::{RtosKind, Toolchain};
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "sdkcfg.toml";

/// The top-level manifest structure for an sdkcfg project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkcfgManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Default target for `sdkcfg resolve`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub rtos: Option<RtosKind>,
    #[serde(default)]
    pub toolchain: Option<Toolchain>,
}

/// Modules the user has added to the configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModulesConfig {
    #[serde(default)]
    pub enabled: Vec<String>,
}

/// Where descriptors and the device database come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog directories, relative to the project root.
    #[serde(default = "default_catalog_paths")]
    pub paths: Vec<String>,
    /// Device database override; the built-in table is used when absent.
    #[serde(default)]
    pub devices: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            paths: default_catalog_paths(),
            devices: None,
        }
    }
}

fn default_catalog_paths() -> Vec<String> {
    vec!["catalog".to_string()]
}

/// Output section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "generated".to_string()
}

impl SdkcfgManifest {
    /// Search upward from `start_dir` for an `sdkcfg.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: SdkcfgManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing sdkcfg.toml")
    }

    /// Catalog directories resolved against `project_dir`.
    pub fn catalog_paths(&self, project_dir: &Path) -> Vec<PathBuf> {
        self.catalog
            .paths
            .iter()
            .map(|p| project_dir.join(p))
            .collect()
    }

    /// Generate the default manifest for `sdkcfg init`.
    pub fn template(name: &str, device: &str) -> String {
        format!(
            r#"[project]
name = "{name}"
version = "0.1.0"

[target]
device = "{device}"
rtos = "freertos"
toolchain = "ticlang"

[modules]
enabled = []

[catalog]
paths = ["catalog"]

[output]
dir = "generated"
"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let toml_str = r#"
[project]
name = "sidewalk-demo"
version = "1.2.0"
description = "Sidewalk end node"

[target]
device = "CC1352P7RGZ"
rtos = "none-selected"
toolchain = "gcc"

[modules]
enabled = ["/ti/display/Display", "/ti/drivers/UART2"]

[catalog]
paths = ["catalog", "vendor/catalog"]
devices = "devices.toml"

[output]
dir = "out"
"#;
        let manifest = SdkcfgManifest::from_str(toml_str).unwrap();
        assert_eq!(manifest.project.name, "sidewalk-demo");
        assert_eq!(manifest.target.device.as_deref(), Some("CC1352P7RGZ"));
        assert_eq!(manifest.target.rtos, Some(RtosKind::NoneSelected));
        assert_eq!(manifest.target.toolchain, Some(Toolchain::Gcc));
        assert_eq!(manifest.modules.enabled.len(), 2);
        assert_eq!(
            manifest.catalog_paths(Path::new("/p")),
            vec![PathBuf::from("/p/catalog"), PathBuf::from("/p/vendor/catalog")]
        );
        assert_eq!(manifest.output.dir, "out");
    }

    #[test]
    fn parse_minimal_manifest() {
        let manifest = SdkcfgManifest::from_str("[project]\nname = \"minimal\"\n").unwrap();
        assert_eq!(manifest.project.version, "0.1.0");
        assert!(manifest.target.device.is_none());
        assert!(manifest.modules.enabled.is_empty());
        assert_eq!(manifest.catalog.paths, vec!["catalog"]);
        assert!(manifest.catalog.devices.is_none());
        assert_eq!(manifest.output.dir, "generated");
    }

    #[test]
    fn reject_unknown_rtos() {
        let toml_str = "[project]\nname = \"x\"\n[target]\nrtos = \"zephyr\"\n";
        assert!(SdkcfgManifest::from_str(toml_str).is_err());
    }

    #[test]
    fn template_round_trips() {
        let manifest = SdkcfgManifest::from_str(&SdkcfgManifest::template("demo", "CC2340R5RKP")).unwrap();
        assert_eq!(manifest.project.name, "demo");
        assert_eq!(manifest.target.device.as_deref(), Some("CC2340R5RKP"));
        assert_eq!(manifest.target.rtos, Some(RtosKind::FreeRtos));
        assert_eq!(manifest.target.toolchain, Some(Toolchain::Ticlang));
    }

    #[test]
    fn find_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            SdkcfgManifest::template("walk", "CC1352P7RGZ"),
        )
        .unwrap();
        let nested = dir.path().join("src/app");
        std::fs::create_dir_all(&nested).unwrap();
        let (manifest, found) = SdkcfgManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(manifest.project.name, "walk");
        assert_eq!(found, dir.path());
    }
}
