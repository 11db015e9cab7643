//! `sdkcfg init` — project scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use sdkcfg_device::{DeviceAttributeSource, DeviceDatabase};

use crate::manifest::{SdkcfgManifest, MANIFEST_FILE};

/// Device written into new manifests when `--device` is not given.
pub const DEFAULT_DEVICE: &str = "CC1352P7RGZ";

/// Create a new sdkcfg project in the directory `name`, relative to cwd.
pub fn run(name: &str, device: Option<&str>) -> Result<()> {
    create_project(Path::new(name), name, device.unwrap_or(DEFAULT_DEVICE))
}

pub(crate) fn create_project(project_dir: &Path, name: &str, device: &str) -> Result<()> {
    if project_dir.exists() {
        bail!("directory '{}' already exists", project_dir.display());
    }
    DeviceDatabase::builtin()
        .attributes(device)
        .with_context(|| format!("checking device '{device}'"))?;

    fs::create_dir_all(project_dir.join("catalog")).context("creating catalog/ directory")?;
    fs::create_dir_all(project_dir.join("generated")).context("creating generated/ directory")?;

    fs::write(
        project_dir.join(MANIFEST_FILE),
        SdkcfgManifest::template(name, device),
    )
    .context("writing sdkcfg.toml")?;
    fs::write(project_dir.join(".gitignore"), "generated/\n").context("writing .gitignore")?;

    println!("Created project '{name}' for {device}");
    println!("  {name}/{MANIFEST_FILE}");
    println!("  {name}/catalog/");
    println!("  {name}/generated/");
    println!("  {name}/.gitignore");

    Ok(())
}
