//! `sdkcfg device` — inspect the device database.

use anyhow::{Context, Result};
use sdkcfg_catalog::ModuleRegistry;
use sdkcfg_device::{DeviceAttributeSource, DeviceAttributes};

use super::Sources;

/// List every family entry in the active device database.
pub fn list(sources: &Sources) -> Result<()> {
    let db = sources.devices()?;
    println!("Device families:");
    for entry in &db.entries {
        let secure = if entry.ns_vector_table.is_some() { "  trustzone" } else { "" };
        println!(
            "  {:<10} {:<7} {:<5} {}{secure}",
            entry.family,
            entry.driver_family,
            entry.isa.to_string(),
            entry.support
        );
    }
    Ok(())
}

/// Show the attributes of one device and the catalog modules it supports.
pub fn describe(sources: &Sources, device_id: &str, format: Option<&str>) -> Result<()> {
    let db = sources.devices()?;
    let attrs = db
        .attributes(device_id)
        .with_context(|| format!("looking up device '{device_id}'"))?;

    if format == Some("toml") {
        print!("{}", toml::to_string_pretty(&attrs).context("serializing attributes")?);
        return Ok(());
    }

    print!("{}", format_attributes(&attrs));

    match sources.registry() {
        Ok(registry) => {
            let modules = supported_modules(&registry, &attrs.device_id)?;
            println!("\nCatalog modules matching this device ({}):", modules.len());
            for name in modules {
                println!("  {name}");
            }
        }
        Err(e) => tracing::warn!("catalog not loaded: {e:#}"),
    }
    Ok(())
}

fn format_attributes(attrs: &DeviceAttributes) -> String {
    let mut out = format!("Device: {}\n", attrs.device_id);
    out.push_str(&format!("  Family:         {}\n", attrs.family));
    out.push_str(&format!("  Driver family:  {}\n", attrs.driver_family));
    out.push_str(&format!("  ISA:            {}\n", attrs.isa));
    match attrs.ns_vector_table {
        Some(addr) => out.push_str(&format!("  TrustZone:      yes (NS vector table 0x{addr:08X})\n")),
        None => out.push_str("  TrustZone:      no\n"),
    }
    out
}

/// Names of registry modules whose support rule matches `device_id`.
fn supported_modules(registry: &ModuleRegistry, device_id: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for manifest in registry.iter() {
        if manifest.module.support.compile()?.matches(device_id) {
            names.push(manifest.name().to_string());
        }
    }
    Ok(names)
}
