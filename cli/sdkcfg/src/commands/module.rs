//! `sdkcfg module` — browse catalog descriptors.

use std::fmt::Write;

use anyhow::{Context, Result};
use sdkcfg_catalog::{ModuleDescriptor, ModuleManifest};
use sdkcfg_device::{DeviceContext, RtosKind};

use super::Sources;

/// List catalog modules, optionally filtered by name.
pub fn list(sources: &Sources, query: Option<&str>) -> Result<()> {
    let registry = sources.registry()?;
    let results = registry.search(query.unwrap_or(""));
    if results.is_empty() {
        println!("No modules found.");
        return Ok(());
    }
    for r in &results {
        let version = r.version.as_deref().unwrap_or("-");
        let description = r.description.as_deref().unwrap_or("");
        println!("  {:<36} {version:<8} {description}", r.name);
    }
    println!("\n{} modules", results.len());
    Ok(())
}

/// Show one module. With a device, the variant for that device is merged
/// in first.
pub fn show(
    sources: &Sources,
    name: &str,
    device: Option<&str>,
    rtos: Option<RtosKind>,
    format: Option<&str>,
) -> Result<()> {
    let registry = sources.registry()?;
    let manifest = registry.require(name)?;

    let (descriptor, variant) = match device {
        Some(id) => {
            let ctx = DeviceContext::from_source(
                &sources.devices()?,
                id,
                rtos.unwrap_or_default(),
                std::iter::empty::<String>(),
            )
            .with_context(|| format!("looking up device '{id}'"))?;
            let candidate = sdkcfg_resolve::prepare(manifest, &ctx)?;
            (candidate.descriptor, candidate.variant)
        }
        None => (manifest.module.clone(), None),
    };

    if format == Some("toml") {
        let shown = ModuleManifest::from_descriptor(descriptor);
        print!("{}", shown.to_toml()?);
        return Ok(());
    }

    print!("{}", format_module(&descriptor, manifest, variant.as_deref()));
    Ok(())
}

fn format_module(d: &ModuleDescriptor, manifest: &ModuleManifest, variant: Option<&str>) -> String {
    let mut out = format!("Module: {}\n", d.name);
    let _ = writeln!(out, "  Label:        {}", d.label());
    if let Some(desc) = &d.description {
        let _ = writeln!(out, "  Description:  {desc}");
    }
    if let Some(version) = &d.version {
        let _ = writeln!(out, "  Version:      {version}");
    }
    let _ = writeln!(out, "  Support:      {}", d.support);
    if !d.rtos.is_empty() {
        let kernels: Vec<_> = d.rtos.iter().map(|r| r.as_str()).collect();
        let _ = writeln!(out, "  RTOS:         {}", kernels.join(", "));
    }
    if d.opt_in {
        out.push_str("  Opt-in:       yes\n");
    }
    if d.secure_partition {
        out.push_str("  Partitions:   secure/non-secure\n");
    }
    if let Some(max) = d.max_instances {
        let _ = writeln!(out, "  Instances:    at most {max}");
    }
    if !d.requires.is_empty() {
        let _ = writeln!(out, "  Requires:     {}", d.requires.join(", "));
    }
    if !manifest.variants.is_empty() {
        let keys: Vec<&str> = manifest.variants.keys().map(String::as_str).collect();
        let _ = write!(out, "  Variants:     {}", keys.join(", "));
        if let Some(v) = variant {
            let _ = write!(out, " (selected: {v})");
        }
        out.push('\n');
    }

    if !d.config.is_empty() {
        out.push_str("\n  Options:\n");
        for option in &d.config {
            let _ = writeln!(out, "    {:<28} {}", option.name, option.render_default());
        }
    }
    if let Some(block) = &d.static_block {
        if !block.config.is_empty() || !block.attributes.is_empty() {
            out.push_str("\n  Static:\n");
            for option in &block.config {
                let _ = writeln!(out, "    {:<28} {}", option.name, option.render_default());
            }
            for (name, value) in &block.attributes {
                let _ = writeln!(out, "    {name:<28} {value}");
            }
        }
    }
    if !d.templates.is_empty() {
        out.push_str("\n  Templates:\n");
        for t in &d.templates {
            let always = if t.always_run { "  (always)" } else { "" };
            let _ = writeln!(out, "    {} -> {}{always}", t.template, t.output);
        }
    }
    if let Some(link) = &d.link {
        out.push_str("\n  Link:\n");
        let _ = writeln!(out, "    root:       {}", d.package_root());
        let libraries: Vec<String> = link.libraries.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "    libraries:  {}", libraries.join(", "));
        if !link.deps.is_empty() {
            let _ = writeln!(out, "    deps:       {}", link.deps.join(", "));
        }
        if link.rtos_suffix {
            out.push_str("    rtos-suffix: yes\n");
        }
    }
    if !d.constants.is_empty() {
        out.push_str("\n  Constants:\n");
        for (name, value) in &d.constants {
            let _ = writeln!(out, "    {name} = {value}");
        }
    }
    out
}
