//! `sdkcfg check` — validate the catalog and device database.

use anyhow::{bail, Result};
use sdkcfg_catalog::ModuleRegistry;
use sdkcfg_device::{DeviceDatabase, SupportRule};
use sdkcfg_resolve::gate::evaluation_order;
use sdkcfg_resolve::Candidate;

use super::resolve::{merge_target, resolve_target, ResolveArgs};
use super::Sources;

/// One finding from a check run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Finding {
    pub severity: &'static str,
    pub message: String,
}

impl Finding {
    fn error(message: String) -> Self {
        Self {
            severity: "error",
            message,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            severity: "warning",
            message,
        }
    }
}

pub fn run(sources: &Sources) -> Result<()> {
    println!("=== sdkcfg check ===");
    println!();

    let registry = sources.registry()?;
    println!("Catalog: {} modules", registry.len());
    let database = sources.devices()?;
    println!("Device database: {} families", database.entries.len());

    let mut findings = check_database(&database);
    findings.extend(check_catalog(&registry)?);

    if let Some(manifest) = &sources.manifest {
        if manifest.target.device.is_some() {
            let target = merge_target(sources, &ResolveArgs::default())?;
            match resolve_target(sources, &registry, &target) {
                Ok(builds) => {
                    for build in &builds {
                        println!(
                            "Project target {}: {} active modules",
                            build.device.device_id,
                            build.modules.len()
                        );
                    }
                }
                Err(e) => findings.push(Finding::error(format!("project target: {e:#}"))),
            }
        }
    }

    println!();
    for f in &findings {
        println!("  {}: {}", f.severity, f.message);
    }
    let errors = findings.iter().filter(|f| f.severity == "error").count();
    let warnings = findings.len() - errors;
    println!("{errors} errors, {warnings} warnings");

    if errors > 0 {
        bail!("check failed with {errors} errors");
    }
    Ok(())
}

pub(crate) fn check_database(database: &DeviceDatabase) -> Vec<Finding> {
    match database.validate() {
        Ok(()) => Vec::new(),
        Err(issues) => issues
            .into_iter()
            .map(|i| Finding {
                severity: i.severity,
                message: format!("device database: {}", i.message),
            })
            .collect(),
    }
}

/// Device-independent catalog checks: co-requisite cycles and references
/// to modules the catalog does not define.
pub(crate) fn check_catalog(registry: &ModuleRegistry) -> Result<Vec<Finding>> {
    let mut findings = Vec::new();

    let mut candidates = Vec::with_capacity(registry.len());
    for manifest in registry.iter() {
        candidates.push(Candidate {
            descriptor: manifest.module.clone(),
            variant: None,
            rule: manifest.module.support.compile()?,
        });
        for fragment in manifest.variants.values() {
            for dep in &fragment.requires {
                if !manifest.module.requires.contains(dep) && !registry.contains(dep) {
                    findings.push(Finding::warning(format!(
                        "{} variant requires '{dep}', which is not in the catalog",
                        manifest.name()
                    )));
                }
            }
        }
    }

    if let Err(e) = evaluation_order(&candidates) {
        findings.push(Finding::error(e.to_string()));
    }

    for manifest in registry.iter() {
        let module = &manifest.module;
        for dep in &module.requires {
            if !registry.contains(dep) {
                findings.push(Finding::warning(format!(
                    "{} requires '{dep}', which is not in the catalog; it must be added by the user",
                    module.name
                )));
            }
        }
        if let Some(link) = &module.link {
            for dep in &link.deps {
                if !registry.contains(dep) {
                    findings.push(Finding::error(format!(
                        "{} links against '{dep}', which is not in the catalog",
                        module.name
                    )));
                }
            }
            for library in &link.libraries {
                for condition in library.conditions().filter(|c| !registry.contains(c)) {
                    findings.push(Finding::warning(format!(
                        "{} library '{}' depends on '{condition}', which is not in the catalog",
                        module.name,
                        library.name()
                    )));
                }
            }
        }
        if module.support == SupportRule::none() {
            findings.push(Finding::warning(format!(
                "{} supports no devices and is never active",
                module.name
            )));
        }
    }

    Ok(findings)
}
