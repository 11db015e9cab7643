//! Resolution runs: one device context in, one build descriptor out.
//!
//! A run prepares every registry module for the context (support rule
//! compiled, variant merged when the device matches), gates them
//! dependency-first, then derives links, templates, and constants from the
//! active set. Any error aborts the run with no partial output.

use std::collections::BTreeSet;
use std::thread;

use sdkcfg_catalog::{ModuleManifest, ModuleRegistry};
use sdkcfg_device::{DeviceContext, ToolchainResolver};

use crate::build::{BuildDescriptor, DeviceSummary, ResolvedModule};
use crate::constants;
use crate::error::{ConfigError, Result};
use crate::gate::{self, Candidate};
use crate::link::{build_link_descriptor, check_links, is_secure_capable, LinkTarget};
use crate::templates;

/// Prepare one registry module for `ctx`.
///
/// The variant is merged only when the device and RTOS are both supported;
/// a module that cannot be active needs no implementation for this target.
pub fn prepare(manifest: &ModuleManifest, ctx: &DeviceContext) -> Result<Candidate> {
    let support = &manifest.module.support;
    let rule = support.compile().map_err(|e| ConfigError::AmbiguousRule {
        device_id: ctx.device_id.clone(),
        module: manifest.name().to_string(),
        rule: support.to_string(),
        detail: e.to_string(),
    })?;

    if !rule.matches(&ctx.device_id) || !manifest.module.supports_rtos(ctx.rtos) {
        return Ok(Candidate {
            descriptor: manifest.module.clone(),
            variant: None,
            rule,
        });
    }

    let (descriptor, variant) = manifest
        .resolve_for(ctx)
        .map_err(|e| ConfigError::from_catalog(e, &ctx.device_id))?;
    Ok(Candidate {
        descriptor,
        variant,
        rule,
    })
}

/// Resolve `registry` for one device context.
pub fn resolve(
    registry: &ModuleRegistry,
    ctx: &DeviceContext,
    toolchain: &dyn ToolchainResolver,
) -> Result<BuildDescriptor> {
    let candidates = registry
        .iter()
        .map(|m| prepare(m, ctx))
        .collect::<Result<Vec<_>>>()?;

    let activation = gate::evaluate(ctx, &candidates)?;
    let active: Vec<&Candidate> = activation.active.iter().map(|&i| &candidates[i]).collect();
    let partitioned = active.iter().find(|c| c.descriptor.secure_partition);
    let secure = partitioned.is_some() && is_secure_capable(ctx);
    if let (Some(module), false) = (partitioned, secure) {
        tracing::warn!(
            device = %ctx.device_id,
            module = module.name(),
            "device has no non-secure vector table; building without TrustZone partitioning"
        );
    }

    let present = active
        .iter()
        .map(|c| c.name())
        .chain(
            ctx.enabled_modules
                .iter()
                .map(String::as_str)
                .filter(|m| !registry.contains(m)),
        );
    let target = LinkTarget::new(ctx, toolchain, secure).with_modules(present);
    let links: Vec<_> = active
        .iter()
        .filter_map(|c| {
            c.descriptor
                .link
                .as_ref()
                .map(|spec| build_link_descriptor(&c.descriptor, spec, &target))
        })
        .collect();
    let resolved: BTreeSet<&str> = active.iter().map(|c| c.name()).collect();
    check_links(&links, &resolved, &ctx.device_id)?;

    let templates = templates::collect(active.iter().map(|c| &c.descriptor));
    let constants = constants::derive(ctx, secure, active.iter().map(|c| &c.descriptor))?;

    let modules = active
        .iter()
        .map(|c| ResolvedModule {
            name: c.descriptor.name.clone(),
            label: c.descriptor.label().to_string(),
            variant: c.variant.clone(),
            version: c.descriptor.version.clone(),
        })
        .collect::<Vec<_>>();

    tracing::info!(
        device = %ctx.device_id,
        rtos = %ctx.rtos,
        active = modules.len(),
        registry = registry.len(),
        libraries = links.iter().map(|l| l.libraries.len()).sum::<usize>(),
        templates = templates.len(),
        secure,
        "resolved configuration"
    );

    Ok(BuildDescriptor {
        device: DeviceSummary::new(ctx, target.toolchain_dir, secure),
        modules,
        links,
        templates,
        constants,
        gates: activation.decisions,
    })
}

/// Resolve several contexts concurrently against one registry.
///
/// Results are returned in input order; each run succeeds or fails on
/// its own.
pub fn resolve_batch(
    registry: &ModuleRegistry,
    contexts: &[DeviceContext],
    toolchain: &(dyn ToolchainResolver + Sync),
) -> Vec<Result<BuildDescriptor>> {
    thread::scope(|scope| {
        let handles: Vec<_> = contexts
            .iter()
            .map(|ctx| scope.spawn(move || resolve(registry, ctx, toolchain)))
            .collect();
        handles
            .into_iter()
            .zip(contexts)
            .map(|(handle, ctx)| {
                handle.join().unwrap_or_else(|panic| {
                    tracing::error!(device = %ctx.device_id, "resolution thread panicked");
                    std::panic::resume_unwind(panic)
                })
            })
            .collect()
    })
}
