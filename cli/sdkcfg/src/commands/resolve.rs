//! `sdkcfg resolve` — compute the build descriptor for one or more devices.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use sdkcfg_catalog::ModuleRegistry;
use sdkcfg_device::{DeviceContext, RtosKind, Toolchain};
use sdkcfg_resolve::{format_inactive, format_report, resolve_batch, BuildDescriptor};

use super::{parse_format, write_output, OutputFormat, Sources};

/// File name used by `--write`.
pub const BUILD_FILE: &str = "sdkcfg_build.json";

/// Command-line overrides for one resolve run.
#[derive(Debug, Default, Clone)]
pub struct ResolveArgs {
    pub devices: Vec<String>,
    pub rtos: Option<RtosKind>,
    pub toolchain: Option<Toolchain>,
    pub enable: Vec<String>,
    pub format: Option<String>,
    pub out: Option<PathBuf>,
    pub write: bool,
    pub explain: bool,
}

/// Target settings after merging flags over `[target]` and `[modules]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
    pub devices: Vec<String>,
    pub rtos: RtosKind,
    pub toolchain: Toolchain,
    pub enabled: BTreeSet<String>,
}

pub(crate) fn merge_target(sources: &Sources, args: &ResolveArgs) -> Result<Target> {
    let manifest_target = sources.manifest.as_ref().map(|m| &m.target);

    let devices = if !args.devices.is_empty() {
        args.devices.clone()
    } else if let Some(device) = manifest_target.and_then(|t| t.device.clone()) {
        vec![device]
    } else {
        bail!("no device given (pass --device or set [target] device in sdkcfg.toml)");
    };

    let mut enabled: BTreeSet<String> = sources
        .manifest
        .as_ref()
        .map(|m| m.modules.enabled.iter().cloned().collect())
        .unwrap_or_default();
    enabled.extend(args.enable.iter().cloned());

    Ok(Target {
        devices,
        rtos: args
            .rtos
            .or_else(|| manifest_target.and_then(|t| t.rtos))
            .unwrap_or_default(),
        toolchain: args
            .toolchain
            .or_else(|| manifest_target.and_then(|t| t.toolchain))
            .unwrap_or_default(),
        enabled,
    })
}

/// Resolve every requested device against the catalog.
pub(crate) fn resolve_target(
    sources: &Sources,
    registry: &ModuleRegistry,
    target: &Target,
) -> Result<Vec<BuildDescriptor>> {
    let database = sources.devices()?;
    let contexts = target
        .devices
        .iter()
        .map(|id| {
            DeviceContext::from_source(&database, id, target.rtos, target.enabled.iter().cloned())
                .with_context(|| format!("looking up device '{id}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    resolve_batch(registry, &contexts, &target.toolchain)
        .into_iter()
        .zip(&target.devices)
        .map(|(result, id)| result.with_context(|| format!("resolving modules for {id}")))
        .collect()
}

pub fn run(sources: &Sources, args: &ResolveArgs) -> Result<()> {
    let format = parse_format(args.format.as_deref())?;
    let target = merge_target(sources, args)?;
    let registry = sources.registry()?;
    let builds = resolve_target(sources, &registry, &target)?;

    let rendered = match format {
        OutputFormat::Json => render_json(&builds)?,
        OutputFormat::Human => render_human(&builds, args.explain),
    };

    let mut destinations = Vec::new();
    if let Some(out) = &args.out {
        destinations.push(out.clone());
    }
    if args.write {
        let dir = sources
            .manifest
            .as_ref()
            .map(|m| m.output.dir.as_str())
            .unwrap_or("generated");
        destinations.push(sources.project_dir.join(dir).join(BUILD_FILE));
    }

    if destinations.is_empty() {
        print!("{rendered}");
        return Ok(());
    }
    for path in &destinations {
        write_output(path, &rendered)?;
        println!("Wrote {}", path.display());
    }
    for build in &builds {
        println!("  {:<16} {}", build.device.device_id, build.fingerprint()?);
    }
    Ok(())
}

fn render_json(builds: &[BuildDescriptor]) -> Result<String> {
    let mut json = match builds {
        [single] => single.to_json()?,
        many => serde_json::to_string_pretty(many)?,
    };
    json.push('\n');
    Ok(json)
}

fn render_human(builds: &[BuildDescriptor], explain: bool) -> String {
    let mut out = String::new();
    for (i, build) in builds.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format_report(build));
        if explain {
            let inactive = format_inactive(build);
            if !inactive.is_empty() {
                out.push_str("\ninactive:\n");
                out.push_str(&inactive);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::SdkcfgManifest;

    fn catalog_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../catalog")
    }

    fn sources(manifest: Option<&str>) -> Sources {
        let manifest = manifest.map(|s| SdkcfgManifest::from_str(s).unwrap());
        Sources::new(manifest, PathBuf::from("/project"), vec![catalog_dir()], None)
    }

    const MANIFEST: &str = r#"
[project]
name = "demo"

[target]
device = "CC2674P10RGZ"
rtos = "tirtos7"
toolchain = "gcc"

[modules]
enabled = ["/ti/display/Display"]
"#;

    #[test]
    fn manifest_supplies_defaults() {
        let target = merge_target(&sources(Some(MANIFEST)), &ResolveArgs::default()).unwrap();
        assert_eq!(target.devices, vec!["CC2674P10RGZ"]);
        assert_eq!(target.rtos, RtosKind::TiRtos7);
        assert_eq!(target.toolchain, Toolchain::Gcc);
        assert!(target.enabled.contains("/ti/display/Display"));
    }

    #[test]
    fn flags_override_and_extend_manifest() {
        let args = ResolveArgs {
            devices: vec!["CC1352P7RGZ".into()],
            rtos: Some(RtosKind::NoneSelected),
            enable: vec!["/ti/common/mcuboot".into()],
            ..Default::default()
        };
        let target = merge_target(&sources(Some(MANIFEST)), &args).unwrap();
        assert_eq!(target.devices, vec!["CC1352P7RGZ"]);
        assert_eq!(target.rtos, RtosKind::NoneSelected);
        assert_eq!(target.toolchain, Toolchain::Gcc);
        assert_eq!(target.enabled.len(), 2);
    }

    #[test]
    fn device_is_required() {
        let err = merge_target(&sources(None), &ResolveArgs::default()).unwrap_err();
        assert!(err.to_string().contains("no device given"));
    }

    #[test]
    fn resolves_each_device() {
        let sources = sources(None);
        let registry = sources.registry().unwrap();
        let target = Target {
            devices: vec!["CC1352P7RGZ".into(), "CC2340R5RKP".into()],
            rtos: RtosKind::FreeRtos,
            toolchain: Toolchain::Ticlang,
            enabled: BTreeSet::new(),
        };
        let builds = resolve_target(&sources, &registry, &target).unwrap();
        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].device.family, "cc13x2x7");
        assert_eq!(builds[1].device.family, "cc23x0");
    }

    #[test]
    fn unknown_device_names_the_device() {
        let sources = sources(None);
        let registry = sources.registry().unwrap();
        let target = Target {
            devices: vec!["MSP430F5529".into()],
            rtos: RtosKind::NoneSelected,
            toolchain: Toolchain::Ticlang,
            enabled: BTreeSet::new(),
        };
        let err = resolve_target(&sources, &registry, &target).unwrap_err();
        assert!(format!("{err:#}").contains("MSP430F5529"));
    }

    #[test]
    fn json_output_for_single_and_many() {
        let sources = sources(None);
        let registry = sources.registry().unwrap();
        let mut target = Target {
            devices: vec!["CC1352P7RGZ".into()],
            rtos: RtosKind::NoneSelected,
            toolchain: Toolchain::Ticlang,
            enabled: BTreeSet::new(),
        };
        let single = render_json(&resolve_target(&sources, &registry, &target).unwrap()).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&single).unwrap().is_object());

        target.devices.push("CC2652R7RGZ".into());
        let many = render_json(&resolve_target(&sources, &registry, &target).unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&many).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn write_uses_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = SdkcfgManifest::from_str(MANIFEST).unwrap();
        let sources = Sources::new(
            Some(manifest),
            dir.path().to_path_buf(),
            vec![catalog_dir()],
            None,
        );
        let args = ResolveArgs {
            format: Some("json".into()),
            write: true,
            ..Default::default()
        };
        run(&sources, &args).unwrap();
        let written = std::fs::read_to_string(dir.path().join("generated").join(BUILD_FILE)).unwrap();
        assert!(written.contains("CC2674P10RGZ"));
    }
}
