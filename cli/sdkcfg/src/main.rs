//! sdkcfg CLI: resolve which SDK modules, libraries, and templates apply to
//! a device.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use sdkcfg_device::{RtosKind, Toolchain};
use tracing_subscriber::EnvFilter;

use commands::resolve::ResolveArgs;
use commands::Sources;
use manifest::SdkcfgManifest;

#[derive(Parser)]
#[command(name = "sdkcfg", version, about = "SDK module resolution for embedded targets")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Catalog directory (repeatable; overrides sdkcfg.toml)
    #[arg(long, global = true)]
    catalog: Vec<PathBuf>,
    /// Device database file (overrides sdkcfg.toml)
    #[arg(long, global = true)]
    devices: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new sdkcfg project
    Init {
        /// Project name
        name: String,
        /// Target device identifier (e.g., CC1352P7RGZ)
        #[arg(long)]
        device: Option<String>,
    },
    /// Resolve active modules, libraries, and templates for a device
    Resolve {
        /// Device identifier (repeatable; default from sdkcfg.toml)
        #[arg(long)]
        device: Vec<String>,
        /// RTOS (none-selected, nortos, freertos, tirtos7)
        #[arg(long)]
        rtos: Option<RtosKind>,
        /// Toolchain (ticlang, gcc, iar)
        #[arg(long)]
        toolchain: Option<Toolchain>,
        /// Module added to the configuration (repeatable)
        #[arg(long)]
        enable: Vec<String>,
        /// Output format (human, json)
        #[arg(long)]
        format: Option<String>,
        /// Write output to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write output into the project's output directory
        #[arg(long)]
        write: bool,
        /// List inactive modules and why
        #[arg(long)]
        explain: bool,
    },
    /// Inspect the device database
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },
    /// Browse catalog modules
    Module {
        #[command(subcommand)]
        action: ModuleAction,
    },
    /// Validate the catalog and device database
    Check,
}

#[derive(Subcommand)]
enum DeviceAction {
    /// List device families
    List,
    /// Show attributes of a device
    Describe {
        /// Device identifier
        id: String,
        /// Output format (default: human-readable, "toml" for TOML)
        #[arg(long)]
        format: Option<String>,
    },
}

#[derive(Subcommand)]
enum ModuleAction {
    /// List catalog modules
    List {
        /// Filter by name
        query: Option<String>,
    },
    /// Show a module descriptor
    Show {
        /// Module name (e.g., /ti/drivers/GPIO)
        name: String,
        /// Merge the variant selected for this device
        #[arg(long)]
        device: Option<String>,
        /// RTOS used for variant selection
        #[arg(long)]
        rtos: Option<RtosKind>,
        /// Output format (default: human-readable, "toml" for TOML)
        #[arg(long)]
        format: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sdkcfg={level},sdkcfg_device={level},sdkcfg_catalog={level},sdkcfg_resolve={level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let Cli {
        command,
        catalog,
        devices,
        ..
    } = cli;
    let sources = move || -> anyhow::Result<Sources> {
        let (manifest, project_dir) = load_manifest_optional(&cwd)?;
        Ok(Sources::new(
            manifest,
            project_dir.unwrap_or(cwd),
            catalog,
            devices,
        ))
    };

    match command {
        Commands::Init { name, device } => commands::init::run(&name, device.as_deref()),

        Commands::Resolve {
            device,
            rtos,
            toolchain,
            enable,
            format,
            out,
            write,
            explain,
        } => {
            let sources = sources()?;
            if write && sources.manifest.is_none() {
                load_manifest_required(&sources.project_dir)?;
            }
            commands::resolve::run(
                &sources,
                &ResolveArgs {
                    devices: device,
                    rtos,
                    toolchain,
                    enable,
                    format,
                    out,
                    write,
                    explain,
                },
            )
        }

        Commands::Device { action } => {
            let sources = sources()?;
            match action {
                DeviceAction::List => commands::device::list(&sources),
                DeviceAction::Describe { id, format } => {
                    commands::device::describe(&sources, &id, format.as_deref())
                }
            }
        }

        Commands::Module { action } => {
            let sources = sources()?;
            match action {
                ModuleAction::List { query } => {
                    commands::module::list(&sources, query.as_deref())
                }
                ModuleAction::Show {
                    name,
                    device,
                    rtos,
                    format,
                } => commands::module::show(
                    &sources,
                    &name,
                    device.as_deref(),
                    rtos,
                    format.as_deref(),
                ),
            }
        }

        Commands::Check => commands::check::run(&sources()?),
    }
}

/// Load manifest, returning error if not found.
fn load_manifest_required(cwd: &Path) -> anyhow::Result<(SdkcfgManifest, PathBuf)> {
    match SdkcfgManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((manifest, dir)),
        None => anyhow::bail!("no sdkcfg.toml found (run `sdkcfg init` first)"),
    }
}

/// Try to load a manifest from the current directory upward. Returns (None, None) if not found.
fn load_manifest_optional(cwd: &Path) -> anyhow::Result<(Option<SdkcfgManifest>, Option<PathBuf>)> {
    match SdkcfgManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use sdkcfg_resolve::BuildDescriptor;

    fn shipped_catalog() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../catalog")
    }

    /// Full workflow: init → check → resolve --write.
    #[test]
    fn init_check_resolve_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("workflow-test");

        // 1. Init
        commands::init::create_project(&project_path, "workflow-test", "CC2674P10RGZ").unwrap();
        let (manifest, project_dir) = load_manifest_required(&project_path).unwrap();
        assert_eq!(project_dir, project_path);

        // 2. Check against the shipped catalog
        let sources = Sources::new(Some(manifest), project_dir, vec![shipped_catalog()], None);
        commands::check::run(&sources).unwrap();

        // 3. Resolve with TrustZone added and write JSON
        let args = ResolveArgs {
            enable: vec!["/ti/tfm/TrustZone".into()],
            format: Some("json".into()),
            write: true,
            ..Default::default()
        };
        commands::resolve::run(&sources, &args).unwrap();

        let written = std::fs::read_to_string(
            project_path
                .join("generated")
                .join(commands::resolve::BUILD_FILE),
        )
        .unwrap();
        let build: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(build["device"]["secure"], serde_json::Value::Bool(true));
        assert_eq!(build["device"]["rtos"], "freertos");
    }

    #[test]
    fn empty_project_catalog_resolves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("empty");
        commands::init::create_project(&project_path, "empty", "CC2340R5RKP").unwrap();

        let (manifest, project_dir) = load_manifest_required(&project_path).unwrap();
        let sources = Sources::new(Some(manifest), project_dir, vec![], None);
        let target =
            commands::resolve::merge_target(&sources, &ResolveArgs::default()).unwrap();
        let registry = sources.registry().unwrap();
        let builds: Vec<BuildDescriptor> =
            commands::resolve::resolve_target(&sources, &registry, &target).unwrap();
        assert!(builds[0].modules.is_empty());
        assert_eq!(builds[0].device.family, "cc23x0");
    }

    #[test]
    fn cli_parses_resolve_flags() {
        let cli = Cli::try_parse_from([
            "sdkcfg",
            "--catalog",
            "cat",
            "resolve",
            "--device",
            "CC1352P7RGZ",
            "--device",
            "CC2340R5RKP",
            "--rtos",
            "tirtos7",
            "--toolchain",
            "gcc",
            "--enable",
            "/ti/display/Display",
        ])
        .unwrap();
        assert_eq!(cli.catalog, vec![PathBuf::from("cat")]);
        match cli.command {
            Commands::Resolve {
                device,
                rtos,
                toolchain,
                enable,
                ..
            } => {
                assert_eq!(device.len(), 2);
                assert_eq!(rtos, Some(RtosKind::TiRtos7));
                assert_eq!(toolchain, Some(Toolchain::Gcc));
                assert_eq!(enable, vec!["/ti/display/Display"]);
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn cli_rejects_unknown_rtos() {
        assert!(Cli::try_parse_from(["sdkcfg", "resolve", "--rtos", "zephyr"]).is_err());
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest_required(dir.path()).unwrap_err();
        assert!(err.to_string().contains("sdkcfg init"));
    }
}
