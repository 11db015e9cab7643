//! Human-readable build descriptor report.
//!
//! ```text
//! CC2674P10RGZ (cc26x4, m33f) rtos=freertos toolchain=ticlang secure
//! ├── /ti/drivers v1.0.0 [CC26XX]
//! │   └── ti/drivers/lib/ticlang/m33f/drivers_cc26x4_ns.a
//! └── /ti/tfm/TrustZone
//!
//! templates:
//!   ti_drivers_config.c  (/ti/drivers, always)
//!
//! constants:
//!   FLASH_VECTOR_TABLE_ADDRESS = 0x00038000
//! ```

use std::fmt::Write;

use crate::build::{BuildDescriptor, ResolvedModule};
use crate::gate::GateDecision;

/// Format a build descriptor as a tree of modules and their libraries.
pub fn format_report(build: &BuildDescriptor) -> String {
    let d = &build.device;
    let mut out = format!(
        "{} ({}, {}) rtos={} toolchain={}{}\n",
        d.device_id,
        d.family,
        d.isa,
        d.rtos,
        d.toolchain,
        if d.secure { " secure" } else { "" }
    );

    let count = build.modules.len();
    for (i, module) in build.modules.iter().enumerate() {
        format_module(&mut out, build, module, i == count - 1);
    }

    if !build.templates.is_empty() {
        out.push_str("\ntemplates:\n");
        for t in &build.templates {
            let when = if t.always_run { "always" } else { "per instance" };
            let _ = writeln!(out, "  {}  ({}, {when})", t.output, t.module);
        }
    }

    if !build.constants.is_empty() {
        out.push_str("\nconstants:\n");
        for (name, value) in &build.constants {
            let _ = writeln!(out, "  {name} = 0x{value:08X}");
        }
    }

    let _ = write!(
        out,
        "\n{} active modules, {} libraries, {} templates\n",
        count,
        build.libraries().count(),
        build.templates.len()
    );
    out
}

fn format_module(out: &mut String, build: &BuildDescriptor, module: &ResolvedModule, is_last: bool) {
    let connector = if is_last { "└── " } else { "├── " };
    out.push_str(connector);
    out.push_str(&module.name);
    if let Some(version) = &module.version {
        let _ = write!(out, " v{version}");
    }
    if let Some(variant) = &module.variant {
        let _ = write!(out, " [{variant}]");
    }
    out.push('\n');

    let prefix = if is_last { "    " } else { "│   " };
    let libraries: Vec<&str> = build
        .links
        .iter()
        .filter(|l| l.module == module.name)
        .flat_map(|l| l.libraries.iter().map(String::as_str))
        .collect();
    let lib_count = libraries.len();
    for (i, lib) in libraries.into_iter().enumerate() {
        let connector = if i == lib_count - 1 { "└── " } else { "├── " };
        let _ = writeln!(out, "{prefix}{connector}{lib}");
    }
}

/// List modules that stayed inactive and why.
pub fn format_inactive(build: &BuildDescriptor) -> String {
    let mut out = String::new();
    for gate in &build.gates {
        if let GateDecision::Inactive(reason) = &gate.decision {
            let _ = writeln!(out, "  {}: {reason}", gate.module);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::DeviceSummary;
    use crate::gate::{Inactive, ModuleGate};
    use crate::link::LinkDescriptor;
    use crate::templates::TemplateContribution;
    use sdkcfg_device::{Isa, RtosKind};
    use std::collections::BTreeMap;

    fn build() -> BuildDescriptor {
        BuildDescriptor {
            device: DeviceSummary {
                device_id: "CC2674P10RGZ".into(),
                family: "cc26x4".into(),
                driver_family: "CC26XX".into(),
                isa: Isa::M33f,
                rtos: RtosKind::FreeRtos,
                toolchain: "ticlang".into(),
                secure: true,
            },
            modules: vec![
                ResolvedModule {
                    name: "/ti/drivers".into(),
                    label: "Drivers".into(),
                    variant: Some("CC26XX".into()),
                    version: Some("1.0.0".into()),
                },
                ResolvedModule {
                    name: "/ti/tfm/TrustZone".into(),
                    label: "TrustZone".into(),
                    variant: None,
                    version: None,
                },
            ],
            links: vec![LinkDescriptor {
                module: "/ti/drivers".into(),
                libraries: vec!["ti/drivers/lib/ticlang/m33f/drivers_cc26x4_ns.a".into()],
                version: "1.0.0".into(),
                deps: vec![],
            }],
            templates: vec![TemplateContribution {
                module: "/ti/drivers".into(),
                template: "/ti/drivers/templates/Board.c.xdt".into(),
                output: "ti_drivers_config.c".into(),
                always_run: true,
            }],
            constants: BTreeMap::from([("FLASH_VECTOR_TABLE_ADDRESS".to_string(), 0x38000)]),
            gates: vec![ModuleGate {
                module: "/ti/common/mcuboot".into(),
                decision: GateDecision::Inactive(Inactive::NotEnabled),
            }],
        }
    }

    #[test]
    fn report_layout() {
        let report = format_report(&build());
        let expected = "\
CC2674P10RGZ (cc26x4, m33f) rtos=freertos toolchain=ticlang secure
├── /ti/drivers v1.0.0 [CC26XX]
│   └── ti/drivers/lib/ticlang/m33f/drivers_cc26x4_ns.a
└── /ti/tfm/TrustZone

templates:
  ti_drivers_config.c  (/ti/drivers, always)

constants:
  FLASH_VECTOR_TABLE_ADDRESS = 0x00038000

2 active modules, 1 libraries, 1 templates
";
        assert_eq!(report, expected);
    }

    #[test]
    fn inactive_listing() {
        let listing = format_inactive(&build());
        assert_eq!(listing, "  /ti/common/mcuboot: not added to the configuration\n");
    }
}
