//! Instruction set architecture of a target core.
//!
//! The ISA selects the library subdirectory a module links from
//! (`lib/<toolchain>/<isa>/...`), so the set is closed to the cores the SDK
//! ships prebuilt libraries for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// Cortex-M core variant, named by the SDK's library directory convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Isa {
    /// ARMv6-M (Cortex-M0+).
    M0p,
    /// ARMv7-M without FPU (Cortex-M3).
    M3,
    /// ARMv7E-M without FPU (Cortex-M4).
    M4,
    /// ARMv7E-M with single-precision FPU (Cortex-M4F).
    M4f,
    /// ARMv8-M Mainline without FPU (Cortex-M33).
    M33,
    /// ARMv8-M Mainline with FPU (Cortex-M33F).
    M33f,
}

impl Isa {
    /// All ISAs, in declaration order.
    pub const ALL: [Isa; 6] = [Isa::M0p, Isa::M3, Isa::M4, Isa::M4f, Isa::M33, Isa::M33f];

    /// Library directory name for this ISA (e.g. `m4f`).
    pub fn dir_name(self) -> &'static str {
        match self {
            Isa::M0p => "m0p",
            Isa::M3 => "m3",
            Isa::M4 => "m4",
            Isa::M4f => "m4f",
            Isa::M33 => "m33",
            Isa::M33f => "m33f",
        }
    }

    /// Whether the core implements the ARMv8-M Security Extension.
    pub fn has_trustzone(self) -> bool {
        matches!(self, Isa::M33 | Isa::M33f)
    }
}

impl fmt::Display for Isa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Isa {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Isa::ALL
            .into_iter()
            .find(|isa| isa.dir_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| DeviceError::UnknownName {
                what: "isa",
                value: s.to_string(),
                expected: "m0p, m3, m4, m4f, m33, m33f",
            })
    }
}
