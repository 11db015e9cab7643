//! Toolchain directory resolution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// Resolves the library directory name of the active build toolchain.
///
/// The host tool owns toolchain detection; resolution only needs the
/// directory string.
pub trait ToolchainResolver {
    /// Directory segment under a module's `lib/` folder (e.g. `ticlang`).
    fn toolchain_dir(&self) -> String;
}

/// Toolchains the SDK ships prebuilt libraries for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
    #[default]
    Ticlang,
    Gcc,
    Iar,
}

impl Toolchain {
    pub fn as_str(self) -> &'static str {
        match self {
            Toolchain::Ticlang => "ticlang",
            Toolchain::Gcc => "gcc",
            Toolchain::Iar => "iar",
        }
    }
}

impl ToolchainResolver for Toolchain {
    fn toolchain_dir(&self) -> String {
        self.as_str().to_string()
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Toolchain {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ticlang" => Ok(Toolchain::Ticlang),
            "gcc" => Ok(Toolchain::Gcc),
            "iar" => Ok(Toolchain::Iar),
            other => Err(DeviceError::UnknownName {
                what: "toolchain",
                value: other.to_string(),
                expected: "ticlang, gcc, iar",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolchain_dirs() {
        assert_eq!(Toolchain::Ticlang.toolchain_dir(), "ticlang");
        assert_eq!(Toolchain::Gcc.toolchain_dir(), "gcc");
        assert_eq!("iar".parse::<Toolchain>().unwrap(), Toolchain::Iar);
        assert!("armcc".parse::<Toolchain>().is_err());
    }
}
