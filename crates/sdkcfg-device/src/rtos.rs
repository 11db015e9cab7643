//! RTOS selection for a configuration run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// The kernel a configuration targets. Closed set.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RtosKind {
    /// The host tool has not been told which kernel is in use.
    #[default]
    #[serde(rename = "none-selected")]
    NoneSelected,
    /// Bare-metal, no kernel.
    #[serde(rename = "nortos")]
    NoRtos,
    #[serde(rename = "freertos")]
    FreeRtos,
    #[serde(rename = "tirtos7")]
    TiRtos7,
}

impl RtosKind {
    /// All kinds, in declaration order.
    pub const ALL: [RtosKind; 4] = [
        RtosKind::NoneSelected,
        RtosKind::NoRtos,
        RtosKind::FreeRtos,
        RtosKind::TiRtos7,
    ];

    /// Canonical spelling used in descriptors and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            RtosKind::NoneSelected => "none-selected",
            RtosKind::NoRtos => "nortos",
            RtosKind::FreeRtos => "freertos",
            RtosKind::TiRtos7 => "tirtos7",
        }
    }

    /// Suffix appended to kernel-specific library names.
    ///
    /// Only the two kernels with dedicated library builds get one.
    pub fn lib_suffix(self) -> &'static str {
        match self {
            RtosKind::FreeRtos => "_freertos",
            RtosKind::TiRtos7 => "_tirtos7",
            RtosKind::NoneSelected | RtosKind::NoRtos => "",
        }
    }
}

impl fmt::Display for RtosKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RtosKind {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RtosKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DeviceError::UnknownName {
                what: "rtos",
                value: s.to_string(),
                expected: "none-selected, nortos, freertos, tirtos7",
            })
    }
}
