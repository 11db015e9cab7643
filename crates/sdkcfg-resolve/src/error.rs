//! Resolution errors.

use sdkcfg_catalog::CatalogError;
use sdkcfg_device::DeviceError;
use thiserror::Error;

/// Plain error kind, for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownVariant,
    AmbiguousRule,
    CyclicFeatureDependency,
    DanglingDependency,
    UnsupportedDevice,
    DuplicateLibrary,
    ConflictingConstant,
    Catalog,
    Device,
}

/// Errors that abort a resolution run. A run that fails produces no output.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("device '{device_id}': module '{module}' has no variant for key '{key}' (available: {})", available.join(", "))]
    UnknownVariant {
        device_id: String,
        module: String,
        key: String,
        available: Vec<String>,
    },

    #[error("device '{device_id}': module '{module}' has an ambiguous rule {rule}: {detail}")]
    AmbiguousRule {
        device_id: String,
        module: String,
        rule: String,
        detail: String,
    },

    #[error("cyclic feature dependency: {}", cycle.join(" -> "))]
    CyclicFeatureDependency { cycle: Vec<String> },

    #[error("device '{device_id}': module '{module}' links against '{dependency}', which is not in the resolved set")]
    DanglingDependency {
        device_id: String,
        module: String,
        dependency: String,
    },

    #[error("device '{device_id}' is not supported")]
    UnsupportedDevice { device_id: String },

    #[error("device '{device_id}': library '{library}' is contributed by both '{first}' and '{second}'")]
    DuplicateLibrary {
        device_id: String,
        library: String,
        first: String,
        second: String,
    },

    #[error("constant '{name}' is {first_value} from '{first}' but {second_value} from '{second}'")]
    ConflictingConstant {
        name: String,
        first: String,
        first_value: u64,
        second: String,
        second_value: u64,
    },

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("device database error: {0}")]
    Device(#[from] DeviceError),
}

impl ConfigError {
    /// The failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::UnknownVariant { .. } => ErrorKind::UnknownVariant,
            ConfigError::AmbiguousRule { .. } => ErrorKind::AmbiguousRule,
            ConfigError::CyclicFeatureDependency { .. } => ErrorKind::CyclicFeatureDependency,
            ConfigError::DanglingDependency { .. } => ErrorKind::DanglingDependency,
            ConfigError::UnsupportedDevice { .. } => ErrorKind::UnsupportedDevice,
            ConfigError::DuplicateLibrary { .. } => ErrorKind::DuplicateLibrary,
            ConfigError::ConflictingConstant { .. } => ErrorKind::ConflictingConstant,
            ConfigError::Catalog(_) => ErrorKind::Catalog,
            ConfigError::Device(DeviceError::UnsupportedDevice { .. }) => ErrorKind::UnsupportedDevice,
            ConfigError::Device(DeviceError::AmbiguousRule { .. }) => ErrorKind::AmbiguousRule,
            ConfigError::Device(_) => ErrorKind::Device,
        }
    }

    /// Attach run context to a catalog error.
    pub(crate) fn from_catalog(err: CatalogError, device_id: &str) -> Self {
        match err {
            CatalogError::UnknownVariant {
                module,
                key,
                available,
            } => ConfigError::UnknownVariant {
                device_id: device_id.to_string(),
                module,
                key,
                available,
            },
            CatalogError::AmbiguousRule {
                module,
                rule,
                detail,
            } => ConfigError::AmbiguousRule {
                device_id: device_id.to_string(),
                module,
                rule,
                detail,
            },
            other => ConfigError::Catalog(other),
        }
    }
}

/// Result type alias for resolution.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_errors_gain_device_context() {
        let err = ConfigError::from_catalog(
            CatalogError::UnknownVariant {
                module: "/ti/drivers/GPIO".into(),
                key: "CC35XX".into(),
                available: vec!["CC26XX".into(), "LPF3".into()],
            },
            "CC3551E",
        );
        assert_eq!(err.kind(), ErrorKind::UnknownVariant);
        let msg = err.to_string();
        assert!(msg.contains("CC3551E"));
        assert!(msg.contains("CC26XX, LPF3"));

        let err = ConfigError::from_catalog(
            CatalogError::DuplicateModule {
                name: "/ti/drivers/DMA".into(),
            },
            "CC3551E",
        );
        assert_eq!(err.kind(), ErrorKind::Catalog);
    }

    #[test]
    fn device_errors_keep_their_kind() {
        let err: ConfigError = DeviceError::UnsupportedDevice {
            device_id: "MSP432".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::UnsupportedDevice);

        let err: ConfigError = DeviceError::AmbiguousRule {
            pattern: "CC26[".into(),
            detail: "unclosed class".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::AmbiguousRule);
    }

    #[test]
    fn cycle_path_is_rendered() {
        let err = ConfigError::CyclicFeatureDependency {
            cycle: vec!["/a".into(), "/b".into(), "/a".into()],
        };
        assert_eq!(err.to_string(), "cyclic feature dependency: /a -> /b -> /a");
    }
}
