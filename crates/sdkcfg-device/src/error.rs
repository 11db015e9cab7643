//! Error types for device database and matcher operations.

use std::path::PathBuf;

/// Errors that can occur while loading device data or evaluating support rules.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// I/O error reading device database files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Device database file not found.
    #[error("device database not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// A support rule contains pattern text that does not compile.
    #[error("ambiguous rule: pattern '{pattern}' is invalid: {detail}")]
    AmbiguousRule {
        /// The offending pattern text.
        pattern: String,
        /// Compiler diagnostic.
        detail: String,
    },

    /// No database entry matches the device identifier.
    #[error("unsupported device '{device_id}': no family entry matches")]
    UnsupportedDevice {
        /// The device identifier that was looked up.
        device_id: String,
    },

    /// A value could not be parsed into one of the closed enumerations.
    #[error("unknown {what} '{value}' (expected one of: {expected})")]
    UnknownName {
        /// What kind of name was being parsed ("rtos", "toolchain", "isa").
        what: &'static str,
        /// The rejected input.
        value: String,
        /// Accepted spellings.
        expected: &'static str,
    },

    /// Validation error in a device database definition.
    #[error("validation error: {detail}")]
    Validation {
        /// Description of the validation failure.
        detail: String,
    },
}

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;
