//! Catalog error types.

use std::path::PathBuf;

/// Errors that can occur while loading or merging module descriptors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A descriptor is structurally invalid.
    #[error("invalid descriptor '{module}': {detail}")]
    InvalidDescriptor { module: String, detail: String },

    /// A support rule in a descriptor does not compile.
    #[error("module '{module}': ambiguous rule {rule}: {detail}")]
    AmbiguousRule {
        module: String,
        rule: String,
        detail: String,
    },

    /// No variant implementation exists for the derived key.
    #[error("module '{module}' has no variant for key '{key}' (available: {})", available.join(", "))]
    UnknownVariant {
        module: String,
        key: String,
        available: Vec<String>,
    },

    /// Two descriptors declare the same module name.
    #[error("module '{name}' is declared more than once")]
    DuplicateModule { name: String },

    /// Module not present in the registry.
    #[error("module not found: {name}")]
    ModuleNotFound { name: String },

    /// An error while loading a specific descriptor file.
    #[error("{}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: Box<CatalogError>,
    },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Semver parse error.
    #[error("invalid version: {0}")]
    SemverVersion(#[from] semver::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
