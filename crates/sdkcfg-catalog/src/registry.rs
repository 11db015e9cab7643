//! The module registry: every descriptor the SDK ships, read-only once built.
//!
//! Descriptors are loaded from `*.module.toml` files under one or more
//! catalog directories. Registry order is load order (files sorted by path
//! within a directory, directories in the order given) and is the order
//! resolution walks modules in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};
use crate::module_manifest::ModuleManifest;

/// File suffix for descriptor files.
pub const DESCRIPTOR_SUFFIX: &str = ".module.toml";

/// A search result entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSearchResult {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
}

/// Ordered, name-indexed collection of module manifests.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleManifest>,
    index: HashMap<String, usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from manifests, keeping their order.
    pub fn from_manifests(manifests: impl IntoIterator<Item = ModuleManifest>) -> Result<Self> {
        let mut registry = Self::new();
        for manifest in manifests {
            registry.insert(manifest)?;
        }
        Ok(registry)
    }

    /// Append a manifest. Names must be unique.
    pub fn insert(&mut self, manifest: ModuleManifest) -> Result<()> {
        let name = manifest.name().to_string();
        if self.index.contains_key(&name) {
            return Err(CatalogError::DuplicateModule { name });
        }
        self.index.insert(name, self.modules.len());
        self.modules.push(manifest);
        Ok(())
    }

    /// Look up a module by name.
    pub fn get(&self, name: &str) -> Option<&ModuleManifest> {
        self.index.get(name).map(|&i| &self.modules[i])
    }

    /// Look up a module by name, failing if absent.
    pub fn require(&self, name: &str) -> Result<&ModuleManifest> {
        self.get(name).ok_or_else(|| CatalogError::ModuleNotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of a module in registry order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Manifests in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleManifest> {
        self.modules.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Case-insensitive substring search over names and display names.
    pub fn search(&self, query: &str) -> Vec<ModuleSearchResult> {
        let query_lower = query.to_lowercase();
        self.modules
            .iter()
            .filter(|m| {
                m.name().to_lowercase().contains(&query_lower)
                    || m.module
                        .display_name
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&query_lower))
            })
            .map(|m| ModuleSearchResult {
                name: m.name().to_string(),
                version: m.module.version.clone(),
                description: m.module.description.clone(),
            })
            .collect()
    }

    /// Load every descriptor under `dir`, recursively.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();
        registry.extend_from_dir(dir)?;
        Ok(registry)
    }

    /// Load descriptors from several catalog directories, in order.
    pub fn load_paths<P: AsRef<Path>>(dirs: &[P]) -> Result<Self> {
        let mut registry = Self::new();
        for dir in dirs {
            registry.extend_from_dir(dir.as_ref())?;
        }
        Ok(registry)
    }

    fn extend_from_dir(&mut self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Err(CatalogError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("catalog directory not found: {}", dir.display()),
            )));
        }
        let mut files = Vec::new();
        collect_descriptor_files(dir, &mut files)?;
        files.sort();
        for path in files {
            let manifest = ModuleManifest::load(&path)?;
            tracing::debug!(module = manifest.name(), path = %path.display(), "loaded descriptor");
            self.insert(manifest).map_err(|e| CatalogError::Load {
                path: path.clone(),
                source: Box::new(e),
            })?;
        }
        Ok(())
    }
}

fn collect_descriptor_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_descriptor_files(&path, out)?;
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(DESCRIPTOR_SUFFIX))
        {
            out.push(path);
        }
    }
    Ok(())
}
