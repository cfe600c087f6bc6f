//! Plugin manifest parsing for published firmware plugins.
//!
//! Every published plugin version carries a `plugin.toml` declaring its
//! identity and the version constraints on other plugins it depends on.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::version;

/// A complete manifest for one published plugin version.
///
/// Dependencies are kept sorted by slug so iteration order, and with it
/// resolution order, is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin metadata (required).
    pub plugin: PluginMetadata,
    /// Dependency constraints on other plugins (slug → constraint text).
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// Core plugin metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Plugin slug (unique within the catalog).
    pub slug: String,
    /// Semantic version.
    pub version: String,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Author list.
    #[serde(default)]
    pub authors: Vec<String>,
    /// License identifier (SPDX).
    #[serde(default)]
    pub license: Option<String>,
    /// Repository URL.
    #[serde(default)]
    pub repository: Option<String>,
    /// Minimum base-firmware version this plugin builds against.
    ///
    /// This is a constraint on the firmware itself, not a plugin
    /// dependency; the resolver never tries to install it.
    #[serde(default)]
    pub firmware: Option<String>,
}

impl PluginManifest {
    /// Parse a plugin manifest from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        let manifest: PluginManifest = toml::from_str(input)?;

        if manifest.plugin.slug.is_empty() {
            return Err(RegistryError::InvalidManifest {
                detail: "plugin.slug is required".to_string(),
            });
        }

        if manifest.plugin.version.is_empty() {
            return Err(RegistryError::InvalidManifest {
                detail: "plugin.version is required".to_string(),
            });
        }

        // Reject malformed versions and constraints at the door so the
        // resolver never sees them.
        version::parse_version(&manifest.plugin.version)?;
        for constraint in manifest.dependencies.values() {
            version::parse_constraint(constraint)?;
        }
        if let Some(firmware) = &manifest.plugin.firmware {
            version::parse_constraint(firmware)?;
        }

        Ok(manifest)
    }

    /// Load a plugin manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Get the parsed semantic version.
    pub fn version(&self) -> version::Version {
        semver::Version::parse(&self.plugin.version).expect("version validated in parse")
    }

    /// Serialize this manifest to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RegistryError::InvalidManifest {
            detail: format!("failed to serialize: {e}"),
        })
    }
}
