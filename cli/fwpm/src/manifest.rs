//! `fwpm.toml` manifest parsing and project configuration.
//!
//! The project manifest lives at the firmware tree root and records the
//! requested plugins; `fwpm install` keeps it in sync and the resolver
//! reads its request set.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// The top-level manifest structure for a firmware project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FwpmManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    /// Requested plugins (slug → constraint text; "*" means latest).
    #[serde(default)]
    pub plugins: BTreeMap<String, String>,
    /// Catalog configuration.
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required).
    pub name: String,
    /// Firmware project version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Catalog configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory of the plugin catalog.
    #[serde(default)]
    pub path: Option<String>,
}

impl FwpmManifest {
    /// Search upward from `start_dir` for an `fwpm.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join("fwpm.toml");
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: FwpmManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing fwpm.toml")
    }

    /// The catalog directory for this project.
    ///
    /// Defaults to `.fwpm-catalog/` next to the manifest.
    pub fn catalog_dir(&self, project_dir: &Path) -> PathBuf {
        match self.catalog.as_ref().and_then(|c| c.path.as_deref()) {
            Some(path) => project_dir.join(path),
            None => project_dir.join(".fwpm-catalog"),
        }
    }

    /// Generate the default template for a new firmware project.
    pub fn template(name: &str) -> String {
        format!(
            r#"[project]
name = "{name}"
version = "0.1.0"

[plugins]
"#
        )
    }
}

/// Record a requested plugin in `fwpm.toml`, preserving the rest of the
/// document.
pub fn add_plugin(project_dir: &Path, slug: &str, constraint: &str) -> Result<()> {
    let manifest_path = project_dir.join("fwpm.toml");
    let content = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("reading {}", manifest_path.display()))?;
    let mut doc: toml::Table = content.parse().context("parsing fwpm.toml")?;

    let plugins = doc
        .entry("plugins")
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));

    if let toml::Value::Table(table) = plugins {
        table.insert(
            slug.to_string(),
            toml::Value::String(constraint.to_string()),
        );
    }

    std::fs::write(&manifest_path, doc.to_string())?;
    Ok(())
}

/// Drop a requested plugin from `fwpm.toml`. Returns whether it was
/// present.
pub fn remove_plugin(project_dir: &Path, slug: &str) -> Result<bool> {
    let manifest_path = project_dir.join("fwpm.toml");
    let content = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("reading {}", manifest_path.display()))?;
    let mut doc: toml::Table = content.parse().context("parsing fwpm.toml")?;

    let removed = if let Some(toml::Value::Table(table)) = doc.get_mut("plugins") {
        table.remove(slug).is_some()
    } else {
        false
    };

    if removed {
        std::fs::write(&manifest_path, doc.to_string())?;
    }
    Ok(removed)
}
