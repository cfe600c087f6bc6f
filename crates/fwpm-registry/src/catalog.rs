//! Catalog backends and the in-memory catalog snapshot.
//!
//! The `CatalogBackend` trait abstracts over catalog storage (local
//! filesystem, HTTP mirror, etc.) and is read-only: publishing happens
//! out-of-band. The resolver itself never touches a backend; it works
//! against a `Catalog` snapshot assembled up front.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{RegistryError, Result};
use crate::integrity::ContentHash;
use crate::manifest::PluginManifest;
use crate::version::Version;

/// Abstract read-only catalog backend.
pub trait CatalogBackend {
    /// List every slug the catalog has entries for.
    fn list_slugs(&self) -> Result<Vec<String>>;

    /// Fetch the list of available versions for a slug.
    ///
    /// A missing slug is "no versions available", not an error.
    fn list_versions(&self, slug: &str) -> Result<Vec<Version>>;

    /// Fetch the manifest for a specific plugin version.
    fn manifest(&self, slug: &str, version: &Version) -> Result<PluginManifest>;

    /// Fetch the raw archive bytes for a specific plugin version.
    fn archive(&self, slug: &str, version: &Version) -> Result<Vec<u8>>;
}

/// An in-memory, read-only catalog snapshot: slug → ascending list of
/// published `(version, manifest)` pairs.
///
/// Invariant: at most one manifest per (slug, version) pair.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    plugins: BTreeMap<String, Vec<(Version, PluginManifest)>>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Build a snapshot of everything a backend publishes.
    pub fn from_backend(backend: &dyn CatalogBackend) -> Result<Self> {
        let mut catalog = Catalog::new();
        for slug in backend.list_slugs()? {
            for version in backend.list_versions(&slug)? {
                let manifest = backend.manifest(&slug, &version)?;
                catalog.insert(manifest)?;
            }
        }
        Ok(catalog)
    }

    /// Add one published manifest, rejecting duplicates per (slug, version).
    pub fn insert(&mut self, manifest: PluginManifest) -> Result<()> {
        let slug = manifest.plugin.slug.clone();
        let version = manifest.version();
        let entries = self.plugins.entry(slug.clone()).or_default();

        if entries.iter().any(|(v, _)| *v == version) {
            return Err(RegistryError::DuplicateVersion {
                slug,
                version: version.to_string(),
            });
        }

        let at = entries.partition_point(|(v, _)| *v < version);
        entries.insert(at, (version, manifest));
        Ok(())
    }

    /// All published versions of a slug, ascending. Empty if unknown.
    pub fn versions(&self, slug: &str) -> Vec<Version> {
        self.plugins
            .get(slug)
            .map(|entries| entries.iter().map(|(v, _)| v.clone()).collect())
            .unwrap_or_default()
    }

    /// The manifest published for an exact (slug, version), if any.
    pub fn manifest(&self, slug: &str, version: &Version) -> Option<&PluginManifest> {
        self.plugins
            .get(slug)?
            .iter()
            .find(|(v, _)| v == version)
            .map(|(_, m)| m)
    }

    /// Whether the catalog has any entry for a slug.
    pub fn contains(&self, slug: &str) -> bool {
        self.plugins.contains_key(slug)
    }

    /// Iterate over all slugs in sorted order.
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// Number of distinct slugs.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// A local filesystem catalog for development and testing.
///
/// Layout:
/// ```text
/// <root>/
///   <slug>/
///     index.json          — version → archive hash
///     <version>/
///       plugin.toml
///       plugin.tar
/// ```
pub struct LocalCatalog {
    root: PathBuf,
}

impl LocalCatalog {
    /// Create a local catalog rooted at the given directory.
    pub fn new(root: PathBuf) -> Self {
        LocalCatalog { root }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Seed a plugin version into the catalog.
    ///
    /// Not part of `CatalogBackend`: the core treats catalogs as
    /// read-only. This exists for development registries and tests.
    pub fn publish(&self, manifest_str: &str, archive: &[u8]) -> Result<()> {
        let manifest = PluginManifest::parse(manifest_str)?;
        let slug = &manifest.plugin.slug;
        let version = manifest.version();
        let dir = self.plugin_dir(slug, &version);

        if dir.join("plugin.toml").is_file() {
            return Err(RegistryError::DuplicateVersion {
                slug: slug.clone(),
                version: version.to_string(),
            });
        }

        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("plugin.toml"), manifest_str.as_bytes())?;
        std::fs::write(dir.join("plugin.tar"), archive)?;

        // Update the per-slug index
        let index_path = self.root.join(slug).join("index.json");
        let mut index: BTreeMap<String, String> = if index_path.is_file() {
            let data = std::fs::read_to_string(&index_path)?;
            serde_json::from_str(&data).unwrap_or_default()
        } else {
            BTreeMap::new()
        };
        index.insert(
            version.to_string(),
            ContentHash::compute(archive).as_str().to_string(),
        );
        std::fs::write(&index_path, serde_json::to_string_pretty(&index)?)?;

        Ok(())
    }

    fn plugin_dir(&self, slug: &str, version: &Version) -> PathBuf {
        self.root.join(slug).join(version.to_string())
    }
}

impl CatalogBackend for LocalCatalog {
    fn list_slugs(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut slugs = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    slugs.push(name.to_string());
                }
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    fn list_versions(&self, slug: &str) -> Result<Vec<Version>> {
        let slug_dir = self.root.join(slug);
        if !slug_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in std::fs::read_dir(&slug_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Ok(v) = semver::Version::parse(name) {
                        versions.push(v);
                    }
                }
            }
        }
        versions.sort();
        Ok(versions)
    }

    fn manifest(&self, slug: &str, version: &Version) -> Result<PluginManifest> {
        let path = self.plugin_dir(slug, version).join("plugin.toml");
        if !path.is_file() {
            return Err(RegistryError::MissingSlug {
                slug: format!("{slug}@{version}"),
            });
        }
        PluginManifest::load(&path)
    }

    fn archive(&self, slug: &str, version: &Version) -> Result<Vec<u8>> {
        let path = self.plugin_dir(slug, version).join("plugin.tar");
        if !path.is_file() {
            return Err(RegistryError::MissingSlug {
                slug: format!("{slug}@{version}"),
            });
        }
        Ok(std::fs::read(&path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_str(slug: &str, version: &str) -> String {
        format!("[plugin]\nslug = \"{slug}\"\nversion = \"{version}\"\n")
    }

    #[test]
    fn publish_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalCatalog::new(dir.path().to_path_buf());

        local.publish(&manifest_str("mesh-core", "1.0.0"), b"a1").unwrap();
        local.publish(&manifest_str("mesh-core", "1.1.0"), b"a2").unwrap();
        local.publish(&manifest_str("telemetry", "0.4.0"), b"a3").unwrap();

        let catalog = Catalog::from_backend(&local).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.versions("mesh-core").len(), 2);
        assert!(catalog.contains("telemetry"));
    }

    #[test]
    fn versions_sorted_ascending() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalCatalog::new(dir.path().to_path_buf());

        local.publish(&manifest_str("p", "2.0.0"), b"x").unwrap();
        local.publish(&manifest_str("p", "1.0.0"), b"x").unwrap();
        local.publish(&manifest_str("p", "1.1.0"), b"x").unwrap();

        let versions = local.list_versions("p").unwrap();
        assert_eq!(versions[0], semver::Version::new(1, 0, 0));
        assert_eq!(versions[2], semver::Version::new(2, 0, 0));
    }

    #[test]
    fn missing_slug_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalCatalog::new(dir.path().to_path_buf());

        assert!(local.list_versions("ghost").unwrap().is_empty());

        let catalog = Catalog::new();
        assert!(catalog.versions("ghost").is_empty());
    }

    #[test]
    fn duplicate_version_rejected_on_publish() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalCatalog::new(dir.path().to_path_buf());

        local.publish(&manifest_str("dup", "1.0.0"), b"x").unwrap();
        let result = local.publish(&manifest_str("dup", "1.0.0"), b"y");
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateVersion { .. })
        ));
    }

    #[test]
    fn duplicate_version_rejected_on_insert() {
        let mut catalog = Catalog::new();
        let manifest = PluginManifest::parse(&manifest_str("dup", "1.0.0")).unwrap();
        catalog.insert(manifest.clone()).unwrap();
        assert!(matches!(
            catalog.insert(manifest),
            Err(RegistryError::DuplicateVersion { .. })
        ));
    }

    #[test]
    fn archive_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalCatalog::new(dir.path().to_path_buf());

        local.publish(&manifest_str("arc", "1.0.0"), b"archive bytes").unwrap();
        let bytes = local
            .archive("arc", &semver::Version::new(1, 0, 0))
            .unwrap();
        assert_eq!(bytes, b"archive bytes");
    }

    #[test]
    fn snapshot_manifest_lookup() {
        let mut catalog = Catalog::new();
        catalog
            .insert(PluginManifest::parse(&manifest_str("look", "1.2.0")).unwrap())
            .unwrap();

        let v = semver::Version::new(1, 2, 0);
        assert!(catalog.manifest("look", &v).is_some());
        assert!(catalog.manifest("look", &semver::Version::new(9, 9, 9)).is_none());
    }
}
