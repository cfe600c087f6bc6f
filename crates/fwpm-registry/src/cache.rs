//! Content-addressed local plugin cache.
//!
//! Stores fetched plugin archives and manifests in a local directory
//! structure organized by slug and version, so installs can be repeated
//! and verified without touching the catalog transport.
//!
//! Layout:
//! ```text
//! <cache_root>/
//!   <slug>/
//!     <version>/
//!       plugin.toml     — Plugin manifest
//!       plugin.tar      — Archive
//!       integrity.json  — Hash records
//! ```

use std::path::{Path, PathBuf};

use crate::error::{RegistryError, Result};
use crate::integrity::ContentHash;

/// A local plugin cache backed by the filesystem.
#[derive(Debug, Clone)]
pub struct PluginCache {
    /// Root directory for the cache.
    root: PathBuf,
}

/// Information about a cached plugin version.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Path to the manifest file.
    pub manifest_path: PathBuf,
    /// Path to the archive.
    pub archive_path: PathBuf,
    /// Plugin slug.
    pub slug: String,
    /// Plugin version.
    pub version: String,
}

impl PluginCache {
    /// Create a cache rooted at the given directory.
    pub fn new(root: PathBuf) -> Self {
        PluginCache { root }
    }

    /// Create a cache at the default location (`~/.fwpm/cache`).
    pub fn default_location() -> Option<Self> {
        home_dir().map(|home| PluginCache::new(home.join(".fwpm").join("cache")))
    }

    /// Get the root directory of this cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if a plugin version is already cached.
    pub fn contains(&self, slug: &str, version: &str) -> bool {
        let dir = self.plugin_dir(slug, version);
        dir.join("plugin.tar").is_file() && dir.join("plugin.toml").is_file()
    }

    /// Get the cache entry for a plugin version, if it exists.
    pub fn get(&self, slug: &str, version: &str) -> Option<CacheEntry> {
        if !self.contains(slug, version) {
            return None;
        }
        let dir = self.plugin_dir(slug, version);
        Some(CacheEntry {
            manifest_path: dir.join("plugin.toml"),
            archive_path: dir.join("plugin.tar"),
            slug: slug.to_string(),
            version: version.to_string(),
        })
    }

    /// Store a plugin version in the cache.
    ///
    /// Returns the cache entry for the stored plugin.
    pub fn store(
        &self,
        slug: &str,
        version: &str,
        manifest_data: &[u8],
        archive_data: &[u8],
    ) -> Result<CacheEntry> {
        let dir = self.plugin_dir(slug, version);
        std::fs::create_dir_all(&dir).map_err(|e| RegistryError::CacheError {
            path: dir.clone(),
            detail: format!("creating cache dir: {e}"),
        })?;

        let manifest_path = dir.join("plugin.toml");
        let archive_path = dir.join("plugin.tar");

        std::fs::write(&manifest_path, manifest_data).map_err(|e| RegistryError::CacheError {
            path: manifest_path.clone(),
            detail: format!("writing manifest: {e}"),
        })?;

        std::fs::write(&archive_path, archive_data).map_err(|e| RegistryError::CacheError {
            path: archive_path.clone(),
            detail: format!("writing archive: {e}"),
        })?;

        // Write integrity record
        let archive_hash = ContentHash::compute(archive_data);
        let manifest_hash = ContentHash::compute(manifest_data);
        let integrity = serde_json::json!({
            "archive_hash": archive_hash.as_str(),
            "manifest_hash": manifest_hash.as_str(),
        });
        let integrity_path = dir.join("integrity.json");
        std::fs::write(&integrity_path, integrity.to_string()).map_err(|e| {
            RegistryError::CacheError {
                path: integrity_path,
                detail: format!("writing integrity: {e}"),
            }
        })?;

        Ok(CacheEntry {
            manifest_path,
            archive_path,
            slug: slug.to_string(),
            version: version.to_string(),
        })
    }

    /// Remove a specific plugin version from the cache.
    pub fn remove(&self, slug: &str, version: &str) -> Result<bool> {
        let dir = self.plugin_dir(slug, version);
        if dir.is_dir() {
            std::fs::remove_dir_all(&dir).map_err(|e| RegistryError::CacheError {
                path: dir,
                detail: format!("removing cache entry: {e}"),
            })?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// List all cached versions of a plugin.
    pub fn list_versions(&self, slug: &str) -> Result<Vec<String>> {
        let slug_dir = self.root.join(slug);
        if !slug_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in std::fs::read_dir(&slug_dir).map_err(|e| RegistryError::CacheError {
            path: slug_dir.clone(),
            detail: format!("listing versions: {e}"),
        })? {
            let entry = entry.map_err(|e| RegistryError::CacheError {
                path: slug_dir.clone(),
                detail: format!("reading entry: {e}"),
            })?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    versions.push(name.to_string());
                }
            }
        }
        versions.sort();
        Ok(versions)
    }

    /// Verify the integrity of a cached plugin version.
    pub fn verify_integrity(&self, slug: &str, version: &str) -> Result<bool> {
        let dir = self.plugin_dir(slug, version);
        let integrity_path = dir.join("integrity.json");

        if !integrity_path.is_file() {
            return Ok(false);
        }

        let integrity_str =
            std::fs::read_to_string(&integrity_path).map_err(|e| RegistryError::CacheError {
                path: integrity_path,
                detail: format!("reading integrity: {e}"),
            })?;

        let integrity: serde_json::Value = serde_json::from_str(&integrity_str)?;

        let expected_archive = integrity["archive_hash"].as_str().unwrap_or("");
        let expected_manifest = integrity["manifest_hash"].as_str().unwrap_or("");

        let archive_data =
            std::fs::read(dir.join("plugin.tar")).map_err(|e| RegistryError::CacheError {
                path: dir.join("plugin.tar"),
                detail: format!("reading archive: {e}"),
            })?;
        let manifest_data =
            std::fs::read(dir.join("plugin.toml")).map_err(|e| RegistryError::CacheError {
                path: dir.join("plugin.toml"),
                detail: format!("reading manifest: {e}"),
            })?;

        let actual_archive = ContentHash::compute(&archive_data);
        let actual_manifest = ContentHash::compute(&manifest_data);

        Ok(actual_archive.as_str() == expected_archive
            && actual_manifest.as_str() == expected_manifest)
    }

    fn plugin_dir(&self, slug: &str, version: &str) -> PathBuf {
        self.root.join(slug).join(version)
    }
}

/// Get the user's home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
