//! Plugin materialization under `plugins/`.
//!
//! Registry plugins are unpacked from their cached archives; linked
//! plugins become symlinks to the developer's working copy. Every
//! installed plugin must carry a `src/` directory; the firmware build
//! picks sources up from there.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Handles installation and removal of plugins in a firmware tree.
pub struct PluginInstaller {
    plugins_dir: PathBuf,
}

impl PluginInstaller {
    /// Create an installer for a firmware project directory.
    pub fn new(project_dir: &Path) -> Self {
        PluginInstaller {
            plugins_dir: project_dir.join("plugins"),
        }
    }

    /// Unpack a plugin archive into `plugins/<slug>/`, replacing any
    /// previous installation.
    pub fn install_archive(&self, slug: &str, archive: &[u8]) -> Result<()> {
        let plugin_dir = self.plugins_dir.join(slug);
        self.clear(&plugin_dir)?;
        std::fs::create_dir_all(&plugin_dir)
            .with_context(|| format!("creating {}", plugin_dir.display()))?;

        let mut tar = tar::Archive::new(Cursor::new(archive));
        tar.unpack(&plugin_dir)
            .with_context(|| format!("unpacking archive for '{slug}'"))?;

        if !plugin_dir.join("src").is_dir() {
            std::fs::remove_dir_all(&plugin_dir).ok();
            bail!("plugin '{slug}' archive has no src/ directory");
        }
        Ok(())
    }

    /// Link a local plugin directory into `plugins/<slug>/`.
    pub fn link(&self, slug: &str, local_path: &Path) -> Result<()> {
        if !local_path.is_dir() {
            bail!("link target is not a directory: {}", local_path.display());
        }
        if !local_path.join("src").is_dir() {
            bail!(
                "plugin directory must contain a src/ directory: {}",
                local_path.display()
            );
        }

        let plugin_dir = self.plugins_dir.join(slug);
        self.clear(&plugin_dir)?;
        std::fs::create_dir_all(&self.plugins_dir)?;

        let absolute = local_path
            .canonicalize()
            .with_context(|| format!("resolving {}", local_path.display()))?;
        symlink_dir(&absolute, &plugin_dir)
            .with_context(|| format!("linking '{slug}'"))?;
        Ok(())
    }

    /// Remove an installed plugin. Returns whether it was present.
    pub fn remove(&self, slug: &str) -> Result<bool> {
        let plugin_dir = self.plugins_dir.join(slug);
        if !plugin_dir.exists() && !plugin_dir.is_symlink() {
            return Ok(false);
        }
        self.clear(&plugin_dir)?;
        Ok(true)
    }

    /// Check if a plugin is installed (or linked).
    pub fn is_installed(&self, slug: &str) -> bool {
        self.plugins_dir.join(slug).join("src").is_dir()
    }

    /// Slugs of all installed plugins, sorted.
    pub fn installed(&self) -> Result<Vec<String>> {
        if !self.plugins_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut slugs = Vec::new();
        for entry in std::fs::read_dir(&self.plugins_dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if self.is_installed(&name) {
                slugs.push(name);
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    /// Delete whatever sits at `path`, symlink or directory.
    fn clear(&self, path: &Path) -> Result<()> {
        if path.is_symlink() {
            std::fs::remove_file(path)
                .with_context(|| format!("unlinking {}", path.display()))?;
        } else if path.is_dir() {
            std::fs::remove_dir_all(path)
                .with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
