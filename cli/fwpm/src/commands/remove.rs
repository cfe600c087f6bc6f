//! `fwpm remove` — uninstall a plugin and drop it from manifest and lock.

use std::path::Path;

use anyhow::{bail, Context, Result};
use fwpm_registry::Lockfile;

use crate::installer::PluginInstaller;
use crate::manifest;

pub fn run(project_dir: &Path, slug: &str) -> Result<()> {
    let installer = PluginInstaller::new(project_dir);
    let lock_path = project_dir.join("fwpm.lock");
    let mut lock = if lock_path.is_file() {
        Lockfile::load(&lock_path).context("reading fwpm.lock")?
    } else {
        Lockfile::default()
    };

    // Refuse while other locked plugins still depend on this one.
    let dependents = lock.dependents_of(slug);
    if !dependents.is_empty() {
        bail!(
            "cannot remove '{slug}': still required by {}",
            dependents.join(", ")
        );
    }

    let removed_install = installer.remove(slug)?;
    let removed_manifest = manifest::remove_plugin(project_dir, slug)?;
    let removed_lock = lock.plugins.remove(slug).is_some();
    lock.requests.remove(slug);
    lock.overrides.remove(slug);

    if removed_lock {
        lock.save(&lock_path).context("writing fwpm.lock")?;
    }

    if removed_install || removed_manifest || removed_lock {
        println!("Removed {slug}");
    } else {
        println!("Plugin {slug} is not installed.");
    }
    Ok(())
}
