//! `fwpm list` — installed plugins, or the whole catalog with `--all`.

use std::path::Path;

use anyhow::{Context, Result};
use fwpm_registry::{Catalog, LocalCatalog, Lockfile};

use crate::installer::PluginInstaller;
use crate::manifest::FwpmManifest;

pub fn run(project_dir: &Path, manifest: &FwpmManifest, all: bool) -> Result<()> {
    if all {
        list_catalog(project_dir, manifest)
    } else {
        list_installed(project_dir)
    }
}

fn list_catalog(project_dir: &Path, manifest: &FwpmManifest) -> Result<()> {
    let backend = LocalCatalog::new(manifest.catalog_dir(project_dir));
    let catalog = Catalog::from_backend(&backend).context("reading catalog")?;

    if catalog.is_empty() {
        println!("Catalog is empty.");
        return Ok(());
    }

    println!("Available plugins ({}):", catalog.len());
    for slug in catalog.slugs() {
        let versions = catalog.versions(slug);
        let Some(latest) = versions.last() else {
            continue;
        };
        let description = catalog
            .manifest(slug, latest)
            .and_then(|m| m.plugin.description.clone())
            .unwrap_or_default();
        let version = format!("v{latest}");
        println!("  {slug:<20} {version:<12} {description}");
    }
    Ok(())
}

fn list_installed(project_dir: &Path) -> Result<()> {
    let installer = PluginInstaller::new(project_dir);
    let installed = installer.installed()?;

    if installed.is_empty() {
        println!("No plugins installed.");
        return Ok(());
    }

    let lock_path = project_dir.join("fwpm.lock");
    let lock = if lock_path.is_file() {
        Lockfile::load(&lock_path).context("reading fwpm.lock")?
    } else {
        Lockfile::default()
    };

    println!("Installed plugins ({}):", installed.len());
    for slug in installed {
        let version = lock
            .plugins
            .get(&slug)
            .and_then(|e| e.version.as_ref())
            .map(|v| format!("v{v}"))
            .unwrap_or_else(|| "unknown".to_string());
        println!("  {slug:<20} {version}");
    }
    Ok(())
}
