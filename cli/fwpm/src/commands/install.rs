//! `fwpm install` — resolve requested plugins, lock, and materialize.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fwpm_registry::{
    Catalog, CatalogBackend, ContentHash, LocalCatalog, LocalSource, LockSource, LockState,
    Lockfile, PluginCache, PluginManifest, ResolutionRequest,
};

use crate::installer::PluginInstaller;
use crate::manifest::{self, FwpmManifest};

/// Run the install flow.
///
/// `plugins` are explicit `slug` / `slug@constraint` specs; when empty,
/// the request set comes from `fwpm.toml`. `links` are `slug=path`
/// local-source overrides.
pub fn run(
    project_dir: &Path,
    manifest: &FwpmManifest,
    plugins: &[String],
    links: &[String],
) -> Result<()> {
    let explicit = parse_specs(plugins)?;
    let overrides = parse_links(links)?;

    let mut request = ResolutionRequest::default();
    let requested = if explicit.is_empty() {
        manifest.plugins.clone()
    } else {
        explicit.clone()
    };
    for (slug, text) in &requested {
        request.request(slug.clone(), text.clone());
    }
    for (slug, source) in overrides {
        request.link(slug, source);
    }

    if request.requests.is_empty() && request.overrides.is_empty() {
        println!("No plugins requested.");
        return Ok(());
    }

    let backend = LocalCatalog::new(manifest.catalog_dir(project_dir));
    let lock_path = project_dir.join("fwpm.lock");

    let existing = if lock_path.is_file() {
        Some(Lockfile::load(&lock_path).context("reading fwpm.lock")?)
    } else {
        None
    };

    let (mut lock, fresh) = match existing {
        Some(lock) if lock.validate(&request) == LockState::Reusable => {
            println!("Lockfile up to date; using locked versions.");
            (lock, false)
        }
        _ => {
            println!("Resolving plugins...");
            let catalog = Catalog::from_backend(&backend).context("reading catalog")?;
            let lock = fwpm_registry::resolve(&request, &catalog)?;
            (lock, true)
        }
    };

    let installer = PluginInstaller::new(project_dir);
    let cache = PluginCache::new(project_dir.join(".fwpm").join("cache"));

    for (slug, entry) in lock.plugins.iter_mut() {
        match &entry.source {
            LockSource::Registry { .. } => {
                let Some(version) = entry.version.clone() else {
                    continue;
                };
                if !fresh && entry.checksum.is_some() && installer.is_installed(slug) {
                    continue;
                }

                let version_str = version.to_string();
                let archive = match cache.get(slug, &version_str) {
                    Some(cached) => std::fs::read(&cached.archive_path)
                        .with_context(|| format!("reading cached archive for '{slug}'"))?,
                    None => {
                        let bytes = backend
                            .archive(slug, &version)
                            .with_context(|| format!("fetching '{slug}@{version}'"))?;
                        let manifest_toml =
                            backend.manifest(slug, &version)?.to_toml()?;
                        cache.store(slug, &version_str, manifest_toml.as_bytes(), &bytes)?;
                        bytes
                    }
                };

                entry.checksum = Some(ContentHash::compute(&archive).as_str().to_string());
                installer.install_archive(slug, &archive)?;
                println!("  installed {slug} v{version}");
            }
            LockSource::Local { path } => {
                installer.link(slug, path)?;
                println!("  linked {slug} from {}", path.display());
            }
            LockSource::Pending => {
                println!("  {slug}: pending (link it with --link {slug}=<path>)");
            }
        }
    }

    // Record explicit requests back into fwpm.toml; a bare request is
    // pinned to the compatible range of what was just resolved, and the
    // lock's request snapshot follows so the next manifest-driven
    // install validates as reusable.
    for (slug, text) in &explicit {
        let recorded = if text == "*" {
            match lock.plugins.get(slug).and_then(|e| e.version.as_ref()) {
                Some(version) => fwpm_registry::compatible_with(version).to_string(),
                None => text.clone(),
            }
        } else {
            text.clone()
        };
        manifest::add_plugin(project_dir, slug, &recorded)?;
        lock.requests.insert(slug.clone(), recorded);
    }

    lock.save(&lock_path).context("writing fwpm.lock")?;
    println!("Locked {} plugins.", lock.plugins.len());
    Ok(())
}

/// Parse `slug` / `slug@constraint` specs; a bare slug means "latest".
fn parse_specs(plugins: &[String]) -> Result<BTreeMap<String, String>> {
    let mut specs = BTreeMap::new();
    for spec in plugins {
        let (slug, text) = match spec.split_once('@') {
            Some((slug, text)) => (slug, text),
            None => (spec.as_str(), "*"),
        };
        if slug.is_empty() {
            bail!("invalid plugin spec '{spec}'");
        }
        fwpm_registry::parse_constraint(text)
            .with_context(|| format!("in plugin spec '{spec}'"))?;
        specs.insert(slug.to_string(), text.to_string());
    }
    Ok(specs)
}

/// Parse `slug=path` link specs, loading each linked plugin's manifest.
fn parse_links(links: &[String]) -> Result<BTreeMap<String, LocalSource>> {
    let mut sources = BTreeMap::new();
    for link in links {
        let Some((slug, path)) = link.split_once('=') else {
            bail!("invalid link spec '{link}' (expected slug=path)");
        };
        let path = PathBuf::from(path);
        let manifest = PluginManifest::load(&path.join("plugin.toml"))
            .with_context(|| format!("loading manifest of linked plugin '{slug}'"))?;
        if manifest.plugin.slug != slug {
            bail!(
                "linked directory declares slug '{}', not '{slug}'",
                manifest.plugin.slug
            );
        }
        sources.insert(slug.to_string(), LocalSource { path, manifest });
    }
    Ok(sources)
}
