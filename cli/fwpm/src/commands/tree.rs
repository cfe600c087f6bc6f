//! `fwpm tree` — render the resolved dependency tree.

use std::path::Path;

use anyhow::{Context, Result};
use fwpm_registry::{format_tree, Catalog, LocalCatalog, Lockfile, ResolutionRequest};

use crate::manifest::FwpmManifest;

pub fn run(project_dir: &Path, manifest: &FwpmManifest) -> Result<()> {
    let lock_path = project_dir.join("fwpm.lock");

    // The lockfile is the snapshot of record; resolve fresh only when
    // there is none yet.
    let lock = if lock_path.is_file() {
        Lockfile::load(&lock_path).context("reading fwpm.lock")?
    } else {
        if manifest.plugins.is_empty() {
            println!("{}", manifest.project.name);
            println!("\nNo plugins.");
            return Ok(());
        }
        let request = ResolutionRequest::new(
            manifest
                .plugins
                .iter()
                .map(|(slug, text)| (slug.clone(), text.clone())),
        );
        let backend = LocalCatalog::new(manifest.catalog_dir(project_dir));
        let catalog = Catalog::from_backend(&backend).context("reading catalog")?;
        fwpm_registry::resolve(&request, &catalog)?
    };

    print!("{}", format_tree(&manifest.project.name, &lock));
    Ok(())
}
