//! `fwpm init` — patch the firmware tree for plugin support.

use std::path::Path;

use anyhow::{bail, Result};
use fwpm_patch::{apply, select, FirmwareId, PatchBundle, PatchError, PatchSet};

pub fn run(project_dir: &Path, firmware: Option<&str>) -> Result<()> {
    let id = match firmware {
        Some(text) => FirmwareId::parse(text),
        None => FirmwareId::detect(project_dir),
    };
    if id.is_unknown() {
        bail!(
            "could not identify the firmware tree (no branch in .git/HEAD, \
             no version.properties); pass --firmware"
        );
    }

    let patches_dir = project_dir.join("patches");
    let set = PatchSet::load(&patches_dir)?;

    let entry = match select(&id, &set) {
        Ok(entry) => entry,
        Err(PatchError::NoCompatiblePatch { wanted }) => {
            let available: Vec<String> = set
                .iter()
                .filter_map(|e| e.path.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            bail!(
                "no compatible firmware patch for {wanted}\n  available patches: [{}]",
                available.join(", ")
            );
        }
        Err(e) => return Err(e.into()),
    };

    println!("Selected patch {} for {}", entry.artifact, id.describe());

    let bundle = PatchBundle::load(&entry.path)?;
    let report = apply(&bundle, project_dir)?;

    if report.is_noop() {
        println!("Patch already applied.");
        return Ok(());
    }

    for path in &report.applied {
        println!("  patched {}", path.display());
    }
    for path in &report.created {
        println!("  created {}", path.display());
    }

    if report.is_clean() {
        println!("Firmware patch applied.");
    } else {
        println!("Patch conflicts detected; resolve the markers manually:");
        for path in &report.conflicted {
            println!("  {}", path.display());
        }
    }
    Ok(())
}
