//! `fwpm bump` — bump the version in the current plugin's manifest.

use std::path::Path;

use anyhow::{bail, Context, Result};
use fwpm_registry::{PluginManifest, Version};

pub fn run(plugin_dir: &Path, level: &str) -> Result<()> {
    let manifest_path = plugin_dir.join("plugin.toml");
    if !manifest_path.is_file() {
        bail!("no plugin.toml found in {}", plugin_dir.display());
    }

    let manifest = PluginManifest::load(&manifest_path)?;
    let current = manifest.version();
    let next = match level {
        "major" => Version::new(current.major + 1, 0, 0),
        "minor" => Version::new(current.major, current.minor + 1, 0),
        "patch" => Version::new(current.major, current.minor, current.patch + 1),
        _ => bail!("invalid bump level '{level}' (expected major, minor, or patch)"),
    };

    // Edit the document in place so unrelated entries keep their shape.
    let content = std::fs::read_to_string(&manifest_path)?;
    let mut doc: toml::Table = content.parse().context("parsing plugin.toml")?;
    if let Some(toml::Value::Table(plugin)) = doc.get_mut("plugin") {
        plugin.insert(
            "version".to_string(),
            toml::Value::String(next.to_string()),
        );
    }
    std::fs::write(&manifest_path, doc.to_string())?;

    println!(
        "Bumped {}: {current} -> {next} ({level})",
        manifest.plugin.slug
    );
    Ok(())
}
