//! `fwpm new` — plugin scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Create a new plugin skeleton at `parent/<slug>/`.
pub fn run(parent: &Path, slug: &str) -> Result<()> {
    let plugin_dir = parent.join(slug);
    if plugin_dir.exists() {
        bail!("directory '{}' already exists", plugin_dir.display());
    }

    fs::create_dir_all(plugin_dir.join("src")).context("creating src/ directory")?;

    let manifest = format!(
        r#"[plugin]
slug = "{slug}"
version = "0.1.0"
description = ""

[dependencies]
"#
    );
    fs::write(plugin_dir.join("plugin.toml"), manifest).context("writing plugin.toml")?;

    let source = format!("// {slug} plugin entry point\n");
    fs::write(plugin_dir.join("src").join("plugin.cpp"), source)
        .context("writing src/plugin.cpp")?;

    println!("Created plugin '{slug}'");
    println!("  {slug}/plugin.toml");
    println!("  {slug}/src/plugin.cpp");
    Ok(())
}
