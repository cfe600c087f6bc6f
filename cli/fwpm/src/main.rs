//! fwpm — firmware plugin manager CLI.

mod commands;
mod installer;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use manifest::FwpmManifest;

#[derive(Parser)]
#[command(name = "fwpm", version, about = "Firmware plugin manager")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and install plugins
    Install {
        /// Plugins to install (slug or slug@constraint); all requested
        /// plugins from fwpm.toml if omitted
        plugins: Vec<String>,
        /// Link a local plugin directory instead of the catalog
        /// (slug=path, repeatable)
        #[arg(long)]
        link: Vec<String>,
    },
    /// Remove an installed plugin
    Remove {
        /// Plugin slug to remove
        slug: String,
    },
    /// List installed plugins
    List {
        /// List every plugin available in the catalog instead
        #[arg(long)]
        all: bool,
    },
    /// Show the resolved dependency tree
    Tree,
    /// Scaffold a new plugin
    New {
        /// Plugin slug
        slug: String,
    },
    /// Bump the version in the current plugin's plugin.toml
    Bump {
        /// Bump level: major, minor, or patch
        level: String,
    },
    /// Patch the firmware tree for plugin support
    Init {
        /// Firmware identifier override (branch/tag name or version)
        #[arg(long)]
        firmware: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Install { plugins, link } => {
            let (manifest, project_dir) = load_manifest_required(&cwd)?;
            commands::install::run(&project_dir, &manifest, &plugins, &link)
        }

        Commands::Remove { slug } => {
            let (_, project_dir) = load_manifest_required(&cwd)?;
            commands::remove::run(&project_dir, &slug)
        }

        Commands::List { all } => {
            let (manifest, project_dir) = load_manifest_required(&cwd)?;
            commands::list::run(&project_dir, &manifest, all)
        }

        Commands::Tree => {
            let (manifest, project_dir) = load_manifest_required(&cwd)?;
            commands::tree::run(&project_dir, &manifest)
        }

        Commands::New { slug } => commands::new::run(&cwd, &slug),

        Commands::Bump { level } => commands::bump::run(&cwd, &level),

        Commands::Init { firmware } => {
            let (_, project_dir) = load_manifest_required(&cwd)?;
            commands::init::run(&project_dir, firmware.as_deref())
        }
    }
}

fn load_manifest_required(cwd: &Path) -> anyhow::Result<(FwpmManifest, PathBuf)> {
    match FwpmManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((manifest, dir)),
        None => anyhow::bail!(
            "no fwpm.toml found in {} or any parent directory",
            cwd.display()
        ),
    }
}
