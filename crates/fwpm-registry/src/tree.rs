//! Dependency tree display.
//!
//! Renders a resolved lockfile as a human-readable ASCII tree rooted at
//! the requested plugins:
//! ```text
//! firmware-project
//! ├── gps-tracker v1.2.0
//! │   └── mesh-core v1.4.2
//! └── telemetry v0.5.1
//!     └── mesh-core v1.4.2 (shared)
//! ```

use std::collections::BTreeSet;

use crate::lockfile::{LockSource, LockedPlugin, Lockfile};

/// Format a lockfile as a human-readable dependency tree.
///
/// `root_name` is the firmware project's own name. Roots are the
/// requested and linked plugins; a slug reached a second time is marked
/// `(shared)` and not expanded again, which also keeps cyclic manifests
/// from recursing forever.
pub fn format_tree(root_name: &str, lock: &Lockfile) -> String {
    let mut out = format!("{root_name}\n");

    let roots: Vec<&String> = lock
        .requests
        .keys()
        .chain(lock.overrides.keys().filter(|s| !lock.requests.contains_key(*s)))
        .collect();

    let mut seen = BTreeSet::new();
    let count = roots.len();
    for (i, slug) in roots.iter().enumerate() {
        format_entry(&mut out, lock, slug, "", i == count - 1, &mut seen);
    }

    out.push_str(&format!(
        "\n{} plugins locked ({} pending)\n",
        lock.plugins.len(),
        lock.plugins
            .values()
            .filter(|e| matches!(e.source, LockSource::Pending))
            .count()
    ));

    out
}

/// Recursively format one lock entry.
fn format_entry(
    out: &mut String,
    lock: &Lockfile,
    slug: &str,
    prefix: &str,
    is_last: bool,
    seen: &mut BTreeSet<String>,
) {
    let connector = if is_last { "└── " } else { "├── " };

    let Some(entry) = lock.plugins.get(slug) else {
        out.push_str(&format!("{prefix}{connector}{slug} (missing)\n"));
        return;
    };

    let shared = !seen.insert(slug.to_string());
    let label = entry_label(slug, entry);
    let marker = if shared { " (shared)" } else { "" };
    out.push_str(&format!("{prefix}{connector}{label}{marker}\n"));

    if shared {
        return;
    }

    let child_prefix = if is_last {
        format!("{prefix}    ")
    } else {
        format!("{prefix}│   ")
    };

    let child_count = entry.dependencies.len();
    for (i, dep) in entry.dependencies.keys().enumerate() {
        format_entry(out, lock, dep, &child_prefix, i == child_count - 1, seen);
    }
}

fn entry_label(slug: &str, entry: &LockedPlugin) -> String {
    match (&entry.source, &entry.version) {
        (LockSource::Pending, _) => format!("{slug} (pending)"),
        (LockSource::Local { path }, Some(v)) => {
            format!("{slug} v{v} (linked from {})", path.display())
        }
        (_, Some(v)) => format!("{slug} v{v}"),
        (_, None) => slug.to_string(),
    }
}

/// Format a flat list of all locked plugins (lock file style).
pub fn format_lock(lock: &Lockfile) -> String {
    let mut out = String::new();
    for (slug, entry) in &lock.plugins {
        let version = entry
            .version
            .as_ref()
            .map(|v| format!(" v{v}"))
            .unwrap_or_default();
        let checksum = entry
            .checksum
            .as_deref()
            .map(|h| format!(" (sha256:{:.12})", h))
            .unwrap_or_default();
        out.push_str(&format!("{slug}{version}{checksum}\n"));
    }
    out
}
