//! Installed-state probing.
//!
//! Declared state lives in the config stores; installed state is whatever
//! actually sits under `platforms/` and `plugins/`. Every flow that needs
//! to know what is materialized asks the filesystem, never the stores.

use std::io;
use std::path::Path;

/// List the visible subdirectory names of `dir`, sorted.
///
/// A missing directory probes as empty, not as an error. Hidden entries
/// and plain files (fetch ledgers, platform registrations) are ignored.
async fn dir_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(names),
        Err(err) => return Err(err),
    };
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        // follow symlinks so listing agrees with the per-name checks below;
        // a dangling link is not an installation
        match tokio::fs::metadata(entry.path()).await {
            Ok(meta) if meta.is_dir() => names.push(name),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
    }
    names.sort();
    Ok(names)
}

/// Platforms materialized under `<root>/platforms`.
pub async fn installed_platforms(root: &Path) -> io::Result<Vec<String>> {
    dir_names(&root.join("platforms")).await
}

/// Plugins materialized under `<root>/plugins`.
pub async fn installed_plugins(root: &Path) -> io::Result<Vec<String>> {
    dir_names(&root.join("plugins")).await
}

pub async fn platform_installed(root: &Path, name: &str) -> bool {
    tokio::fs::metadata(root.join("platforms").join(name))
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

pub async fn plugin_installed(root: &Path, id: &str) -> bool {
    tokio::fs::metadata(root.join("plugins").join(id))
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}
