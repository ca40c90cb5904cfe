//! npm-backed operation primitives.
//!
//! Fetching goes through the host `npm` executable with `--no-save`, so the
//! manifest adapter stays the only writer of declared state. Materialization
//! then copies the fetched package out of `node_modules/` into the project
//! tree. Dependency uninstall deliberately omits `--no-save`: its contract
//! includes stripping the package from the manifest dependency maps.

use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use walkdir::WalkDir;

use crate::core::{installed_platforms, platform_package};
use crate::project::{FetchLedger, PlatformRegistration};

use super::{DependencyOps, InstallOptions, PlatformOps, PluginOps, UninstallOptions};

/// Thin wrapper over the npm executable.
#[derive(Debug, Clone)]
pub struct NpmClient {
    program: String,
}

impl Default for NpmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NpmClient {
    pub fn new() -> Self {
        Self { program: "npm".to_string() }
    }

    /// Use a different executable, e.g. a stub in tests.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    async fn run(&self, root: &Path, args: &[&str]) -> Result<()> {
        tracing::debug!("{} {}", self.program, args.join(" "));
        let output = tokio::process::Command::new(&self.program)
            .args(args)
            .current_dir(root)
            .output()
            .await
            .with_context(|| format!("Failed to spawn {}", self.program))?;
        if !output.status.success() {
            bail!(
                "{} {} exited with {}: {}",
                self.program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    /// Fetch `target` into `node_modules/` without touching the manifest.
    pub async fn fetch(&self, target: &str, root: &Path) -> Result<()> {
        self.run(root, &["install", target, "--no-save", "--no-audit", "--no-fund"]).await
    }
}

#[async_trait]
impl DependencyOps for NpmClient {
    async fn uninstall(&self, package: &str, root: &Path) -> Result<()> {
        self.run(root, &["uninstall", package, "--no-audit", "--no-fund"]).await
    }
}

/// Platform primitives: npm fetch plus a tree copy into `platforms/`.
pub struct NpmPlatformOps {
    npm: NpmClient,
}

impl NpmPlatformOps {
    pub fn new(npm: NpmClient) -> Self {
        Self { npm }
    }
}

#[async_trait]
impl PlatformOps for NpmPlatformOps {
    async fn install(
        &self,
        name: &str,
        source: &str,
        root: &Path,
        _opts: &InstallOptions,
    ) -> Result<()> {
        self.npm.fetch(source, root).await?;
        let package = platform_package(name);
        let fetched = root.join("node_modules").join(&package);
        if !fetched.is_dir() {
            bail!("Fetched {source} but {package} did not appear under node_modules");
        }
        copy_tree(&fetched, &root.join("platforms").join(name))
            .with_context(|| format!("Failed to materialize platform {name}"))?;
        // seed an empty plugin registration for the new platform
        PlatformRegistration::load(root, name).await?.save().await?;
        Ok(())
    }

    async fn prepare(&self, platforms: &[String], root: &Path) -> Result<()> {
        let www = root.join("www");
        if !www.is_dir() {
            return Ok(());
        }
        for platform in platforms {
            let platform_dir = root.join("platforms").join(platform);
            if !platform_dir.is_dir() {
                continue;
            }
            tracing::debug!("refreshing assets for {platform}");
            let dest = platform_dir.join("www");
            remove_dir_if_present(&dest).await?;
            copy_tree(&www, &dest)
                .with_context(|| format!("Failed to prepare platform {platform}"))?;
        }
        Ok(())
    }
}

/// Plugin primitives: npm fetch, tree copy into `plugins/`, registration
/// bookkeeping per installed platform, and a fetch-ledger entry.
pub struct NpmPluginOps {
    npm: NpmClient,
}

impl NpmPluginOps {
    pub fn new(npm: NpmClient) -> Self {
        Self { npm }
    }
}

#[async_trait]
impl PluginOps for NpmPluginOps {
    async fn install(
        &self,
        id: &str,
        source: &str,
        root: &Path,
        opts: &InstallOptions,
    ) -> Result<()> {
        self.npm.fetch(source, root).await?;
        let fetched = root.join("node_modules").join(id);
        if !fetched.is_dir() {
            bail!(
                "Fetched {source} but {id} did not appear under node_modules; \
                 a plugin's id must match its package name"
            );
        }
        copy_tree(&fetched, &root.join("plugins").join(id))
            .with_context(|| format!("Failed to materialize plugin {id}"))?;

        for platform in installed_platforms(root).await? {
            let mut registration = PlatformRegistration::load(root, &platform).await?;
            registration.register(id, opts.variables.clone());
            registration.save().await?;
        }

        let mut ledger = FetchLedger::load(root)?;
        ledger.insert(
            id,
            serde_json::json!({
                "source": source,
                "is_top_level": true,
                "variables": opts.variables,
            }),
        );
        ledger.save()?;
        Ok(())
    }

    async fn uninstall_from_platform(
        &self,
        id: &str,
        platform: &str,
        root: &Path,
        _opts: &UninstallOptions,
    ) -> Result<bool> {
        let mut registration = PlatformRegistration::load(root, platform).await?;
        if registration.unregister(id) {
            registration.save().await?;
        }
        // registration edits never run a prepare pass of their own
        Ok(false)
    }

    async fn uninstall_package(&self, id: &str, root: &Path) -> Result<()> {
        remove_dir_if_present(&root.join("plugins").join(id)).await?;
        Ok(())
    }
}

/// Recursively copy `src` into `dest`. Symlinks are not followed or copied.
fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

async fn remove_dir_if_present(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
