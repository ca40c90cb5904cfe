//! Platform removal.
//!
//! Simpler than the plugin machine: delete the platform directory, drop its
//! plugin registration file, persist the removal if requested, then hand
//! the backing package to the dependency uninstall. That uninstall rewrites
//! the manifest on disk, so the in-memory manifest is reloaded afterwards
//! to keep later targets working from fresh state.

use std::path::Path;

use anyhow::{anyhow, bail, Result};

use crate::core::{installed_platforms, platform_package, BatchReport};
use crate::ops::{HookContext, HookEvent, Toolchain};
use crate::project::{PlatformRegistration, Project};

use super::{RemovalError, RemovalStep, RemoveOptions};

/// Remove the named platforms from the project.
pub async fn remove_platforms(
    project: &mut Project,
    tools: &Toolchain,
    targets: &[String],
    opts: &RemoveOptions,
) -> Result<BatchReport> {
    if targets.is_empty() {
        bail!("No platforms given. Usage: cova platform rm <name> [<name> ...]");
    }
    let root = project.root().to_path_buf();
    let ctx = HookContext::platforms(targets);
    tools.hooks.fire(HookEvent::BeforePlatformRm, &root, &ctx).await?;

    let installed = installed_platforms(&root).await?;

    let mut report = BatchReport::new();
    for target in targets {
        match remove_one(project, tools, &root, &installed, target, opts).await {
            Ok(()) => report.record_done(target),
            Err(err) if err.step() == RemovalStep::PersistRemoval => return Err(err.into()),
            Err(err) => report.record_failed(target, err.into()),
        }
    }

    tools.hooks.fire(HookEvent::AfterPlatformRm, &root, &ctx).await?;
    Ok(report)
}

async fn remove_one(
    project: &mut Project,
    tools: &Toolchain,
    root: &Path,
    installed: &[String],
    target: &str,
    opts: &RemoveOptions,
) -> Result<(), RemovalError> {
    let declared = project.manifest.platforms().iter().any(|p| p == target)
        || project.descriptor.engines().iter().any(|e| e.name == target);
    if !installed.iter().any(|p| p == target) && !declared {
        return Err(RemovalError::new(
            RemovalStep::Validate,
            target,
            anyhow!("Platform {target} is not in this project"),
        ));
    }

    match tokio::fs::remove_dir_all(root.join("platforms").join(target)).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(RemovalError::new(RemovalStep::DirectoryRemoval, target, err.into()))
        }
    }

    PlatformRegistration::delete(root, target)
        .await
        .map_err(|cause| RemovalError::new(RemovalStep::RegistrationCleanup, target, cause.into()))?;

    if opts.save {
        if project.descriptor.remove_engine(target) {
            project.descriptor.persist().await.map_err(|cause| {
                RemovalError::new(RemovalStep::PersistRemoval, target, cause.into())
            })?;
        }
        project.manifest.remove_platform(target);
        project.manifest.save().await.map_err(|cause| {
            RemovalError::new(RemovalStep::PersistRemoval, target, cause.into())
        })?;
    }

    tools
        .dependencies
        .uninstall(&platform_package(target), root)
        .await
        .map_err(|cause| RemovalError::new(RemovalStep::DependencyUninstall, target, cause))?;

    // npm rewrote package.json; resync the staged copy
    project.manifest.reload().await.map_err(|cause| {
        RemovalError::new(RemovalStep::DependencyUninstall, target, cause.into())
    })?;

    Ok(())
}
