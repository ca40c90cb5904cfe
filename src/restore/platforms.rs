//! Platform restore: reconcile declarations, then materialize.
//!
//! Phase one merges the descriptor's `<engine>` declarations and app
//! front-matter into the manifest and saves it once if anything changed.
//! After the merge the manifest is the single source of truth. Phase two
//! walks the merged platform list strictly in order and installs whatever
//! the probe says is missing.

use anyhow::Result;

use crate::core::{install_source, platform_installed, platform_package, BatchReport};
use crate::ops::{HookContext, HookEvent, InstallOptions, Toolchain};
use crate::project::Project;

/// Restore declared platforms.
///
/// `targets` filters which platforms phase two may install; empty means
/// every declared platform. Phase one always covers the full declaration
/// set regardless of the filter.
pub async fn restore_platforms(
    project: &mut Project,
    tools: &Toolchain,
    targets: &[String],
) -> Result<BatchReport> {
    let root = project.root().to_path_buf();
    let ctx = HookContext::platforms(targets);
    tools.hooks.fire(HookEvent::BeforePlatformAdd, &root, &ctx).await?;

    sync_front_matter(project);
    migrate_engines(project);
    project.manifest.save().await?;

    // the manifest is authoritative from here on
    let merged: Vec<String> = project.manifest.platforms().to_vec();

    let mut report = BatchReport::new();
    for name in &merged {
        if !targets.is_empty() && !targets.iter().any(|t| t == name) {
            continue;
        }
        if platform_installed(&root, name).await {
            report.record_skipped(name, "already installed");
            continue;
        }
        let package = platform_package(name);
        let source = install_source(&package, project.manifest.dependency_spec(&package));
        tracing::info!("installing platform {name} from {source}");
        match tools.platforms.install(name, &source, &root, &InstallOptions::default()).await {
            Ok(()) => report.record_done(name),
            Err(error) => report.record_failed(name, error),
        }
    }

    tools.hooks.fire(HookEvent::AfterPlatformAdd, &root, &ctx).await?;
    Ok(report)
}

/// Copy app identity from the descriptor into blank manifest fields.
fn sync_front_matter(project: &mut Project) {
    if project.manifest.name().is_none() {
        if let Some(id) = project.descriptor.app_id() {
            let name = id.to_lowercase();
            project.manifest.set_name(&name);
        }
    }
    if project.manifest.version().is_none() {
        if let Some(version) = project.descriptor.app_version() {
            let version = version.to_string();
            project.manifest.set_version(&version);
        }
    }
    if project.manifest.display_name().is_none() {
        if let Some(display) = project.descriptor.display_name() {
            project.manifest.set_display_name(&display);
        }
    }
}

/// Add descriptor engines the manifest lacks: the name joins the platform
/// list, the specifier lands under dev dependencies keyed by the platform
/// package name, unless either dependency map already pins it.
fn migrate_engines(project: &mut Project) {
    for engine in project.descriptor.engines() {
        project.manifest.add_platform(&engine.name);
        if let Some(spec) = engine.spec {
            let package = platform_package(&engine.name);
            if project.manifest.dependency_spec(&package).is_none() {
                project.manifest.set_dev_dependency(&package, &spec);
            }
        }
    }
}
