//! Plugin restore: reconcile declarations, then materialize.
//!
//! Mirrors the platform flow but keys on plugin id. Migration copies the
//! descriptor's per-plugin variables into the manifest verbatim; an entry
//! already present in the manifest wins over the descriptor's.

use anyhow::Result;

use crate::core::{install_source, plugin_installed, BatchReport};
use crate::ops::{HookContext, HookEvent, InstallOptions, Toolchain};
use crate::project::Project;

/// Restore declared plugins.
///
/// `targets` filters which plugins phase two may install; empty means every
/// declared plugin. Phase one always covers the full declaration set.
pub async fn restore_plugins(
    project: &mut Project,
    tools: &Toolchain,
    targets: &[String],
) -> Result<BatchReport> {
    let root = project.root().to_path_buf();
    let ctx = HookContext::plugins(targets);
    tools.hooks.fire(HookEvent::BeforePluginAdd, &root, &ctx).await?;

    migrate_plugins(project);
    project.manifest.save().await?;

    // the manifest is authoritative from here on
    let merged: Vec<String> = project.manifest.plugins().keys().cloned().collect();

    let mut report = BatchReport::new();
    for id in &merged {
        if !targets.is_empty() && !targets.iter().any(|t| t == id) {
            continue;
        }
        if plugin_installed(&root, id).await {
            report.record_skipped(id, "already installed");
            continue;
        }
        let source = install_source(id, project.manifest.dependency_spec(id));
        let variables = project.manifest.plugin_variables(id).cloned().unwrap_or_default();
        tracing::info!("installing plugin {id} from {source}");
        let opts = InstallOptions { variables };
        match tools.plugins.install(id, &source, &root, &opts).await {
            Ok(()) => report.record_done(id),
            Err(error) => report.record_failed(id, error),
        }
    }

    tools.hooks.fire(HookEvent::AfterPluginAdd, &root, &ctx).await?;
    Ok(report)
}

/// Add descriptor plugins the manifest lacks, variables copied verbatim.
/// The specifier lands under dev dependencies keyed by plugin id unless
/// either dependency map already pins the id.
fn migrate_plugins(project: &mut Project) {
    for decl in project.descriptor.plugins() {
        if !project.manifest.plugins().contains_key(&decl.id) {
            project.manifest.set_plugin(&decl.id, decl.variables.clone());
        }
        if let Some(spec) = decl.spec {
            if project.manifest.dependency_spec(&decl.id).is_none() {
                project.manifest.set_dev_dependency(&decl.id, &spec);
            }
        }
    }
}
