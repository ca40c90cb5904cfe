//! Plugin removal state machine.
//!
//! Per target: validate (with one prefix retry), detach from every
//! installed platform, remove the package directory, persist the removal
//! if requested, drop the fetch-ledger entry. If any platform-level
//! uninstall reports that it did not run a prepare pass itself, one
//! explicit prepare covers all targets after the batch.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

use crate::core::{installed_platforms, installed_plugins, BatchReport};
use crate::ops::{HookContext, HookEvent, Toolchain, UninstallOptions};
use crate::project::{FetchLedger, PlatformRegistration, Project};

use super::{RemovalError, RemovalStep, RemoveOptions};

/// Conventional plugin id prefix tried once during validation.
const PLUGIN_ID_PREFIX: &str = "cordova-plugin-";

/// Remove the named plugins from the project.
pub async fn remove_plugins(
    project: &mut Project,
    tools: &Toolchain,
    targets: &[String],
    opts: &RemoveOptions,
) -> Result<BatchReport> {
    if targets.is_empty() {
        bail!("No plugin ids given. Usage: cova plugin rm <id> [<id> ...]");
    }
    let root = project.root().to_path_buf();
    let ctx = HookContext::plugins(targets);
    tools.hooks.fire(HookEvent::BeforePluginRm, &root, &ctx).await?;

    let mut removal = PluginRemoval {
        project,
        tools,
        installed: installed_plugins(&root).await?,
        platforms: installed_platforms(&root).await?,
        root,
        save: opts.save,
        needs_prepare: false,
    };

    let mut report = BatchReport::new();
    for target in targets {
        match removal.remove_one(target).await {
            Ok(id) => report.record_done(id),
            Err(err) if err.step() == RemovalStep::PersistRemoval => return Err(err.into()),
            Err(err) => {
                let name = err.target().to_string();
                report.record_failed(name, err.into());
            }
        }
    }

    if removal.needs_prepare {
        removal.tools.platforms.prepare(&removal.platforms, &removal.root).await?;
    }

    tools.hooks.fire(HookEvent::AfterPluginRm, &removal.root, &ctx).await?;
    Ok(report)
}

struct PluginRemoval<'a> {
    project: &'a mut Project,
    tools: &'a Toolchain,
    root: PathBuf,
    installed: Vec<String>,
    platforms: Vec<String>,
    save: bool,
    needs_prepare: bool,
}

impl PluginRemoval<'_> {
    /// Walk one target through the whole machine. Returns the resolved id.
    async fn remove_one(&mut self, target: &str) -> Result<String, RemovalError> {
        let id = self.validate(target)?;

        for platform in self.platforms.clone() {
            let variables = self.variable_overrides(&id, &platform).await?;
            let opts = UninstallOptions { variables };
            let did_prepare = self
                .tools
                .plugins
                .uninstall_from_platform(&id, &platform, &self.root, &opts)
                .await
                .map_err(|cause| {
                    RemovalError::new(RemovalStep::PlatformUninstall, &id, cause)
                })?;
            if !did_prepare {
                self.needs_prepare = true;
            }
        }

        self.tools
            .plugins
            .uninstall_package(&id, &self.root)
            .await
            .map_err(|cause| RemovalError::new(RemovalStep::PackageUninstall, &id, cause))?;

        if self.save {
            self.persist_removal(&id).await?;
        }

        // the ledger entry goes regardless of --no-save
        FetchLedger::remove_entry(&self.root, &id).map_err(|cause| {
            RemovalError::new(RemovalStep::MetadataCleanup, &id, cause.into())
        })?;

        Ok(id)
    }

    /// Exact id match, or one retry with the conventional prefix prepended.
    fn validate(&self, target: &str) -> Result<String, RemovalError> {
        let mut candidates = vec![target.to_string()];
        if !target.starts_with(PLUGIN_ID_PREFIX) {
            candidates.push(format!("{PLUGIN_ID_PREFIX}{target}"));
        }
        for candidate in candidates {
            if self.installed.iter().any(|id| id == &candidate) {
                if candidate != target {
                    tracing::debug!("resolved plugin {target} as {candidate}");
                }
                return Ok(candidate);
            }
        }
        Err(RemovalError::new(
            RemovalStep::Validate,
            target,
            anyhow!("Plugin {target} is not installed in this project"),
        ))
    }

    /// Declared variables with the platform registration's values on top.
    async fn variable_overrides(
        &self,
        id: &str,
        platform: &str,
    ) -> Result<BTreeMap<String, String>, RemovalError> {
        let mut variables =
            self.project.descriptor.plugin(id).map(|decl| decl.variables).unwrap_or_default();
        let registration =
            PlatformRegistration::load(&self.root, platform).await.map_err(|cause| {
                RemovalError::new(RemovalStep::PlatformUninstall, id, cause.into())
            })?;
        if let Some(overrides) = registration.variables_for(id) {
            for (name, value) in overrides {
                variables.insert(name.clone(), value.clone());
            }
        }
        Ok(variables)
    }

    async fn persist_removal(&mut self, id: &str) -> Result<(), RemovalError> {
        if self.project.descriptor.remove_plugin(id) {
            self.project.descriptor.persist().await.map_err(|cause| {
                RemovalError::new(RemovalStep::PersistRemoval, id, cause.into())
            })?;
        }
        self.project.manifest.remove_plugin(id);
        self.project
            .manifest
            .save()
            .await
            .map_err(|cause| RemovalError::new(RemovalStep::PersistRemoval, id, cause.into()))?;
        Ok(())
    }
}
