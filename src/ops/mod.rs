//! External operation primitives.
//!
//! The restore and removal flows never touch npm or hook scripts directly;
//! they go through the traits in this module so tests can substitute
//! recording fakes.
//!
//! ## Contracts
//!
//! - Platform and plugin installs materialize directories; the flows decide
//!   *whether* to call them, the primitives decide *how*
//! - Plugin uninstall from a platform reports whether it already ran a
//!   prepare pass, so the flow can skip a redundant one
//! - Dependency uninstall removes the package from `node_modules/` **and**
//!   from the manifest dependency maps (npm rewrites `package.json`)

mod hooks;
mod npm;

pub use hooks::{HookContext, HookEvent, HookRunner, NoopHooks, ScriptHooks};
pub use npm::{NpmClient, NpmPlatformOps, NpmPluginOps};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

/// Options handed to install primitives.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Plugin variables by name. Empty for platform installs.
    pub variables: BTreeMap<String, String>,
}

/// Options handed to uninstall primitives.
#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    /// Variables the plugin was installed with.
    pub variables: BTreeMap<String, String>,
}

/// Platform-level operations.
#[async_trait]
pub trait PlatformOps: Send + Sync {
    /// Materialize platform `name` under `platforms/` from `source`.
    async fn install(
        &self,
        name: &str,
        source: &str,
        root: &Path,
        opts: &InstallOptions,
    ) -> anyhow::Result<()>;

    /// Regenerate platform project files from current plugin state.
    async fn prepare(&self, platforms: &[String], root: &Path) -> anyhow::Result<()>;
}

/// Plugin-level operations.
#[async_trait]
pub trait PluginOps: Send + Sync {
    /// Materialize plugin `id` under `plugins/` from `source` and register
    /// it with every installed platform.
    async fn install(
        &self,
        id: &str,
        source: &str,
        root: &Path,
        opts: &InstallOptions,
    ) -> anyhow::Result<()>;

    /// Detach plugin `id` from one installed platform.
    ///
    /// Returns `true` when the uninstall already ran a prepare pass of its
    /// own, so the caller can skip scheduling another.
    async fn uninstall_from_platform(
        &self,
        id: &str,
        platform: &str,
        root: &Path,
        opts: &UninstallOptions,
    ) -> anyhow::Result<bool>;

    /// Remove the plugin's package directory under `plugins/`.
    async fn uninstall_package(&self, id: &str, root: &Path) -> anyhow::Result<()>;
}

/// Dependency-fetch operations over the package cache.
#[async_trait]
pub trait DependencyOps: Send + Sync {
    /// Remove `package` from `node_modules/` and the manifest dependency
    /// maps. The on-disk manifest changes; in-memory copies go stale.
    async fn uninstall(&self, package: &str, root: &Path) -> anyhow::Result<()>;
}

/// The full set of collaborators a flow needs, cheap to clone.
#[derive(Clone)]
pub struct Toolchain {
    pub platforms: Arc<dyn PlatformOps>,
    pub plugins: Arc<dyn PluginOps>,
    pub dependencies: Arc<dyn DependencyOps>,
    pub hooks: Arc<dyn HookRunner>,
}

impl Toolchain {
    /// Collaborators wired to the host npm and the project `hooks/` dir.
    pub fn host() -> Self {
        let npm = NpmClient::new();
        Self {
            platforms: Arc::new(NpmPlatformOps::new(npm.clone())),
            plugins: Arc::new(NpmPluginOps::new(npm.clone())),
            dependencies: Arc::new(npm),
            hooks: Arc::new(ScriptHooks),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fakes shared by the flow tests.

    use super::*;
    use std::sync::Mutex;

    /// One fake implementing every primitive. Each call appends a line to
    /// `calls`; targets listed in `fail` make their primitive error out.
    #[derive(Default)]
    pub struct RecordingOps {
        calls: Mutex<Vec<String>>,
        fail: Mutex<Vec<String>>,
        prepare_on_uninstall: Mutex<bool>,
    }

    impl RecordingOps {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn fail_on(&self, target: &str) {
            self.fail.lock().unwrap().push(target.to_string());
        }

        /// Make `uninstall_from_platform` report that it already prepared.
        pub fn set_prepare_on_uninstall(&self, value: bool) {
            *self.prepare_on_uninstall.lock().unwrap() = value;
        }

        fn log(&self, entry: String) {
            self.calls.lock().unwrap().push(entry);
        }

        fn check(&self, target: &str) -> anyhow::Result<()> {
            if self.fail.lock().unwrap().iter().any(|t| t == target) {
                anyhow::bail!("injected failure for {target}");
            }
            Ok(())
        }
    }

    /// Toolchain whose four collaborators all share one `RecordingOps`.
    pub fn recording_toolchain() -> (Toolchain, Arc<RecordingOps>) {
        let ops = Arc::new(RecordingOps::default());
        let toolchain = Toolchain {
            platforms: ops.clone(),
            plugins: ops.clone(),
            dependencies: ops.clone(),
            hooks: ops.clone(),
        };
        (toolchain, ops)
    }

    #[async_trait]
    impl PlatformOps for RecordingOps {
        async fn install(
            &self,
            name: &str,
            source: &str,
            _root: &Path,
            _opts: &InstallOptions,
        ) -> anyhow::Result<()> {
            self.log(format!("platform install {name} <- {source}"));
            self.check(name)
        }

        async fn prepare(&self, platforms: &[String], _root: &Path) -> anyhow::Result<()> {
            self.log(format!("prepare {}", platforms.join(",")));
            Ok(())
        }
    }

    #[async_trait]
    impl PluginOps for RecordingOps {
        async fn install(
            &self,
            id: &str,
            source: &str,
            _root: &Path,
            opts: &InstallOptions,
        ) -> anyhow::Result<()> {
            let vars: Vec<String> =
                opts.variables.iter().map(|(k, v)| format!("{k}={v}")).collect();
            if vars.is_empty() {
                self.log(format!("plugin install {id} <- {source}"));
            } else {
                self.log(format!("plugin install {id} <- {source} [{}]", vars.join(",")));
            }
            self.check(id)
        }

        async fn uninstall_from_platform(
            &self,
            id: &str,
            platform: &str,
            _root: &Path,
            _opts: &UninstallOptions,
        ) -> anyhow::Result<bool> {
            self.log(format!("plugin uninstall {id} from {platform}"));
            self.check(id)?;
            Ok(*self.prepare_on_uninstall.lock().unwrap())
        }

        async fn uninstall_package(&self, id: &str, _root: &Path) -> anyhow::Result<()> {
            self.log(format!("package rm {id}"));
            self.check(id)
        }
    }

    #[async_trait]
    impl DependencyOps for RecordingOps {
        async fn uninstall(&self, package: &str, _root: &Path) -> anyhow::Result<()> {
            self.log(format!("npm uninstall {package}"));
            self.check(package)
        }
    }

    #[async_trait]
    impl HookRunner for RecordingOps {
        async fn fire(
            &self,
            event: HookEvent,
            _root: &Path,
            _ctx: &HookContext,
        ) -> anyhow::Result<()> {
            self.log(format!("hook {event}"));
            self.check(event.as_str())
        }
    }
}
