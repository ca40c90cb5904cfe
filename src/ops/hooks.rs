//! Project hook execution.
//!
//! Projects may carry a `hooks/` directory with one subdirectory per event
//! name. Every executable in the event's subdirectory runs in sorted order
//! with the project root as its single argument. A non-zero exit from any
//! script aborts the surrounding command.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

/// Lifecycle events fired around the top-level commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    BeforePlatformAdd,
    AfterPlatformAdd,
    BeforePlatformRm,
    AfterPlatformRm,
    BeforePluginAdd,
    AfterPluginAdd,
    BeforePluginRm,
    AfterPluginRm,
}

impl HookEvent {
    /// Event name as used for the `hooks/` subdirectory.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforePlatformAdd => "before_platform_add",
            Self::AfterPlatformAdd => "after_platform_add",
            Self::BeforePlatformRm => "before_platform_rm",
            Self::AfterPlatformRm => "after_platform_rm",
            Self::BeforePluginAdd => "before_plugin_add",
            Self::AfterPluginAdd => "after_plugin_add",
            Self::BeforePluginRm => "before_plugin_rm",
            Self::AfterPluginRm => "after_plugin_rm",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch context passed to hook scripts through the environment.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    /// Platform names the surrounding command operates on.
    pub platforms: Vec<String>,
    /// Plugin ids the surrounding command operates on.
    pub plugins: Vec<String>,
}

impl HookContext {
    pub fn platforms(platforms: &[String]) -> Self {
        Self { platforms: platforms.to_vec(), plugins: Vec::new() }
    }

    pub fn plugins(plugins: &[String]) -> Self {
        Self { platforms: Vec::new(), plugins: plugins.to_vec() }
    }
}

/// Hook dispatch. Failure propagates and aborts the whole command.
#[async_trait]
pub trait HookRunner: Send + Sync {
    async fn fire(&self, event: HookEvent, root: &Path, ctx: &HookContext) -> Result<()>;
}

/// Runner that fires nothing. Used by flows invoked from inside other
/// flows, where the outer command already fired its own events.
pub struct NoopHooks;

#[async_trait]
impl HookRunner for NoopHooks {
    async fn fire(&self, _event: HookEvent, _root: &Path, _ctx: &HookContext) -> Result<()> {
        Ok(())
    }
}

/// Runner executing scripts from `<root>/hooks/<event>/`.
pub struct ScriptHooks;

impl ScriptHooks {
    /// Executables under the event directory, sorted by file name.
    fn scripts_for(root: &Path, event: HookEvent) -> Vec<PathBuf> {
        let dir = root.join("hooks").join(event.as_str());
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut scripts: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_executable(path))
            .collect();
        scripts.sort();
        scripts
    }
}

#[async_trait]
impl HookRunner for ScriptHooks {
    async fn fire(&self, event: HookEvent, root: &Path, ctx: &HookContext) -> Result<()> {
        for script in Self::scripts_for(root, event) {
            tracing::debug!("running hook script {}", script.display());
            let status = tokio::process::Command::new(&script)
                .arg(root)
                .current_dir(root)
                .env("COVA_HOOK_EVENT", event.as_str())
                .env("COVA_PLATFORMS", ctx.platforms.join(","))
                .env("COVA_PLUGINS", ctx.plugins.join(","))
                .status()
                .await
                .with_context(|| format!("Failed to spawn hook script {}", script.display()))?;
            if !status.success() {
                bail!("Hook {event} script {} exited with {status}", script.display());
            }
        }
        Ok(())
    }
}

/// Check if a file is executable.
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.extension()
            .map(|ext| ext == "exe" || ext == "cmd" || ext == "bat")
            .unwrap_or(false)
    }
}
