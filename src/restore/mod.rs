//! Declared-state restore.
//!
//! Restore brings the project tree in line with what the two config stores
//! declare. Each flow runs in two phases: reconcile the stores (descriptor
//! entries migrate into the manifest, which then becomes authoritative),
//! and serially install whatever is declared but not materialized.
//!
//! Failures are isolated per target; the returned [`BatchReport`] carries
//! one outcome per attempted target and decides the process exit code.

mod platforms;
mod plugins;

pub use platforms::restore_platforms;
pub use plugins::restore_plugins;

use anyhow::Result;

use crate::core::BatchReport;
use crate::ops::Toolchain;
use crate::project::Project;

/// Restore everything: platforms first, then plugins.
///
/// Plugins install after platforms so a freshly added platform picks up
/// every declared plugin in the same run.
pub async fn restore_project(project: &mut Project, tools: &Toolchain) -> Result<BatchReport> {
    let mut report = restore_platforms(project, tools, &[]).await?;
    report.merge(restore_plugins(project, tools, &[]).await?);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::recording_toolchain;
    use crate::project::{DESCRIPTOR_FILE, MANIFEST_FILE};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_restore_project_runs_platforms_before_plugins() {
        let dir = TempDir::new().unwrap();
        let config = r#"<widget id="io.cova.full" version="1.0.0">
    <name>Full</name>
    <engine name="android"/>
    <plugin name="cordova-plugin-device"/>
</widget>"#;
        std::fs::write(dir.path().join(DESCRIPTOR_FILE), config).unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "{}").unwrap();
        let mut project = Project::open(dir.path()).await.unwrap();

        let (tools, ops) = recording_toolchain();
        let report = restore_project(&mut project, &tools).await.unwrap();

        assert!(report.success());
        assert_eq!(report.done_count(), 2);
        assert_eq!(
            ops.calls(),
            vec![
                "hook before_platform_add",
                "platform install android <- cordova-android",
                "hook after_platform_add",
                "hook before_plugin_add",
                "plugin install cordova-plugin-device <- cordova-plugin-device",
                "hook after_plugin_add",
            ]
        );
    }
}
