//! Explicit removal flows.
//!
//! Removal is the inverse of restore and runs as a small state machine per
//! target. Each target either walks its steps to the end or stops at the
//! first failing step; the error names that step. Per-target failures leave
//! the rest of the batch running, with one exception: a config-store write
//! failure aborts the whole command, because every later step assumes the
//! write happened.

mod platforms;
mod plugins;

pub use platforms::remove_platforms;
pub use plugins::remove_plugins;

use std::fmt;

use thiserror::Error;

/// Options shared by both removal flows.
#[derive(Debug, Clone)]
pub struct RemoveOptions {
    /// Strip the target from both config stores after uninstalling.
    pub save: bool,
}

impl Default for RemoveOptions {
    fn default() -> Self {
        Self { save: true }
    }
}

/// Steps a removal target can fail in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalStep {
    /// Resolving the target name against installed or declared state.
    Validate,
    /// Detaching a plugin from one installed platform.
    PlatformUninstall,
    /// Removing a plugin's package directory under `plugins/`.
    PackageUninstall,
    /// Deleting a platform's directory under `platforms/`.
    DirectoryRemoval,
    /// Deleting a platform's plugin registration file.
    RegistrationCleanup,
    /// Writing the removal back to the config stores.
    PersistRemoval,
    /// Dropping the target's fetch-ledger entry.
    MetadataCleanup,
    /// Uninstalling the backing package from the dependency cache.
    DependencyUninstall,
}

impl RemovalStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validation",
            Self::PlatformUninstall => "platform-level uninstall",
            Self::PackageUninstall => "package uninstall",
            Self::DirectoryRemoval => "directory removal",
            Self::RegistrationCleanup => "registration cleanup",
            Self::PersistRemoval => "persisting the removal",
            Self::MetadataCleanup => "metadata cleanup",
            Self::DependencyUninstall => "dependency uninstall",
        }
    }
}

impl fmt::Display for RemovalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A removal target's failure, pinned to the step that broke.
#[derive(Debug, Error)]
#[error("{step} failed for {target}: {cause:#}")]
pub struct RemovalError {
    step: RemovalStep,
    target: String,
    cause: anyhow::Error,
}

impl RemovalError {
    pub fn new(step: RemovalStep, target: impl Into<String>, cause: anyhow::Error) -> Self {
        Self { step, target: target.into(), cause }
    }

    pub fn step(&self) -> RemovalStep {
        self.step
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_remove_options_save_by_default() {
        assert!(RemoveOptions::default().save);
    }

    #[test]
    fn test_error_names_the_failing_step() {
        let err = RemovalError::new(
            RemovalStep::PlatformUninstall,
            "cordova-plugin-camera",
            anyhow!("no registration"),
        );
        assert_eq!(err.step(), RemovalStep::PlatformUninstall);
        assert_eq!(err.target(), "cordova-plugin-camera");

        let rendered = err.to_string();
        assert!(rendered.contains("platform-level uninstall"));
        assert!(rendered.contains("cordova-plugin-camera"));
        assert!(rendered.contains("no registration"));
    }
}
