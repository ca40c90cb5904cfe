//! Project stores and on-disk layout.
//!
//! A project is a directory with a `config.xml` descriptor at its root and,
//! usually, a `package.json` manifest next to it. Installed state lives in
//! `platforms/` and `plugins/` and is probed, never trusted from the stores.
//!
//! Two different persistence disciplines apply on purpose:
//!
//! - **Descriptor** mutations are written immediately by their caller.
//! - **Manifest** mutations are staged behind a dirty flag until `save()`.

mod descriptor;
mod error;
mod ledger;
mod manifest;
mod registration;
mod xml;

pub use descriptor::{EngineDecl, PluginDecl, ProjectDescriptor, DESCRIPTOR_FILE};
pub use error::{ProjectError, ProjectResult};
pub use ledger::{FetchLedger, LEDGER_FILE};
pub use manifest::{CordovaSection, ManifestDoc, PackageManifest, MANIFEST_FILE};
pub use registration::{PlatformRegistration, RegistrationDoc};
pub use xml::{XmlDocument, XmlElement, XmlNode};

use std::path::{Path, PathBuf};

/// An opened project: root directory plus both declaration stores.
pub struct Project {
    root: PathBuf,
    pub descriptor: ProjectDescriptor,
    pub manifest: PackageManifest,
}

impl Project {
    /// Open the project rooted at `root`. The descriptor must exist; a
    /// missing manifest loads as an empty staged document.
    pub async fn open(root: impl Into<PathBuf>) -> ProjectResult<Self> {
        let root = root.into();
        let descriptor = ProjectDescriptor::load(root.join(DESCRIPTOR_FILE)).await?;
        let manifest = PackageManifest::load(root.join(MANIFEST_FILE)).await?;
        Ok(Self { root, descriptor, manifest })
    }

    /// Walk up from `start` to the nearest directory holding a descriptor.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut dir = Some(start);
        while let Some(candidate) = dir {
            if candidate.join(DESCRIPTOR_FILE).is_file() {
                return Some(candidate.to_path_buf());
            }
            dir = candidate.parent();
        }
        None
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn platforms_dir(&self) -> PathBuf {
        self.root.join("platforms")
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.root.join("plugins")
    }

    pub fn www_dir(&self) -> PathBuf {
        self.root.join("www")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str =
        r#"<widget id="io.cova.test" version="0.1.0"><name>Test</name></widget>"#;

    #[tokio::test]
    async fn test_open_requires_a_descriptor() {
        let dir = TempDir::new().unwrap();
        assert!(Project::open(dir.path()).await.is_err());

        std::fs::write(dir.path().join(DESCRIPTOR_FILE), MINIMAL).unwrap();
        let project = Project::open(dir.path()).await.unwrap();
        assert_eq!(project.descriptor.app_id(), Some("io.cova.test"));
        assert!(project.manifest.platforms().is_empty());
    }

    #[tokio::test]
    async fn test_find_root_walks_ancestors() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DESCRIPTOR_FILE), MINIMAL).unwrap();
        let nested = dir.path().join("www").join("js");
        std::fs::create_dir_all(&nested).unwrap();

        let found = Project::find_root(&nested).unwrap();
        assert_eq!(found, dir.path());

        let outside = TempDir::new().unwrap();
        assert!(Project::find_root(outside.path()).is_none());
    }
}
