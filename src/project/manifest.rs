//! Package manifest (`package.json`) adapter.
//!
//! Unlike the descriptor, manifest mutations are staged: setters edit the
//! in-memory document and flip a dirty flag, and nothing reaches disk until
//! `save()`. Saving a clean manifest is a no-op, which is what makes repeated
//! reconciliation runs write-free. A manifest dropped while dirty logs a
//! warning so a forgotten save is visible instead of silent data loss.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ProjectResult;

/// File name of the package manifest inside the project root.
pub const MANIFEST_FILE: &str = "package.json";

/// The reserved `cordova` section of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CordovaSection {
    /// Declared platform names, in insertion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,

    /// Declared plugins: id to variables map.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugins: BTreeMap<String, BTreeMap<String, String>>,

    /// Keys this tool does not manage; round-tripped untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl CordovaSection {
    fn is_empty(&self) -> bool {
        self.platforms.is_empty() && self.plugins.is_empty() && self.extra.is_empty()
    }
}

/// Typed view of the manifest document. Unknown top-level keys are kept in
/// `extra` so a rewrite never drops user data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "CordovaSection::is_empty")]
    pub cordova: CordovaSection,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default, rename = "devDependencies", skip_serializing_if = "BTreeMap::is_empty")]
    pub dev_dependencies: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Staged read/write handle over `package.json`.
#[derive(Debug)]
pub struct PackageManifest {
    path: PathBuf,
    doc: ManifestDoc,
    dirty: bool,
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

impl PackageManifest {
    /// Load the manifest at `path`. A missing file loads as an empty document
    /// and is only created on disk if a save is triggered by staged changes.
    pub async fn load(path: impl Into<PathBuf>) -> ProjectResult<Self> {
        let path = path.into();
        let doc = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => ManifestDoc::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, doc, dirty: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether staged changes are waiting for a save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn name(&self) -> Option<&str> {
        self.doc.name.as_deref().and_then(non_blank)
    }

    pub fn version(&self) -> Option<&str> {
        self.doc.version.as_deref().and_then(non_blank)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.doc.display_name.as_deref().and_then(non_blank)
    }

    /// Declared platform names, in insertion order.
    pub fn platforms(&self) -> &[String] {
        &self.doc.cordova.platforms
    }

    /// Declared plugins: id to variables map.
    pub fn plugins(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.doc.cordova.plugins
    }

    pub fn plugin_variables(&self, id: &str) -> Option<&BTreeMap<String, String>> {
        self.doc.cordova.plugins.get(id)
    }

    /// Version specifier recorded for a package, `dependencies` first.
    pub fn dependency_spec(&self, package: &str) -> Option<&str> {
        self.doc
            .dependencies
            .get(package)
            .or_else(|| self.doc.dev_dependencies.get(package))
            .map(String::as_str)
    }

    pub fn set_name(&mut self, name: &str) {
        if self.doc.name.as_deref() != Some(name) {
            self.doc.name = Some(name.to_string());
            self.dirty = true;
        }
    }

    pub fn set_version(&mut self, version: &str) {
        if self.doc.version.as_deref() != Some(version) {
            self.doc.version = Some(version.to_string());
            self.dirty = true;
        }
    }

    pub fn set_display_name(&mut self, display_name: &str) {
        if self.doc.display_name.as_deref() != Some(display_name) {
            self.doc.display_name = Some(display_name.to_string());
            self.dirty = true;
        }
    }

    /// Append a platform if it is not declared yet. Returns whether the list
    /// changed.
    pub fn add_platform(&mut self, name: &str) -> bool {
        if self.doc.cordova.platforms.iter().any(|p| p == name) {
            return false;
        }
        self.doc.cordova.platforms.push(name.to_string());
        self.dirty = true;
        true
    }

    /// Remove a platform from the declared list. Returns whether it was there.
    pub fn remove_platform(&mut self, name: &str) -> bool {
        let before = self.doc.cordova.platforms.len();
        self.doc.cordova.platforms.retain(|p| p != name);
        if self.doc.cordova.platforms.len() != before {
            self.dirty = true;
            true
        } else {
            false
        }
    }

    /// Record a plugin with its variables. Returns whether anything changed.
    pub fn set_plugin(&mut self, id: &str, variables: BTreeMap<String, String>) -> bool {
        if self.doc.cordova.plugins.get(id) == Some(&variables) {
            return false;
        }
        self.doc.cordova.plugins.insert(id.to_string(), variables);
        self.dirty = true;
        true
    }

    /// Remove a plugin entry. Returns whether it was there.
    pub fn remove_plugin(&mut self, id: &str) -> bool {
        if self.doc.cordova.plugins.remove(id).is_some() {
            self.dirty = true;
            true
        } else {
            false
        }
    }

    /// Record a version specifier under `devDependencies`. Returns whether
    /// anything changed.
    pub fn set_dev_dependency(&mut self, package: &str, spec: &str) -> bool {
        if self.doc.dev_dependencies.get(package).map(String::as_str) == Some(spec) {
            return false;
        }
        self.doc.dev_dependencies.insert(package.to_string(), spec.to_string());
        self.dirty = true;
        true
    }

    /// Write the manifest if anything is staged. Returns whether a write
    /// happened.
    pub async fn save(&mut self) -> ProjectResult<bool> {
        if !self.dirty {
            return Ok(false);
        }
        let mut rendered = serde_json::to_string_pretty(&self.doc)?;
        rendered.push('\n');
        tokio::fs::write(&self.path, rendered).await?;
        self.dirty = false;
        Ok(true)
    }

    /// Re-read the document from disk, discarding any staged state. Used after
    /// an external tool (the dependency primitive) rewrites the file.
    pub async fn reload(&mut self) -> ProjectResult<()> {
        if self.dirty {
            tracing::debug!(
                "reloading {} discards staged manifest changes",
                self.path.display()
            );
        }
        let mut fresh = Self::load(self.path.clone()).await?;
        self.doc = std::mem::take(&mut fresh.doc);
        self.dirty = false;
        Ok(())
    }
}

impl Drop for PackageManifest {
    fn drop(&mut self) {
        if self.dirty {
            tracing::warn!(
                "{} has staged changes that were never saved",
                self.path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn manifest_in(dir: &TempDir) -> PackageManifest {
        PackageManifest::load(dir.path().join(MANIFEST_FILE)).await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty_and_clean_save_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut manifest = manifest_in(&dir).await;
        assert!(manifest.platforms().is_empty());
        assert!(!manifest.is_dirty());
        assert!(!manifest.save().await.unwrap());
        assert!(!dir.path().join(MANIFEST_FILE).exists());
    }

    #[tokio::test]
    async fn test_staged_changes_write_once() {
        let dir = TempDir::new().unwrap();
        let mut manifest = manifest_in(&dir).await;

        assert!(manifest.add_platform("android"));
        assert!(!manifest.add_platform("android"));
        assert!(manifest.set_dev_dependency("cordova-android", "^13.0.0"));
        assert!(manifest.is_dirty());

        assert!(manifest.save().await.unwrap());
        assert!(!manifest.is_dirty());
        assert!(!manifest.save().await.unwrap());

        let reloaded = manifest_in(&dir).await;
        assert_eq!(reloaded.platforms(), ["android"]);
        assert_eq!(reloaded.dependency_spec("cordova-android"), Some("^13.0.0"));
    }

    #[tokio::test]
    async fn test_unknown_keys_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(
            &path,
            r#"{
  "name": "hello",
  "scripts": { "test": "jest" },
  "cordova": { "platforms": ["android"], "preferences": { "ios": true } },
  "browserslist": ["defaults"]
}
"#,
        )
        .unwrap();

        let mut manifest = PackageManifest::load(&path).await.unwrap();
        assert!(manifest.add_platform("ios"));
        assert!(manifest.save().await.unwrap());

        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["scripts"]["test"], "jest");
        assert_eq!(value["browserslist"][0], "defaults");
        assert_eq!(value["cordova"]["preferences"]["ios"], true);
        assert_eq!(value["cordova"]["platforms"][1], "ios");
    }

    #[tokio::test]
    async fn test_clean_load_save_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let original = "{\n  \"name\": \"odd-formatting\"   \n}\n";
        std::fs::write(&path, original).unwrap();

        let mut manifest = PackageManifest::load(&path).await.unwrap();
        assert!(!manifest.save().await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_dependency_lookup_prefers_dependencies_over_dev() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(
            &path,
            r#"{"dependencies":{"cordova-ios":"^7.1.0"},"devDependencies":{"cordova-ios":"^6.0.0","cordova-android":"^13.0.0"}}"#,
        )
        .unwrap();

        let manifest = PackageManifest::load(&path).await.unwrap();
        assert_eq!(manifest.dependency_spec("cordova-ios"), Some("^7.1.0"));
        assert_eq!(manifest.dependency_spec("cordova-android"), Some("^13.0.0"));
        assert_eq!(manifest.dependency_spec("cordova-browser"), None);
    }

    #[tokio::test]
    async fn test_setters_skip_no_op_updates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(&path, r#"{"name":"hello","cordova":{"plugins":{"p":{"K":"v"}}}}"#).unwrap();

        let mut manifest = PackageManifest::load(&path).await.unwrap();
        manifest.set_name("hello");
        assert!(!manifest.set_plugin("p", BTreeMap::from([("K".to_string(), "v".to_string())])));
        assert!(!manifest.remove_plugin("absent"));
        assert!(!manifest.remove_platform("absent"));
        assert!(!manifest.is_dirty());

        assert!(manifest.set_plugin("p", BTreeMap::from([("K".to_string(), "w".to_string())])));
        assert!(manifest.is_dirty());
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(PackageManifest::load(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_reload_resyncs_after_external_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(&path, r#"{"devDependencies":{"cordova-ios":"^7.0.0"}}"#).unwrap();

        let mut manifest = PackageManifest::load(&path).await.unwrap();
        assert_eq!(manifest.dependency_spec("cordova-ios"), Some("^7.0.0"));

        // simulate npm editing the file behind our back
        std::fs::write(&path, r#"{"devDependencies":{}}"#).unwrap();
        manifest.reload().await.unwrap();
        assert_eq!(manifest.dependency_spec("cordova-ios"), None);
    }
}
