//! Per-platform plugin registration files (`plugins/<platform>.json`).
//!
//! Each installed platform keeps a registration file recording which plugins
//! are wired into it and with which variables. The removal flow reads these
//! for platform-specific variable overrides, and platform removal deletes the
//! file wholesale.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ProjectResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationDoc {
    #[serde(default)]
    pub installed_plugins: BTreeMap<String, BTreeMap<String, String>>,

    #[serde(default)]
    pub dependent_plugins: BTreeMap<String, BTreeMap<String, String>>,

    /// Platform-tool bookkeeping this tool does not manage.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Handle over one platform's registration file.
#[derive(Debug)]
pub struct PlatformRegistration {
    path: PathBuf,
    doc: RegistrationDoc,
}

impl PlatformRegistration {
    pub fn path_for(root: &Path, platform: &str) -> PathBuf {
        root.join("plugins").join(format!("{platform}.json"))
    }

    /// Load the registration for `platform`; a missing file is an empty one.
    pub async fn load(root: &Path, platform: &str) -> ProjectResult<Self> {
        let path = Self::path_for(root, platform);
        let doc = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => RegistrationDoc::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, doc })
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.doc.installed_plugins.contains_key(id) || self.doc.dependent_plugins.contains_key(id)
    }

    /// Variables recorded for a plugin on this platform, top-level entries
    /// taking precedence over dependency entries.
    pub fn variables_for(&self, id: &str) -> Option<&BTreeMap<String, String>> {
        self.doc
            .installed_plugins
            .get(id)
            .or_else(|| self.doc.dependent_plugins.get(id))
    }

    pub fn register(&mut self, id: &str, variables: BTreeMap<String, String>) {
        self.doc.installed_plugins.insert(id.to_string(), variables);
    }

    /// Drop a plugin from both maps. Returns whether it was registered.
    pub fn unregister(&mut self, id: &str) -> bool {
        let installed = self.doc.installed_plugins.remove(id).is_some();
        let dependent = self.doc.dependent_plugins.remove(id).is_some();
        installed || dependent
    }

    pub async fn save(&self) -> ProjectResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut rendered = serde_json::to_string_pretty(&self.doc)?;
        rendered.push('\n');
        tokio::fs::write(&self.path, rendered).await?;
        Ok(())
    }

    /// Delete the registration file for `platform`. Returns whether a file
    /// was actually removed.
    pub async fn delete(root: &Path, platform: &str) -> ProjectResult<bool> {
        let path = Self::path_for(root, platform);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
