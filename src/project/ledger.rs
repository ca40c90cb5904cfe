//! Fetch-metadata ledger (`plugins/fetch.json`).
//!
//! Records where each plugin was fetched from. Entry internals are opaque to
//! the flows; all they ever need is keyed removal, which stays synchronous by
//! contract. The install periphery writes entries when it materializes a
//! plugin.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::error::ProjectResult;

/// File name of the ledger inside the plugins directory.
pub const LEDGER_FILE: &str = "fetch.json";

#[derive(Debug)]
pub struct FetchLedger {
    path: PathBuf,
    entries: serde_json::Map<String, Value>,
}

impl FetchLedger {
    pub fn path_for(root: &Path) -> PathBuf {
        root.join("plugins").join(LEDGER_FILE)
    }

    /// Load the ledger for a project; a missing file is an empty ledger.
    pub fn load(root: &Path) -> ProjectResult<Self> {
        let path = Self::path_for(root);
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => serde_json::Map::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn insert(&mut self, id: &str, entry: Value) {
        self.entries.insert(id.to_string(), entry);
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn save(&self) -> ProjectResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut rendered = serde_json::to_string_pretty(&Value::Object(self.entries.clone()))?;
        rendered.push('\n');
        std::fs::write(&self.path, rendered)?;
        Ok(())
    }

    /// One-shot load, remove, save. Returns whether an entry was removed;
    /// nothing is written when the id was absent.
    pub fn remove_entry(root: &Path, id: &str) -> ProjectResult<bool> {
        let mut ledger = Self::load(root)?;
        if ledger.remove(id) {
            ledger.save()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
