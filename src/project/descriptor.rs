//! Project descriptor (`config.xml`) adapter.
//!
//! The descriptor is authoritative for app identity and carries `<engine>`
//! and `<plugin>` declarations next to arbitrary user markup. Mutations are
//! in-memory until `persist()`, and every caller that mutates is expected to
//! persist immediately; there is no staged/dirty state here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::{ProjectError, ProjectResult};
use super::xml::{self, XmlDocument, XmlElement};

/// File name of the project descriptor inside the project root.
pub const DESCRIPTOR_FILE: &str = "config.xml";

/// An `<engine>` declaration: a platform the project wants, with an optional
/// version specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDecl {
    pub name: String,
    pub spec: Option<String>,
}

/// A `<plugin>` declaration with its `<variable>` children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginDecl {
    pub id: String,
    pub spec: Option<String>,
    pub variables: BTreeMap<String, String>,
}

/// Read/write handle over a parsed `config.xml`.
#[derive(Debug)]
pub struct ProjectDescriptor {
    path: PathBuf,
    doc: XmlDocument,
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

impl ProjectDescriptor {
    /// Load and validate the descriptor at `path`.
    pub async fn load(path: impl Into<PathBuf>) -> ProjectResult<Self> {
        let path = path.into();
        let raw = tokio::fs::read_to_string(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ProjectError::MissingFile(path.clone())
            } else {
                ProjectError::Io(err)
            }
        })?;
        Self::from_str_at(path, &raw)
    }

    /// Parse descriptor content that is already in memory.
    pub fn from_str_at(path: impl Into<PathBuf>, raw: &str) -> ProjectResult<Self> {
        let doc = xml::parse_document(raw)?;
        if doc.root.name != "widget" {
            return Err(ProjectError::Descriptor(format!(
                "expected <widget> root element, found <{}>",
                doc.root.name
            )));
        }
        Ok(Self { path: path.into(), doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The widget `id` attribute (reverse-domain app id), if set.
    pub fn app_id(&self) -> Option<&str> {
        self.doc.root.attr("id").and_then(non_empty)
    }

    /// The widget `version` attribute, if set.
    pub fn app_version(&self) -> Option<&str> {
        self.doc.root.attr("version").and_then(non_empty)
    }

    /// Text of the `<name>` element (human-readable app name), if set.
    pub fn display_name(&self) -> Option<String> {
        self.doc
            .root
            .first_named("name")
            .map(XmlElement::text)
            .filter(|name| !name.is_empty())
    }

    /// All `<engine>` declarations, in document order. Entries without a
    /// `name` attribute are ignored.
    pub fn engines(&self) -> Vec<EngineDecl> {
        self.doc
            .root
            .elements_named("engine")
            .filter_map(|el| {
                let name = el.attr("name").and_then(non_empty)?;
                Some(EngineDecl {
                    name: name.to_string(),
                    spec: el.attr("spec").and_then(non_empty).map(str::to_string),
                })
            })
            .collect()
    }

    /// All `<plugin>` declarations, in document order.
    pub fn plugins(&self) -> Vec<PluginDecl> {
        self.doc
            .root
            .elements_named("plugin")
            .filter_map(Self::decl_from_element)
            .collect()
    }

    /// The `<plugin>` declaration with the given id, if present.
    pub fn plugin(&self, id: &str) -> Option<PluginDecl> {
        self.doc
            .root
            .elements_named("plugin")
            .find(|el| el.attr("name") == Some(id))
            .and_then(Self::decl_from_element)
    }

    fn decl_from_element(el: &XmlElement) -> Option<PluginDecl> {
        let id = el.attr("name").and_then(non_empty)?;
        let variables = el
            .elements_named("variable")
            .filter_map(|var| {
                let name = var.attr("name").and_then(non_empty)?;
                Some((name.to_string(), var.attr("value").unwrap_or_default().to_string()))
            })
            .collect();
        Some(PluginDecl {
            id: id.to_string(),
            spec: el.attr("spec").and_then(non_empty).map(str::to_string),
            variables,
        })
    }

    /// Add or replace an `<engine>` declaration.
    pub fn add_engine(&mut self, name: &str, spec: Option<&str>) {
        self.doc.root.remove_elements("engine", |el| el.attr("name") == Some(name));
        let mut el = XmlElement::new("engine");
        el.set_attr("name", name);
        if let Some(spec) = spec.and_then(non_empty) {
            el.set_attr("spec", spec);
        }
        self.doc.root.push_child(el);
    }

    /// Remove an `<engine>` declaration. Returns whether anything was removed.
    pub fn remove_engine(&mut self, name: &str) -> bool {
        self.doc.root.remove_elements("engine", |el| el.attr("name") == Some(name)) > 0
    }

    /// Add or replace a `<plugin>` declaration together with its variables.
    pub fn add_plugin(&mut self, decl: &PluginDecl) {
        self.doc
            .root
            .remove_elements("plugin", |el| el.attr("name") == Some(decl.id.as_str()));
        let mut el = XmlElement::new("plugin");
        el.set_attr("name", decl.id.as_str());
        if let Some(spec) = decl.spec.as_deref().and_then(non_empty) {
            el.set_attr("spec", spec);
        }
        for (name, value) in &decl.variables {
            let mut var = XmlElement::new("variable");
            var.set_attr("name", name.as_str());
            var.set_attr("value", value.as_str());
            el.push_child(var);
        }
        self.doc.root.push_child(el);
    }

    /// Remove a `<plugin>` declaration. Returns whether anything was removed.
    pub fn remove_plugin(&mut self, id: &str) -> bool {
        self.doc.root.remove_elements("plugin", |el| el.attr("name") == Some(id)) > 0
    }

    /// Write the descriptor back to disk.
    pub async fn persist(&self) -> ProjectResult<()> {
        let rendered = xml::render_document(&self.doc)?;
        tokio::fs::write(&self.path, rendered).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<widget id="com.example.hello" version="1.2.0" xmlns="http://www.w3.org/ns/widgets">
    <name>Hello App</name>
    <description>Sample project</description>
    <engine name="android"/>
    <engine name="ios" spec="^7.0.0"/>
    <plugin name="cordova-plugin-camera" spec="^6.0.0">
        <variable name="ANDROID_SUPPORT_VERSION" value="27.+"/>
    </plugin>
    <access origin="*"/>
</widget>
"#;

    fn write_sample(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join(DESCRIPTOR_FILE);
        std::fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[tokio::test]
    async fn test_reads_front_matter_and_declarations() {
        let dir = TempDir::new().unwrap();
        let descriptor = ProjectDescriptor::load(write_sample(&dir)).await.unwrap();

        assert_eq!(descriptor.app_id(), Some("com.example.hello"));
        assert_eq!(descriptor.app_version(), Some("1.2.0"));
        assert_eq!(descriptor.display_name(), Some("Hello App".to_string()));

        let engines = descriptor.engines();
        assert_eq!(engines.len(), 2);
        assert_eq!(engines[0].name, "android");
        assert_eq!(engines[0].spec, None);
        assert_eq!(engines[1].name, "ios");
        assert_eq!(engines[1].spec, Some("^7.0.0".to_string()));

        let plugin = descriptor.plugin("cordova-plugin-camera").unwrap();
        assert_eq!(plugin.spec, Some("^6.0.0".to_string()));
        assert_eq!(plugin.variables.get("ANDROID_SUPPORT_VERSION"), Some(&"27.+".to_string()));
    }

    #[tokio::test]
    async fn test_rejects_non_widget_root() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DESCRIPTOR_FILE);
        std::fs::write(&path, "<project><name>x</name></project>").unwrap();
        let err = ProjectDescriptor::load(&path).await.unwrap_err();
        assert!(matches!(err, ProjectError::Descriptor(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_a_distinct_error() {
        let dir = TempDir::new().unwrap();
        let err = ProjectDescriptor::load(dir.path().join(DESCRIPTOR_FILE)).await.unwrap_err();
        assert!(matches!(err, ProjectError::MissingFile(_)));
    }

    #[tokio::test]
    async fn test_mutations_persist_and_unknown_markup_survives() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir);
        let mut descriptor = ProjectDescriptor::load(&path).await.unwrap();

        descriptor.add_engine("browser", Some("^8.0.0"));
        descriptor.remove_plugin("cordova-plugin-camera");
        let decl = PluginDecl {
            id: "cordova-plugin-device".to_string(),
            spec: Some("^2.1.0".to_string()),
            variables: BTreeMap::from([("API_KEY".to_string(), "abc123".to_string())]),
        };
        descriptor.add_plugin(&decl);
        descriptor.persist().await.unwrap();

        let reloaded = ProjectDescriptor::load(&path).await.unwrap();
        assert_eq!(reloaded.engines().len(), 3);
        assert!(reloaded.plugin("cordova-plugin-camera").is_none());
        assert_eq!(reloaded.plugin("cordova-plugin-device").unwrap(), decl);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("<description>Sample project</description>"));
        assert!(raw.contains(r#"<access origin="*"/>"#));
    }

    #[tokio::test]
    async fn test_add_engine_replaces_existing_declaration() {
        let dir = TempDir::new().unwrap();
        let mut descriptor = ProjectDescriptor::load(write_sample(&dir)).await.unwrap();
        descriptor.add_engine("ios", Some("^8.0.0"));

        let engines = descriptor.engines();
        let ios: Vec<_> = engines.iter().filter(|e| e.name == "ios").collect();
        assert_eq!(ios.len(), 1);
        assert_eq!(ios[0].spec, Some("^8.0.0".to_string()));
    }
}
