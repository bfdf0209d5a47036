//! System description documents
//!
//! A document is the parsed `manifest.json` of a description: a `meta`
//! object carrying the `format_version`, and any number of named scopes.
//! Scopes are kept as raw JSON so members this version does not know
//! about survive a load/save cycle untouched.

mod load;

pub use load::{incompatible_version, load_description, load_validated, validation_errors};

use crate::core::{DescriptionError, Result};
use crate::store::atomic_write;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Format version written by this release.
pub const CURRENT_FORMAT_VERSION: u32 = 3;

/// The `meta` member of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<u32>,

    /// Per-scope metadata (`hostname`, `modified`, ...) and anything else.
    #[serde(flatten)]
    pub entries: Map<String, Value>,
}

impl Meta {
    fn to_value(&self) -> Value {
        let mut meta = self.entries.clone();
        if let Some(version) = self.format_version {
            meta.insert("format_version".to_string(), Value::from(version));
        }
        Value::Object(meta)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub meta: Meta,

    #[serde(flatten)]
    pub scopes: BTreeMap<String, Value>,
}

impl Document {
    pub fn new(format_version: u32) -> Self {
        Self {
            meta: Meta {
                format_version: Some(format_version),
                entries: Map::new(),
            },
            scopes: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Reads and parses a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|err| {
            DescriptionError::IoError(format!("Failed to read '{}': {}", path.display(), err))
        })?;
        Self::from_json(&json)
    }

    /// Writes the document pretty-printed, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_value())?;
        atomic_write(path, json.as_bytes())
    }

    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        root.insert("meta".to_string(), self.meta.to_value());
        for (name, data) in &self.scopes {
            root.insert(name.clone(), data.clone());
        }
        Value::Object(root)
    }

    pub fn format_version(&self) -> Option<u32> {
        self.meta.format_version
    }

    pub fn set_format_version(&mut self, version: u32) {
        self.meta.format_version = Some(version);
    }

    pub fn scope(&self, name: &str) -> Option<&Value> {
        self.scopes.get(name)
    }

    pub fn scope_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.scopes.get_mut(name)
    }

    pub fn insert_scope(&mut self, name: impl Into<String>, data: Value) -> Option<Value> {
        self.scopes.insert(name.into(), data)
    }

    pub fn remove_scope(&mut self, name: &str) -> Option<Value> {
        self.scopes.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_keeps_unknown_members() {
        let raw = json!({
            "meta": {
                "format_version": 2,
                "os": { "hostname": "example.com", "modified": "2014-02-07T14:04:45Z" }
            },
            "os": { "name": "openSUSE", "version": "13.1", "architecture": "x86_64" },
            "future_scope": { "anything": [1, 2, 3] }
        });

        let document = Document::from_value(raw.clone()).unwrap();
        assert_eq!(document.format_version(), Some(2));
        assert!(document.scope("future_scope").is_some());
        assert_eq!(document.to_value(), raw);
    }

    #[test]
    fn test_missing_meta_has_no_version() {
        let document = Document::from_json(r#"{ "packages": [] }"#).unwrap();
        assert_eq!(document.format_version(), None);
        assert_eq!(document.to_value(), json!({ "meta": {}, "packages": [] }));
    }

    #[test]
    fn test_non_integer_version_is_a_parse_error() {
        let err = Document::from_json(r#"{ "meta": { "format_version": "2" } }"#).unwrap_err();
        assert!(matches!(err, DescriptionError::ParseError(_)));
        assert!(Document::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");

        let mut document = Document::new(3);
        document.insert_scope("packages", json!([{ "name": "bash" }]));
        document.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"meta\""));
        assert_eq!(Document::load(&path).unwrap(), document);
    }
}
