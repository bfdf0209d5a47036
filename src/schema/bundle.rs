use super::SchemaValidator;
use crate::core::{DescriptionError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const BUILTIN_BUNDLES: &[(u32, &str)] = &[
    (1, include_str!("../../schema/v1.json")),
    (2, include_str!("../../schema/v2.json")),
    (3, include_str!("../../schema/v3.json")),
];

/// Schemas of one format version: a global schema for the whole document
/// and one fragment per scope. Scope fragments may reference the global
/// schema's `definitions`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchemaBundle {
    pub format_version: u32,
    pub global: Value,
    #[serde(default)]
    pub scopes: BTreeMap<String, Value>,
}

impl SchemaBundle {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| DescriptionError::SchemaError(format!("Invalid schema bundle: {}", err)))
    }

    /// The bundle shipped for `format_version`, if any.
    pub fn builtin(format_version: u32) -> Result<Option<Self>> {
        BUILTIN_BUNDLES
            .iter()
            .find(|(version, _)| *version == format_version)
            .map(|(_, json)| Self::from_json(json))
            .transpose()
    }

    pub fn scope_names(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }
}

/// Schema bundles by format version.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    bundles: BTreeMap<u32, SchemaBundle>,
}

impl SchemaCatalog {
    /// Creates an empty catalog; every version validates without errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every bundle shipped with this release.
    pub fn builtin() -> Result<Self> {
        let mut catalog = Self::new();
        for (version, json) in BUILTIN_BUNDLES {
            let bundle = SchemaBundle::from_json(json)?;
            if bundle.format_version != *version {
                return Err(DescriptionError::SchemaError(format!(
                    "Bundled schema for version {} declares version {}",
                    version, bundle.format_version
                )));
            }
            catalog.register(bundle);
        }
        Ok(catalog)
    }

    /// Adds a bundle, replacing one registered for the same version.
    pub fn register(&mut self, bundle: SchemaBundle) -> Option<SchemaBundle> {
        self.bundles.insert(bundle.format_version, bundle)
    }

    pub fn with_bundle(mut self, bundle: SchemaBundle) -> Self {
        self.register(bundle);
        self
    }

    pub fn bundle(&self, format_version: u32) -> Option<&SchemaBundle> {
        self.bundles.get(&format_version)
    }

    pub fn versions(&self) -> Vec<u32> {
        self.bundles.keys().copied().collect()
    }

    /// Compiles a validator for `format_version`. Versions without a bundle
    /// get a validator that accepts everything.
    pub fn validator(&self, format_version: u32) -> Result<SchemaValidator> {
        match self.bundle(format_version) {
            Some(bundle) => SchemaValidator::from_bundle(bundle),
            None => Ok(SchemaValidator::unbound(format_version)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_covers_every_version() {
        let catalog = SchemaCatalog::builtin().unwrap();
        assert_eq!(catalog.versions(), vec![1, 2, 3]);
        for version in catalog.versions() {
            assert!(catalog.validator(version).is_ok(), "bundle v{} must compile", version);
        }
    }

    #[test]
    fn test_builtin_bundle_scopes() {
        let bundle = SchemaBundle::builtin(2).unwrap().unwrap();
        let scopes = bundle.scope_names().collect::<Vec<_>>();
        assert!(scopes.contains(&"os"));
        assert!(scopes.contains(&"config_files"));
        assert!(SchemaBundle::builtin(99).unwrap().is_none());
    }

    #[test]
    fn test_invalid_bundle_is_a_schema_error() {
        let err = SchemaBundle::from_json("{ \"scopes\": {} }").unwrap_err();
        assert!(matches!(err, DescriptionError::SchemaError(_)));
    }
}
