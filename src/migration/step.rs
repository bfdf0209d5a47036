use crate::core::{DescriptionError, Result};
use crate::document::Document;
use std::path::Path;
use std::sync::Arc;

/// Transforms a description document in place. The path is the directory
/// of the description being migrated (its extracted files live there).
pub type DocumentMigrationFn = Arc<dyn Fn(&mut Document, &Path) -> Result<()> + Send + Sync>;

/// A single `from_version -> from_version + 1` migration.
#[derive(Clone)]
pub struct MigrationStep {
    pub from_version: u32,
    pub to_version: u32,
    pub(crate) description: Option<String>,
    pub(crate) transform: Option<DocumentMigrationFn>,
}

impl std::fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationStep")
            .field("from_version", &self.from_version)
            .field("to_version", &self.to_version)
            .field("description", &self.description)
            .field("has_transform", &self.transform.is_some())
            .finish()
    }
}

impl MigrationStep {
    /// Creates a new migration step between two versions.
    pub fn new(from_version: u32, to_version: u32) -> Self {
        Self {
            from_version,
            to_version,
            description: None,
            transform: None,
        }
    }

    /// Describes what the step changes. Steps without a description are
    /// refused when the runner reaches them.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the document transformation of the step. Registration refuses
    /// steps without one.
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&mut Document, &Path) -> Result<()> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn name(&self) -> String {
        format!("Migrate{}To{}", self.from_version, self.to_version)
    }

    pub(crate) fn documented_description(&self) -> Result<&str> {
        match self.description() {
            Some(description) if !description.trim().is_empty() => Ok(description.trim()),
            _ => Err(DescriptionError::MigrationConfiguration(format!(
                "Invalid migration '{}'. It does not describe its purpose.",
                self.name()
            ))),
        }
    }

    pub(crate) fn apply(&self, document: &mut Document, path: &Path) -> Result<()> {
        let Some(transform) = &self.transform else {
            return Err(DescriptionError::MigrationConfiguration(format!(
                "Migration step '{}' has no transform",
                self.name()
            )));
        };
        transform(document, path).map_err(|err| match err {
            DescriptionError::MigrationFailed(reason) => {
                DescriptionError::MigrationFailed(format!("{}: {}", self.name(), reason))
            }
            other => DescriptionError::MigrationFailed(format!("{}: {}", self.name(), other)),
        })
    }
}
