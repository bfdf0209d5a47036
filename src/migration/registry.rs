use super::{MigrationStep, builtin};
use crate::core::{DescriptionError, Result};
use std::collections::BTreeMap;

/// Registered migration steps, keyed by the version they start from.
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    steps: BTreeMap<u32, MigrationStep>,
}

impl MigrationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the steps shipped with this release.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        builtin::register(&mut registry)?;
        Ok(registry)
    }

    /// Adds a step, rejecting malformed version pairs and duplicates.
    ///
    /// Checks for:
    /// - version validity (>= 1),
    /// - consecutive versions (`to == from + 1`),
    /// - a missing transform,
    /// - duplicate steps.
    pub fn register(&mut self, step: MigrationStep) -> Result<()> {
        if step.from_version == 0 {
            return Err(DescriptionError::MigrationConfiguration(
                "Migration 'from_version' must be >= 1".to_string(),
            ));
        }
        if step.from_version.checked_add(1) != Some(step.to_version) {
            return Err(DescriptionError::MigrationConfiguration(format!(
                "Migration step {} -> {} must advance exactly one format version",
                step.from_version, step.to_version
            )));
        }
        if step.transform.is_none() {
            return Err(DescriptionError::MigrationConfiguration(format!(
                "Migration step '{}' has no transform",
                step.name()
            )));
        }
        if self.steps.contains_key(&step.from_version) {
            return Err(DescriptionError::MigrationConfiguration(format!(
                "Duplicate migration step starting at version {}",
                step.from_version
            )));
        }

        self.steps.insert(step.from_version, step);
        Ok(())
    }

    /// Fluent builder method to add a step.
    pub fn with_step(mut self, step: MigrationStep) -> Result<Self> {
        self.register(step)?;
        Ok(self)
    }

    /// The step migrating `version` to `version + 1`, if registered.
    pub fn resolve(&self, version: u32) -> Option<&MigrationStep> {
        self.steps.get(&version)
    }

    /// Registered steps in increasing version order.
    pub fn steps(&self) -> impl Iterator<Item = &MigrationStep> {
        self.steps.values()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(from: u32) -> MigrationStep {
        MigrationStep::new(from, from + 1).with_transform(|_document, _path| Ok(()))
    }

    #[test]
    fn test_register_validates_version_pairs() {
        let mut registry = MigrationRegistry::new();
        assert!(registry.register(noop(0)).is_err());
        assert!(registry.register(MigrationStep::new(2, 4).with_transform(|_, _| Ok(()))).is_err());
        assert!(registry.register(MigrationStep::new(3, 2).with_transform(|_, _| Ok(()))).is_err());
        assert!(registry.register(MigrationStep::new(u32::MAX, 0).with_transform(|_, _| Ok(()))).is_err());
        assert!(registry.is_empty());

        registry.register(noop(1)).unwrap();
        let err = registry.register(noop(1)).unwrap_err();
        assert!(err.to_string().contains("Duplicate migration step"));
    }

    #[test]
    fn test_step_without_transform_is_rejected() {
        let mut registry = MigrationRegistry::new();
        let err = registry
            .register(MigrationStep::new(1, 2).with_description("Does nothing"))
            .unwrap_err();
        assert!(matches!(err, DescriptionError::MigrationConfiguration(_)));
        assert!(err.to_string().contains("Migrate1To2"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_undocumented_steps_can_be_registered() {
        let registry = MigrationRegistry::new()
            .with_step(noop(2))
            .unwrap()
            .with_step(noop(1).with_description("first"))
            .unwrap();

        let names = registry.steps().map(MigrationStep::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["Migrate1To2", "Migrate2To3"]);
        assert!(registry.resolve(2).unwrap().description().is_none());
        assert!(registry.resolve(3).is_none());
    }

    #[test]
    fn test_builtin_registry_is_documented_and_contiguous() {
        let registry = MigrationRegistry::builtin().unwrap();
        assert_eq!(registry.len(), 2);
        for (expected_from, step) in (1..).zip(registry.steps()) {
            assert_eq!(step.from_version, expected_from);
            assert!(step.documented_description().is_ok());
        }
    }
}
