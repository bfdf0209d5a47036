use super::MigrationRegistry;
use crate::config::MigrateOptions;
use crate::core::{DescriptionError, Result};
use crate::document::{
    CURRENT_FORMAT_VERSION, incompatible_version, load_description, load_validated,
    validation_errors,
};
use crate::schema::SchemaCatalog;
use crate::store::{DescriptionStore, validate_description_name};
use std::path::PathBuf;
use tracing::{Level, event, info_span};

/// What a migration run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The description already is at the target version.
    NotNeeded { version: u32 },
    /// No step is registered for the description's version; nothing changed.
    NoStepAvailable { version: u32 },
    /// The description was migrated. `backup` is set in force mode and
    /// points to the copy holding the description as it was before.
    Migrated {
        from_version: u32,
        to_version: u32,
        backup: Option<PathBuf>,
    },
}

impl MigrationOutcome {
    pub fn is_migrated(&self) -> bool {
        matches!(self, Self::Migrated { .. })
    }
}

/// Upgrades stored descriptions to a target format version.
#[derive(Debug, Clone)]
pub struct Migrator {
    registry: MigrationRegistry,
    catalog: SchemaCatalog,
    target_version: u32,
}

impl Migrator {
    pub fn new(registry: MigrationRegistry, catalog: SchemaCatalog) -> Self {
        Self {
            registry,
            catalog,
            target_version: CURRENT_FORMAT_VERSION,
        }
    }

    /// Built-in steps and schemas, targeting [`CURRENT_FORMAT_VERSION`].
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(MigrationRegistry::builtin()?, SchemaCatalog::builtin()?))
    }

    pub fn with_target_version(mut self, target_version: u32) -> Self {
        self.target_version = target_version;
        self
    }

    pub fn target_version(&self) -> u32 {
        self.target_version
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Migrates the description `name` to the target version.
    ///
    /// All steps run against a backup copy. Without `force` the migrated
    /// copy must load as a valid description before it replaces the
    /// original; on any failure the copy is removed and the original stays
    /// untouched. With `force` the copy is swapped in unconditionally and
    /// the outcome reports where the previous version was kept.
    pub fn migrate<S>(&self, store: &S, name: &str, options: &MigrateOptions) -> Result<MigrationOutcome>
    where
        S: DescriptionStore + ?Sized,
    {
        let span = info_span!(
            "migration.migrate",
            description = %name,
            target_version = self.target_version,
            force = options.force
        );
        let _enter = span.enter();

        validate_description_name(name)?;
        let document = load_description(store, name)?;

        // Unversioned and newer documents are incompatible regardless of `force`.
        let current_version = match document.format_version() {
            Some(version) if version <= self.target_version => version,
            version => return Err(incompatible_version(name, version, self.target_version)),
        };

        let errors = validation_errors(&document, &store.description_path(name)?, &self.catalog)?;
        if !errors.is_empty() {
            if !options.force {
                return Err(DescriptionError::ValidationFailed(errors));
            }
            for error in &errors {
                event!(Level::WARN, error = %error, "system description validation error");
            }
        }

        if current_version == self.target_version {
            event!(Level::INFO, version = current_version, "no upgrade necessary");
            return Ok(MigrationOutcome::NotNeeded {
                version: current_version,
            });
        }

        let backup_name = store.backup(name)?;
        let reached_version = match self.migrate_backup(store, &backup_name, current_version, options) {
            Ok(version) => version,
            Err(err) => {
                discard_backup(store, &backup_name);
                return Err(err);
            }
        };

        if reached_version == current_version {
            discard_backup(store, &backup_name);
            return Ok(MigrationOutcome::NoStepAvailable {
                version: current_version,
            });
        }

        if options.force {
            if let Err(err) = store.swap(name, &backup_name) {
                discard_backup(store, &backup_name);
                return Err(err);
            }
            let backup_path = store.description_path(&backup_name)?;
            event!(
                Level::INFO,
                backup = %backup_path.display(),
                from_version = current_version,
                to_version = reached_version,
                "description migrated, previous version saved as backup"
            );
            return Ok(MigrationOutcome::Migrated {
                from_version: current_version,
                to_version: reached_version,
                backup: Some(backup_path),
            });
        }

        if let Err(err) = load_validated(store, &backup_name, &self.catalog, reached_version) {
            discard_backup(store, &backup_name);
            event!(Level::ERROR, error = %err, "migrated description failed to load");
            if err.is_description_error() {
                return Err(DescriptionError::MigratedDescriptionInvalid {
                    name: name.to_string(),
                    source: Box::new(err),
                });
            }
            return Err(err);
        }

        store.remove(name)?;
        store.rename(&backup_name, name).map_err(|err| {
            DescriptionError::IoError(format!(
                "{} (the migrated description is kept as '{}')",
                err, backup_name
            ))
        })?;

        event!(
            Level::INFO,
            from_version = current_version,
            to_version = reached_version,
            "description migrated"
        );
        Ok(MigrationOutcome::Migrated {
            from_version: current_version,
            to_version: reached_version,
            backup: None,
        })
    }

    /// Applies the chain to the backup copy and saves it. Returns the
    /// version reached.
    fn migrate_backup<S>(
        &self,
        store: &S,
        backup_name: &str,
        current_version: u32,
        options: &MigrateOptions,
    ) -> Result<u32>
    where
        S: DescriptionStore + ?Sized,
    {
        let backup_path = store.description_path(backup_name)?;
        let mut backup = load_description(store, backup_name)?;

        let mut version = current_version;
        while version < self.target_version {
            let Some(step) = self.registry.resolve(version) else {
                if options.require_complete_chain {
                    return Err(DescriptionError::MigrationConfiguration(format!(
                        "No migration step registered for format version {} -> {}",
                        version,
                        version + 1
                    )));
                }
                event!(
                    Level::WARN,
                    reached_version = version,
                    target_version = self.target_version,
                    "migration chain incomplete, stopping early"
                );
                break;
            };

            let description = step.documented_description()?;
            event!(Level::INFO, step = %step.name(), description = %description, "applying migration step");
            step.apply(&mut backup, &backup_path)?;

            version = step.to_version;
            backup.set_format_version(version);
        }

        if version != current_version {
            backup.save(&store.manifest_path(backup_name)?)?;
        }
        Ok(version)
    }
}

fn discard_backup<S>(store: &S, backup_name: &str)
where
    S: DescriptionStore + ?Sized,
{
    match store.remove(backup_name) {
        Ok(()) => event!(Level::DEBUG, backup = %backup_name, "backup discarded"),
        Err(err) => event!(
            Level::ERROR,
            backup = %backup_name,
            error = %err,
            "failed to remove backup"
        ),
    }
}

/// Migrates `name` with the built-in steps and schemas to
/// [`CURRENT_FORMAT_VERSION`]. Returns whether a migration happened.
pub fn migrate_description<S>(store: &S, name: &str, options: &MigrateOptions) -> Result<bool>
where
    S: DescriptionStore + ?Sized,
{
    Ok(Migrator::builtin()?.migrate(store, name, options)?.is_migrated())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::migration::MigrationStep;
    use crate::store::DirectoryStore;
    use serde_json::json;

    fn store_with(version: u32) -> (tempfile::TempDir, DirectoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let path = store.description_path("host").unwrap();
        std::fs::create_dir_all(&path).unwrap();
        Document::new(version)
            .save(&store.manifest_path("host").unwrap())
            .unwrap();
        (dir, store)
    }

    fn adding_step(from: u32, key: &'static str) -> MigrationStep {
        MigrationStep::new(from, from + 1)
            .with_description(format!("Adds {}", key))
            .with_transform(move |document, _path| {
                document.insert_scope(key, json!({}));
                Ok(())
            })
    }

    #[test]
    fn test_partial_chain_stops_at_last_registered_step() {
        let (_dir, store) = store_with(1);
        let registry = MigrationRegistry::new().with_step(adding_step(1, "foo")).unwrap();
        let migrator = Migrator::new(registry, SchemaCatalog::new()).with_target_version(3);

        let outcome = migrator.migrate(&store, "host", &MigrateOptions::new()).unwrap();
        assert_eq!(
            outcome,
            MigrationOutcome::Migrated {
                from_version: 1,
                to_version: 2,
                backup: None
            }
        );
        assert_eq!(store.list().unwrap(), vec!["host".to_string()]);
    }

    #[test]
    fn test_incomplete_chain_rejected_when_required() {
        let (_dir, store) = store_with(1);
        let registry = MigrationRegistry::new().with_step(adding_step(1, "foo")).unwrap();
        let migrator = Migrator::new(registry, SchemaCatalog::new()).with_target_version(3);

        let options = MigrateOptions::new().require_complete_chain(true);
        let err = migrator.migrate(&store, "host", &options).unwrap_err();
        assert!(matches!(err, DescriptionError::MigrationConfiguration(_)));
        assert!(!store.exists("host.backup"));
        let document = load_description(&store, "host").unwrap();
        assert_eq!(document.format_version(), Some(1));
    }

    #[test]
    fn test_no_step_for_version_leaves_no_backup() {
        let (_dir, store) = store_with(1);
        let migrator = Migrator::new(MigrationRegistry::new(), SchemaCatalog::new());

        let outcome = migrator.migrate(&store, "host", &MigrateOptions::new()).unwrap();
        assert_eq!(outcome, MigrationOutcome::NoStepAvailable { version: 1 });
        assert!(!outcome.is_migrated());
        assert_eq!(store.list().unwrap(), vec!["host".to_string()]);
    }
}
