use super::{DescriptionStore, MANIFEST_FILE, validate_stored_name};
use crate::config::StoreConfig;
use crate::core::{DescriptionError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, event};
use uuid::Uuid;

/// Filesystem store: `<root>/<name>/manifest.json` plus extracted files.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Opens the store described by `config`, creating the root directory.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate().map_err(DescriptionError::IoError)?;
        fs::create_dir_all(&config.root).map_err(|err| {
            DescriptionError::IoError(format!(
                "Failed to create store directory '{}': {}",
                config.root.display(),
                err
            ))
        })?;
        Ok(Self::new(config.root.clone()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn existing_path(&self, name: &str) -> Result<PathBuf> {
        let path = self.description_path(name)?;
        if !path.is_dir() {
            return Err(DescriptionError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    fn backup_name(&self, name: &str) -> Result<String> {
        let base = format!("{}.backup", name);
        let mut candidate = base.clone();
        let mut counter = 1;
        while self.description_path(&candidate)?.exists() {
            candidate = format!("{}.{}", base, counter);
            counter += 1;
        }
        Ok(candidate)
    }
}

impl DescriptionStore for DirectoryStore {
    fn description_path(&self, name: &str) -> Result<PathBuf> {
        validate_stored_name(name)?;
        Ok(self.root.join(name))
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root).map_err(|err| {
            DescriptionError::IoError(format!(
                "Failed to read store directory '{}': {}",
                self.root.display(),
                err
            ))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| DescriptionError::IoError(err.to_string()))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_stored_name(&name).is_err() {
                continue;
            }
            if entry.path().join(MANIFEST_FILE).is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn backup(&self, name: &str) -> Result<String> {
        let source = self.existing_path(name)?;
        let backup_name = self.backup_name(name)?;
        let target = self.description_path(&backup_name)?;

        if let Err(err) = copy_dir_recursive(&source, &target) {
            if target.exists() {
                let _ = fs::remove_dir_all(&target);
            }
            return Err(err);
        }

        event!(Level::DEBUG, description = %name, backup = %backup_name, "description backed up");
        Ok(backup_name)
    }

    fn swap(&self, first: &str, second: &str) -> Result<()> {
        let first_path = self.existing_path(first)?;
        let second_path = self.existing_path(second)?;
        let parking = self.description_path(&format!("{}.swap-{}", first, Uuid::new_v4().simple()))?;

        rename_dir(&first_path, &parking)?;
        if let Err(err) = rename_dir(&second_path, &first_path) {
            let _ = fs::rename(&parking, &first_path);
            return Err(err);
        }
        rename_dir(&parking, &second_path)
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.existing_path(name)?;
        fs::remove_dir_all(&path).map_err(|err| {
            DescriptionError::IoError(format!(
                "Failed to remove description '{}': {}",
                path.display(),
                err
            ))
        })
    }

    fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        let old_path = self.existing_path(old_name)?;
        let new_path = self.description_path(new_name)?;
        if new_path.exists() {
            return Err(DescriptionError::IoError(format!(
                "Cannot rename '{}' to '{}': target already exists",
                old_name, new_name
            )));
        }
        rename_dir(&old_path, &new_path)
    }
}

fn rename_dir(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|err| {
        DescriptionError::IoError(format!(
            "Failed to rename '{}' -> '{}': {}",
            from.display(),
            to.display(),
            err
        ))
    })
}

fn copy_dir_recursive(source: &Path, target: &Path) -> Result<()> {
    let io_err = |path: &Path, err: std::io::Error| {
        DescriptionError::IoError(format!("Failed to copy '{}': {}", path.display(), err))
    };

    fs::create_dir(target).map_err(|err| io_err(target, err))?;
    for entry in fs::read_dir(source).map_err(|err| io_err(source, err))? {
        let entry = entry.map_err(|err| io_err(source, err))?;
        let from = entry.path();
        let to = target.join(entry.file_name());
        let file_type = entry.file_type().map_err(|err| io_err(&from, err))?;

        if file_type.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|err| io_err(&from, err))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let link = fs::read_link(from)
        .map_err(|err| DescriptionError::IoError(format!("Failed to read link '{}': {}", from.display(), err)))?;
    std::os::unix::fs::symlink(&link, to)
        .map_err(|err| DescriptionError::IoError(format!("Failed to create link '{}': {}", to.display(), err)))
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|err| DescriptionError::IoError(format!("Failed to copy '{}': {}", from.display(), err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MAX_NAME_LEN;
    use tempfile::TempDir;

    fn store_with(names: &[(&str, &str)]) -> (TempDir, DirectoryStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = DirectoryStore::new(temp_dir.path());
        for (name, manifest) in names {
            let dir = temp_dir.path().join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
        }
        (temp_dir, store)
    }

    fn read_manifest(store: &DirectoryStore, name: &str) -> String {
        fs::read_to_string(store.manifest_path(name).unwrap()).unwrap()
    }

    #[test]
    fn test_backup_copies_extracted_files() {
        let (temp_dir, store) = store_with(&[("host", "{}")]);
        let extracted = temp_dir.path().join("host/config_files/etc");
        fs::create_dir_all(&extracted).unwrap();
        fs::write(extracted.join("crontab"), "* * * * *").unwrap();

        let backup = store.backup("host").unwrap();
        assert_eq!(backup, "host.backup");
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("host.backup/config_files/etc/crontab")).unwrap(),
            "* * * * *"
        );

        assert_eq!(store.backup("host").unwrap(), "host.backup.1");
        assert_eq!(store.backup("host").unwrap(), "host.backup.2");
    }

    #[test]
    fn test_backup_of_missing_description() {
        let (_temp_dir, store) = store_with(&[]);
        assert!(matches!(store.backup("ghost"), Err(DescriptionError::NotFound(_))));
    }

    #[test]
    fn test_swap_exchanges_contents() {
        let (_temp_dir, store) = store_with(&[("a", "first"), ("b", "second")]);
        store.swap("a", "b").unwrap();
        assert_eq!(read_manifest(&store, "a"), "second");
        assert_eq!(read_manifest(&store, "b"), "first");
        assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_rename_refuses_to_overwrite() {
        let (_temp_dir, store) = store_with(&[("a", "first"), ("b", "second")]);
        assert!(store.rename("a", "b").is_err());
        assert_eq!(read_manifest(&store, "b"), "second");

        store.rename("a", "c").unwrap();
        assert!(!store.exists("a"));
        assert_eq!(read_manifest(&store, "c"), "first");
    }

    #[test]
    fn test_remove_and_list() {
        let (temp_dir, store) = store_with(&[("b", "{}"), ("a", "{}")]);
        fs::create_dir_all(temp_dir.path().join("not-a-description")).unwrap();
        assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);

        store.remove("a").unwrap();
        assert_eq!(store.list().unwrap(), vec!["b".to_string()]);
        assert!(matches!(store.remove("a"), Err(DescriptionError::NotFound(_))));
    }

    #[test]
    fn test_paths_reject_traversal() {
        let (_temp_dir, store) = store_with(&[]);
        assert!(store.description_path("../etc").is_err());
        assert!(!store.exists("../etc"));
    }

    #[test]
    fn test_longest_name_can_be_backed_up_and_swapped() {
        let name = "h".repeat(MAX_NAME_LEN);
        let (_temp_dir, store) = store_with(&[(name.as_str(), "original")]);

        let backup = store.backup(&name).unwrap();
        fs::write(store.manifest_path(&backup).unwrap(), "migrated").unwrap();
        store.swap(&name, &backup).unwrap();

        assert_eq!(read_manifest(&store, &name), "migrated");
        assert_eq!(read_manifest(&store, &backup), "original");
        assert_eq!(store.list().unwrap().len(), 2);
    }
}
