//! System description store
//!
//! A store keeps one directory per description: the `manifest.json`
//! document plus any extracted file trees next to it. The migration
//! runner only talks to the store through [`DescriptionStore`].

mod directory;

pub use directory::DirectoryStore;

use crate::core::{DescriptionError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name of the JSON document inside a description directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Longest directory name the store creates.
const MAX_FILE_NAME_LEN: usize = 255;

/// Room kept free after a description name for derived names such as
/// `<name>.backup.<n>` and `<name>.swap-<uuid>`.
const RESERVED_SUFFIX_LEN: usize = 38;

/// Longest name accepted for a description.
pub const MAX_NAME_LEN: usize = MAX_FILE_NAME_LEN - RESERVED_SUFFIX_LEN;

pub trait DescriptionStore {
    /// Directory holding the description and its extracted files.
    fn description_path(&self, name: &str) -> Result<PathBuf>;

    /// Path of the description's JSON document.
    fn manifest_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.description_path(name)?.join(MANIFEST_FILE))
    }

    fn exists(&self, name: &str) -> bool {
        self.manifest_path(name)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Names of all stored descriptions, sorted.
    fn list(&self) -> Result<Vec<String>>;

    /// Copies a description (including extracted files) under a fresh name
    /// and returns that name.
    fn backup(&self, name: &str) -> Result<String>;

    /// Exchanges the contents stored under the two names.
    fn swap(&self, first: &str, second: &str) -> Result<()>;

    fn remove(&self, name: &str) -> Result<()>;

    fn rename(&self, old_name: &str, new_name: &str) -> Result<()>;
}

/// Validates description names so they always map to a single directory
/// below the store root, with room left for backup and swap names.
pub fn validate_description_name(name: &str) -> Result<()> {
    check_name(name, MAX_NAME_LEN)
}

/// Validates names the store itself derives from a description name.
pub(crate) fn validate_stored_name(name: &str) -> Result<()> {
    check_name(name, MAX_FILE_NAME_LEN)
}

fn check_name(name: &str, max_len: usize) -> Result<()> {
    if name.is_empty() {
        return Err(DescriptionError::InvalidName(
            "System description name cannot be empty".to_string(),
        ));
    }

    if name.starts_with('.') {
        return Err(DescriptionError::InvalidName(format!(
            "'{}' must not start with a dot",
            name
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
    {
        return Err(DescriptionError::InvalidName(format!(
            "'{}' can only contain letters, numbers and the characters '_', '-', '.', ':'",
            name
        )));
    }

    if name.len() > max_len {
        return Err(DescriptionError::InvalidName(format!(
            "'{}...' is too long (max {} characters)",
            &name[..32],
            max_len
        )));
    }

    Ok(())
}

/// Writes `bytes` to `path` through a temp file in the same directory so
/// readers never observe a partially written file.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| {
        DescriptionError::IoError(format!(
            "Failed to create parent directory '{}': {}",
            parent.display(),
            err
        ))
    })?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|err| {
        DescriptionError::IoError(format!(
            "Failed to create temp file in '{}': {}",
            parent.display(),
            err
        ))
    })?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|err| {
            DescriptionError::IoError(format!(
                "Failed to write temp file for '{}': {}",
                path.display(),
                err
            ))
        })?;

    tmp.persist(path).map_err(|err| {
        DescriptionError::IoError(format!(
            "Failed to rename temp file -> '{}': {}",
            path.display(),
            err
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_description_names() {
        assert!(validate_description_name("host1").is_ok());
        assert!(validate_description_name("web-01.example.com").is_ok());
        assert!(validate_description_name("db_primary:2024").is_ok());
        assert!(validate_description_name("host1.backup.2").is_ok());
    }

    #[test]
    fn test_invalid_description_names() {
        assert!(validate_description_name("").is_err());
        assert!(validate_description_name(".hidden").is_err());
        assert!(validate_description_name("..").is_err());
        assert!(validate_description_name("a/b").is_err());
        assert!(validate_description_name("with space").is_err());
        assert!(validate_description_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_name_length_leaves_room_for_derived_names() {
        let longest = "h".repeat(MAX_NAME_LEN);
        assert!(validate_description_name(&longest).is_ok());
        assert!(validate_description_name(&format!("{}x", longest)).is_err());

        let swap = format!("{}.swap-{}", longest, "0".repeat(32));
        assert_eq!(swap.len(), MAX_FILE_NAME_LEN);
        assert!(validate_stored_name(&swap).is_ok());
        assert!(validate_stored_name(&format!("{}.backup.99", longest)).is_ok());
        assert!(validate_stored_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("manifest.json");

        atomic_write(&path, b"{\"a\": 1}").unwrap();
        atomic_write(&path, b"{\"a\": 2}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\": 2}");
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
