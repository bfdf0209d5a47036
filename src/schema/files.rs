use crate::document::Document;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Scopes whose files can be extracted into the description directory.
pub const EXTRACTABLE_SCOPES: [&str; 3] = ["config_files", "changed_managed_files", "unmanaged_files"];

/// Checks that scopes marked as extracted have their files on disk.
#[derive(Debug, Clone, Copy)]
pub struct FileValidator<'a> {
    document: &'a Document,
    description_path: &'a Path,
}

impl<'a> FileValidator<'a> {
    pub fn new(document: &'a Document, description_path: &'a Path) -> Self {
        Self {
            document,
            description_path,
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for scope in EXTRACTABLE_SCOPES {
            let Some(data) = self.document.scope(scope) else {
                continue;
            };
            if data.get("extracted").and_then(Value::as_bool) != Some(true) {
                continue;
            }

            let scope_dir = self.description_path.join(scope);
            if !scope_dir.is_dir() {
                errors.push(format!(
                    "In scope {}: The scope is marked as extracted but the directory '{}' is missing.",
                    scope,
                    scope_dir.display()
                ));
                continue;
            }

            let missing = data
                .get("files")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter(|file| expects_extracted_file(file))
                .filter_map(|file| file.get("name").and_then(Value::as_str))
                .filter(|name| fs::symlink_metadata(scope_dir.join(name.trim_start_matches('/'))).is_err())
                .collect::<Vec<_>>();

            if !missing.is_empty() {
                errors.push(format!(
                    "In scope {}: The following files are missing from the extraction directory: {}",
                    scope,
                    missing.join(", ")
                ));
            }
        }

        errors
    }
}

fn expects_extracted_file(file: &Value) -> bool {
    let regular = file
        .get("type")
        .and_then(Value::as_str)
        .is_none_or(|kind| kind == "file");
    let deleted = file.get("status").and_then(Value::as_str) == Some("deleted")
        || file
            .get("changes")
            .and_then(Value::as_array)
            .is_some_and(|changes| changes.iter().any(|change| change.as_str() == Some("deleted")));
    regular && !deleted
}
