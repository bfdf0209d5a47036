use super::Document;
use crate::core::{DescriptionError, Result};
use crate::schema::{FileValidator, SchemaCatalog};
use crate::store::DescriptionStore;
use std::path::Path;

/// Loads a description without checking it against any schema.
pub fn load_description<S>(store: &S, name: &str) -> Result<Document>
where
    S: DescriptionStore + ?Sized,
{
    let manifest = store.manifest_path(name)?;
    if !manifest.is_file() {
        return Err(DescriptionError::NotFound(name.to_string()));
    }

    Document::load(&manifest).map_err(|err| match err {
        DescriptionError::ParseError(reason) => DescriptionError::ParseError(format!(
            "The JSON data of the system description '{}' couldn't be parsed: {}",
            name, reason
        )),
        other => other,
    })
}

/// Structural errors of `document` for its own format version, followed by
/// missing extracted files below `description_path`.
pub fn validation_errors(
    document: &Document,
    description_path: &Path,
    catalog: &SchemaCatalog,
) -> Result<Vec<String>> {
    let mut errors = match document.format_version() {
        Some(version) => catalog.validator(version)?.validate(document),
        None => Vec::new(),
    };
    errors.extend(FileValidator::new(document, description_path).validate());
    Ok(errors)
}

/// Loads a description and rejects it unless it is at `expected_version`
/// and passes structural and file validation.
pub fn load_validated<S>(
    store: &S,
    name: &str,
    catalog: &SchemaCatalog,
    expected_version: u32,
) -> Result<Document>
where
    S: DescriptionStore + ?Sized,
{
    let document = load_description(store, name)?;

    match document.format_version() {
        Some(version) if version == expected_version => {}
        version => return Err(incompatible_version(name, version, expected_version)),
    }

    let errors = validation_errors(&document, &store.description_path(name)?, catalog)?;
    if !errors.is_empty() {
        return Err(DescriptionError::ValidationFailed(errors));
    }
    Ok(document)
}

pub fn incompatible_version(name: &str, version: Option<u32>, expected: u32) -> DescriptionError {
    let reason = match version {
        None => format!(
            "The system description '{}' was generated by an old version that is not \
             supported by the upgrade mechanism.",
            name
        ),
        Some(version) if version > expected => format!(
            "The system description '{}' has format version {}, which is newer than the \
             supported version {}. Use a newer release to work with it.",
            name, version, expected
        ),
        Some(version) => format!(
            "The system description '{}' has format version {}, expected {}. \
             Upgrade it to the current format first.",
            name, version, expected
        ),
    };
    DescriptionError::IncompatibleFormat(reason)
}
