use super::{MigrationRegistry, MigrationStep};
use crate::core::{DescriptionError, Result};
use crate::document::Document;
use crate::schema::EXTRACTABLE_SCOPES;
use serde_json::{Value, json};
use std::path::Path;

pub(crate) fn register(registry: &mut MigrationRegistry) -> Result<()> {
    registry.register(
        MigrationStep::new(1, 2)
            .with_description(
                "Wraps the file lists of config_files, changed_managed_files and \
                 unmanaged_files into objects carrying an 'extracted' flag, set when \
                 the scope's files were extracted into the description directory.",
            )
            .with_transform(wrap_file_scopes),
    )?;
    registry.register(
        MigrationStep::new(2, 3)
            .with_description(
                "Records the architecture on every package, taken from the os scope.",
            )
            .with_transform(add_package_architecture),
    )?;
    Ok(())
}

fn wrap_file_scopes(document: &mut Document, path: &Path) -> Result<()> {
    for scope in EXTRACTABLE_SCOPES {
        let Some(files) = document.remove_scope(scope) else {
            continue;
        };
        let extracted = path.join(scope).is_dir();
        document.insert_scope(scope, json!({ "extracted": extracted, "files": files }));
    }
    Ok(())
}

fn add_package_architecture(document: &mut Document, _path: &Path) -> Result<()> {
    let architecture = document
        .scope("os")
        .and_then(|os| os.get("architecture"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let Some(packages) = document.scope_mut("packages").and_then(Value::as_array_mut) else {
        return Ok(());
    };
    if packages.is_empty() {
        return Ok(());
    }
    let Some(architecture) = architecture else {
        return Err(DescriptionError::MigrationFailed(
            "the packages scope needs the os scope's architecture".to_string(),
        ));
    };

    for package in packages.iter_mut().filter_map(Value::as_object_mut) {
        package
            .entry("arch")
            .or_insert_with(|| Value::String(architecture.clone()));
    }
    Ok(())
}
