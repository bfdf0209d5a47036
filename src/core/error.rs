use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptionError {
    #[error("System description validation failed:\n{}", .0.join("\n"))]
    ValidationFailed(Vec<String>),

    #[error("Incompatible system description: {0}")]
    IncompatibleFormat(String),

    #[error("Migration configuration error: {0}")]
    MigrationConfiguration(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Migrated system description '{name}' could not be loaded: {source}")]
    MigratedDescriptionInvalid {
        name: String,
        #[source]
        source: Box<DescriptionError>,
    },

    #[error("System description '{0}' not found")]
    NotFound(String),

    #[error("Invalid system description name: {0}")]
    InvalidName(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl DescriptionError {
    /// Errors that describe a broken or unsupported document, as opposed to
    /// problems with the store or the migration setup.
    pub fn is_description_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed(_)
                | Self::IncompatibleFormat(_)
                | Self::ParseError(_)
                | Self::MigratedDescriptionInvalid { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DescriptionError>;

impl From<serde_json::Error> for DescriptionError {
    fn from(err: serde_json::Error) -> Self {
        DescriptionError::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_failed_lists_every_message() {
        let err = DescriptionError::ValidationFailed(vec![
            "In scope os: The property did not contain a required property of 'name'.".to_string(),
            "In scope os: The property did not contain a required property of 'version'.".to_string(),
        ]);
        let text = err.to_string();
        assert!(text.starts_with("System description validation failed:\n"));
        assert!(text.contains("'name'"));
        assert!(text.contains("'version'"));
    }

    #[test]
    fn test_description_error_classification() {
        assert!(DescriptionError::IncompatibleFormat("old".into()).is_description_error());
        assert!(DescriptionError::ParseError("bad json".into()).is_description_error());
        assert!(!DescriptionError::IoError("disk".into()).is_description_error());
        assert!(!DescriptionError::MigrationConfiguration("undocumented".into()).is_description_error());
    }
}
