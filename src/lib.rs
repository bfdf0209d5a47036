// ============================================================================
// sysdesc Library
// ============================================================================

pub mod config;
pub mod core;
pub mod document;
pub mod migration;
pub mod schema;
pub mod store;

// Re-export main types for convenience
pub use config::{MigrateOptions, StoreConfig};
pub use core::{DescriptionError, Result};
pub use document::{CURRENT_FORMAT_VERSION, Document, load_description, load_validated};
pub use store::{DescriptionStore, DirectoryStore};

// Re-export migration API
pub use migration::{
    MigrationOutcome, MigrationRegistry, MigrationStep, Migrator, migrate_description,
};

// Re-export validation API
pub use schema::{
    FileValidator, SchemaBundle, SchemaCatalog, SchemaValidator, cleanup_json_error_message,
};
