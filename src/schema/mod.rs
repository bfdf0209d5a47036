//! Structural validation of system descriptions
//!
//! - `bundle.rs` - Versioned schema bundles and the catalog holding them
//! - `validator.rs` - Compiled validator for one format version
//! - `message.rs` - Normalization of raw validation reports
//! - `files.rs` - Presence check for extracted files

mod bundle;
mod files;
mod message;
mod validator;

pub use bundle::{SchemaBundle, SchemaCatalog};
pub use files::{EXTRACTABLE_SCOPES, FileValidator};
pub use message::{RawValidationError, cleanup_json_error_message};
pub use validator::SchemaValidator;
