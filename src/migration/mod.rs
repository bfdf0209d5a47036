//! Format version migration of stored descriptions
//!
//! - `step.rs` - A single documented `N -> N+1` transformation
//! - `registry.rs` - Steps keyed by their source version
//! - `builtin.rs` - Steps shipped for the built-in format versions
//! - `runner.rs` - Backup, chain execution, verification and promotion

mod builtin;
mod registry;
mod runner;
mod step;

pub use registry::MigrationRegistry;
pub use runner::{MigrationOutcome, Migrator, migrate_description};
pub use step::{DocumentMigrationFn, MigrationStep};
