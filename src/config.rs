use std::env;
use std::path::PathBuf;

/// Environment variable that overrides the store location.
pub const STORE_ENV_VAR: &str = "SYSDESC_STORE";

const DEFAULT_STORE_DIR: &str = ".sysdesc";

/// Location of the system description store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding one sub-directory per description
    pub root: PathBuf,
}

impl StoreConfig {
    /// Create a configuration for an explicit store directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the store directory from `SYSDESC_STORE`, falling back to
    /// `$HOME/.sysdesc` (or `./.sysdesc` without a home directory).
    pub fn from_env() -> Self {
        if let Some(root) = env::var_os(STORE_ENV_VAR).filter(|value| !value.is_empty()) {
            return Self::new(root);
        }
        let home = env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(DEFAULT_STORE_DIR))
    }

    /// Set the store directory
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.root.as_os_str().is_empty() {
            return Err("Store directory cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Options controlling a single migration run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrateOptions {
    /// Migrate despite validation errors and skip the post-migration
    /// validation gate; the original is kept under the backup name.
    pub force: bool,

    /// Fail instead of stopping early when a step of the chain is not registered
    pub require_complete_chain: bool,
}

impl MigrateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the force flag
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Require every step up to the target version to be registered
    pub fn require_complete_chain(mut self, required: bool) -> Self {
        self.require_complete_chain = required;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_options_builder() {
        let options = MigrateOptions::new().force(true);
        assert!(options.force);
        assert!(!options.require_complete_chain);

        let strict = MigrateOptions::new().require_complete_chain(true);
        assert!(!strict.force);
        assert!(strict.require_complete_chain);
    }

    #[test]
    fn test_store_config_validation() {
        assert!(StoreConfig::new("/var/lib/sysdesc").validate().is_ok());
        assert!(StoreConfig::new("").validate().is_err());
        assert_eq!(
            StoreConfig::new("/a").root("/b").root,
            PathBuf::from("/b")
        );
    }
}
