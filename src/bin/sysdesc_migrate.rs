use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sysdesc::{
    CURRENT_FORMAT_VERSION, DescriptionStore, DirectoryStore, MigrateOptions, MigrationOutcome,
    Migrator, SchemaCatalog, StoreConfig, load_description, load_validated,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sysdesc-migrate")]
#[command(about = "Upgrades and validates stored system descriptions")]
struct Cli {
    /// Store directory (defaults to $SYSDESC_STORE or ~/.sysdesc)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Migrate descriptions to the current format version
    Upgrade {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        name: Option<String>,
        /// Upgrade every description in the store
        #[arg(long)]
        all: bool,
        /// Migrate despite validation errors, keeping the original as backup
        #[arg(long)]
        force: bool,
        /// Fail when a step between the current and target version is missing
        #[arg(long)]
        strict: bool,
    },
    /// Validate a description against the current format
    Validate { name: String },
    /// List stored descriptions
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match cli.store {
        Some(root) => StoreConfig::new(root),
        None => StoreConfig::from_env(),
    };
    let store = DirectoryStore::open(&config)
        .with_context(|| format!("Failed to open store '{}'", config.root.display()))?;

    match cli.command {
        Command::Upgrade {
            name,
            all,
            force,
            strict,
        } => {
            let options = MigrateOptions::new()
                .force(force)
                .require_complete_chain(strict);
            let migrator = Migrator::builtin()?;
            if all {
                upgrade_all(&store, &migrator, &options)
            } else {
                let name = name.ok_or_else(|| anyhow!("a description name or --all is required"))?;
                upgrade(&store, &migrator, &name, &options)
            }
        }
        Command::Validate { name } => validate(&store, &name),
        Command::List => list(&store),
    }
}

fn upgrade(
    store: &DirectoryStore,
    migrator: &Migrator,
    name: &str,
    options: &MigrateOptions,
) -> Result<()> {
    let outcome = migrator
        .migrate(store, name, options)
        .with_context(|| format!("Failed to upgrade system description '{}'", name))?;

    match outcome {
        MigrationOutcome::NotNeeded { .. } => println!("No upgrade necessary."),
        MigrationOutcome::NoStepAvailable { version } => println!(
            "No migration available for system description '{}' at format version {}.",
            name, version
        ),
        MigrationOutcome::Migrated {
            from_version,
            to_version,
            backup,
        } => {
            if let Some(backup) = backup {
                println!("Saved backup to {}", backup.display());
            }
            println!(
                "Upgraded system description '{}' from version {} to {}.",
                name, from_version, to_version
            );
        }
    }
    Ok(())
}

fn upgrade_all(store: &DirectoryStore, migrator: &Migrator, options: &MigrateOptions) -> Result<()> {
    let mut failed = Vec::new();
    for name in store.list()? {
        if let Err(err) = upgrade(store, migrator, &name, options) {
            eprintln!("{:#}", err);
            failed.push(name);
        }
    }

    if !failed.is_empty() {
        bail!(
            "Upgrading failed for {} system description(s): {}",
            failed.len(),
            failed.join(", ")
        );
    }
    Ok(())
}

fn validate(store: &DirectoryStore, name: &str) -> Result<()> {
    let catalog = SchemaCatalog::builtin()?;
    load_validated(store, name, &catalog, CURRENT_FORMAT_VERSION)
        .with_context(|| format!("System description '{}' is not valid", name))?;
    println!("System description '{}' is valid.", name);
    Ok(())
}

fn list(store: &DirectoryStore) -> Result<()> {
    for name in store.list()? {
        match load_description(store, &name) {
            Ok(document) => match document.format_version() {
                Some(version) => println!("{}\tformat version {}", name, version),
                None => println!("{}\tunversioned", name),
            },
            Err(err) => println!("{}\tunreadable: {}", name, err),
        }
    }
    Ok(())
}
