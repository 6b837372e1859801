//! `tutorcast migrate`: one-shot copy between the local and remote backends

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tutorcast_storage::{MigrationOptions, MigrationRunner, StorageBackend, StorageNamespace};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    RemoteToLocal,
    LocalToRemote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NamespaceArg {
    Recordings,
    Layouts,
    All,
}

impl NamespaceArg {
    fn namespaces(self) -> Vec<StorageNamespace> {
        match self {
            NamespaceArg::Recordings => vec![StorageNamespace::Recordings],
            NamespaceArg::Layouts => vec![StorageNamespace::Layouts],
            NamespaceArg::All => StorageNamespace::ALL.to_vec(),
        }
    }
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Which way to copy
    #[arg(long, value_enum)]
    pub direction: Direction,

    /// Which storage namespace to migrate
    #[arg(long, value_enum, default_value = "all")]
    pub namespace: NamespaceArg,

    /// Only migrate keys under this prefix (repeatable)
    #[arg(long = "prefix")]
    pub prefixes: Vec<String>,

    /// Leave keys that already exist at the destination untouched
    #[arg(long)]
    pub skip_existing: bool,

    /// Compare SHA256 digests in addition to lengths
    #[arg(long)]
    pub verify_checksum: bool,

    /// Directory for the report files (defaults to [migration] reports_dir)
    #[arg(long)]
    pub reports_dir: Option<PathBuf>,
}

/// Run the migration for every selected namespace.
///
/// Fails when a source cannot be enumerated or any key failed to copy.
pub async fn run(config: &Config, args: MigrateArgs) -> Result<()> {
    let storage = config.storage_config()?;
    let reports_dir = args
        .reports_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.migration.reports_dir));
    let options = MigrationOptions {
        prefixes: args.prefixes.clone(),
        skip_existing: args.skip_existing,
        verify_checksum: args.verify_checksum,
    };

    let mut failed = 0;
    for namespace in args.namespace.namespaces() {
        let local: Arc<dyn StorageBackend> = Arc::new(storage.build_local(namespace).await?);
        let remote: Arc<dyn StorageBackend> = Arc::new(
            storage
                .build_remote(namespace)?
                .ok_or_else(|| anyhow!("No bucket configured for {}, cannot migrate", namespace))?,
        );

        let (source, destination) = match args.direction {
            Direction::RemoteToLocal => (remote, local),
            Direction::LocalToRemote => (local, remote),
        };

        info!("Migrating {} ({:?})", namespace, args.direction);
        let report = MigrationRunner::new(source, destination, options.clone())
            .run()
            .await
            .with_context(|| format!("Migration of {} aborted", namespace))?;

        let path = report.persist(reports_dir.join(namespace.as_str())).await?;

        info!("Migration of {} complete", namespace);
        info!("  Total:   {}", report.total());
        info!("  Copied:  {}", report.copied());
        info!("  Skipped: {}", report.skipped());
        info!("  Failed:  {}", report.failed());
        info!("  Report:  {}", path.display());

        for entry in report.entries().iter().filter(|e| e.error.is_some()) {
            warn!("  {}: {}", entry.key, entry.error.as_deref().unwrap_or_default());
        }
        failed += report.failed();
    }

    if failed > 0 {
        bail!("{} objects failed to migrate", failed);
    }
    Ok(())
}
