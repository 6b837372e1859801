//! One-shot migration between backends
//!
//! Copies every key enumerated from a source backend into a destination,
//! verifying each copy by reading it back. Per-key failures are recorded in the
//! [`MigrationReport`]; only a failure to enumerate the source aborts the run.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::backend::{StorageBackend, compute_sha256};
use crate::error::StorageError;
use crate::key::validate_prefix;

#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    /// Key prefixes to migrate; empty means everything
    pub prefixes: Vec<String>,
    /// Leave keys the destination already has alone
    pub skip_existing: bool,
    /// Also compare SHA256 digests after the copy
    pub verify_checksum: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationOutcome {
    Copied,
    Skipped,
    Failed,
}

impl MigrationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationOutcome::Copied => "copied",
            MigrationOutcome::Skipped => "skipped",
            MigrationOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationEntry {
    pub key: String,
    pub outcome: MigrationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MigrationEntry {
    fn copied(key: &str) -> Self {
        Self {
            key: key.to_string(),
            outcome: MigrationOutcome::Copied,
            error: None,
        }
    }

    fn skipped(key: &str) -> Self {
        Self {
            key: key.to_string(),
            outcome: MigrationOutcome::Skipped,
            error: None,
        }
    }

    fn failed(key: &str, error: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            outcome: MigrationOutcome::Failed,
            error: Some(error.into()),
        }
    }
}

/// Result of one migration run.
///
/// Only the runner can build one, and it is complete once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    source: String,
    destination: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    total: usize,
    copied: usize,
    skipped: usize,
    failed: usize,
    entries: Vec<MigrationEntry>,
}

impl MigrationReport {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn copied(&self) -> usize {
        self.copied
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn entries(&self) -> &[MigrationEntry] {
        &self.entries
    }

    /// True when no key failed
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// File name the report is persisted under
    pub fn file_name(&self) -> String {
        format!(
            "migration-report-{}-to-{}-{}.json",
            self.source,
            self.destination,
            self.started_at.format("%Y%m%dT%H%M%S%.3fZ")
        )
    }

    /// Write the report as JSON into `dir`, returning the file path
    pub async fn persist(&self, dir: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;

        let path = dir.join(self.file_name());
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| StorageError::Fatal(format!("Failed to serialize migration report: {}", e)))?;
        fs::write(&path, json).await?;

        info!("Migration report written to {:?}", path);
        Ok(path)
    }
}

struct ReportBuilder {
    source: String,
    destination: String,
    started_at: DateTime<Utc>,
    entries: Vec<MigrationEntry>,
}

impl ReportBuilder {
    fn record(&mut self, entry: MigrationEntry) {
        counter!("tutorcast_migration_objects_total", "outcome" => entry.outcome.as_str()).increment(1);
        self.entries.push(entry);
    }

    fn finish(self) -> MigrationReport {
        let count = |outcome: MigrationOutcome| self.entries.iter().filter(|e| e.outcome == outcome).count();
        MigrationReport {
            total: self.entries.len(),
            copied: count(MigrationOutcome::Copied),
            skipped: count(MigrationOutcome::Skipped),
            failed: count(MigrationOutcome::Failed),
            source: self.source,
            destination: self.destination,
            started_at: self.started_at,
            finished_at: Utc::now(),
            entries: self.entries,
        }
    }
}

/// Sequential copy from one backend into another
pub struct MigrationRunner {
    source: Arc<dyn StorageBackend>,
    destination: Arc<dyn StorageBackend>,
    options: MigrationOptions,
}

impl MigrationRunner {
    pub fn new(
        source: Arc<dyn StorageBackend>,
        destination: Arc<dyn StorageBackend>,
        options: MigrationOptions,
    ) -> Self {
        Self {
            source,
            destination,
            options,
        }
    }

    /// Run the migration to completion
    pub async fn run(&self) -> Result<MigrationReport, StorageError> {
        let mut builder = ReportBuilder {
            source: self.source.backend_type().to_string(),
            destination: self.destination.backend_type().to_string(),
            started_at: Utc::now(),
            entries: Vec::new(),
        };

        let keys = self.enumerate().await?;
        info!(
            "Migrating {} objects from {} to {}",
            keys.len(),
            builder.source,
            builder.destination
        );

        for key in &keys {
            let entry = self.migrate_key(key).await;
            if let Some(error) = &entry.error {
                warn!("Failed to migrate {}: {}", key, error);
            } else {
                debug!("Migrated {}: {}", key, entry.outcome.as_str());
            }
            builder.record(entry);
        }

        let report = builder.finish();
        info!(
            "Migration finished: total={}, copied={}, skipped={}, failed={}",
            report.total, report.copied, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Union of the keys under every configured prefix, deduplicated and sorted
    async fn enumerate(&self) -> Result<BTreeSet<String>, StorageError> {
        let prefixes: Vec<&str> = if self.options.prefixes.is_empty() {
            vec![""]
        } else {
            self.options.prefixes.iter().map(String::as_str).collect()
        };

        let mut keys = BTreeSet::new();
        for prefix in prefixes {
            validate_prefix(prefix)?;
            let listed = self.source.list(prefix).await.map_err(|e| {
                StorageError::Fatal(format!("Failed to enumerate source prefix {:?}: {}", prefix, e))
            })?;
            keys.extend(listed);
        }
        Ok(keys)
    }

    async fn migrate_key(&self, key: &str) -> MigrationEntry {
        if self.options.skip_existing {
            match self.destination.exists(key).await {
                Ok(true) => return MigrationEntry::skipped(key),
                Ok(false) => {}
                Err(e) => return MigrationEntry::failed(key, format!("destination exists check: {}", e)),
            }
        }

        let object = match self.source.get(key).await {
            Ok(object) => object,
            Err(e) => return MigrationEntry::failed(key, format!("source get: {}", e)),
        };

        if let Err(e) = self.destination.put(key, object.clone()).await {
            return MigrationEntry::failed(key, format!("destination put: {}", e));
        }

        let copy = match self.destination.get(key).await {
            Ok(copy) => copy,
            Err(e) => return MigrationEntry::failed(key, format!("verification get: {}", e)),
        };

        if copy.len() != object.len() {
            return MigrationEntry::failed(
                key,
                format!("length mismatch: source {} bytes, destination {} bytes", object.len(), copy.len()),
            );
        }

        if self.options.verify_checksum {
            let expected = compute_sha256(&object.data);
            let actual = compute_sha256(&copy.data);
            if expected != actual {
                return MigrationEntry::failed(
                    key,
                    format!("checksum mismatch: expected {}, got {}", expected, actual),
                );
            }
        }

        MigrationEntry::copied(key)
    }
}
