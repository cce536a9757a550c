use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use walkdir::WalkDir;

use crate::config::DurfixConfig;
use crate::journal::Journal;
use crate::ledger::{Ledger, LedgerStatus};
use crate::repair::RepairEngine;

/// Result of one pass over the input tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub dry_run: bool,
    pub processed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    /// Outcomes journaled during this pass, keyed by status token.
    pub statuses: BTreeMap<LedgerStatus, usize>,
}

impl ScanSummary {
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len()
    }

    pub fn count(&self, status: LedgerStatus) -> usize {
        self.statuses.get(&status).copied().unwrap_or(0)
    }
}

/// Walks the input tree and drives every media file through the engine.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    config: Arc<DurfixConfig>,
    engine: RepairEngine,
    journal: Journal,
}

impl DirectoryScanner {
    pub fn new(config: Arc<DurfixConfig>, engine: RepairEngine, journal: Journal) -> Self {
        Self {
            config,
            engine,
            journal,
        }
    }

    /// Media files under `root`, in walk order.
    pub fn media_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    warn!(path = %path.display(), error = %err, "unreadable entry during walk");
                    self.journal.log(format!(
                        "Warning: unable to read {}: {err}",
                        path.display()
                    ));
                    continue;
                }
            };
            if entry.file_type().is_file() && self.config.scan.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files
    }

    pub async fn scan(&self, root: &Path, ledger: &Ledger) -> ScanSummary {
        let mut summary = ScanSummary {
            dry_run: self.config.repair.dry_run,
            ..ScanSummary::default()
        };

        for path in self.media_files(root) {
            let outcome = self.engine.process_file(&path, ledger).await;
            if let Some(status) = outcome.status() {
                *summary.statuses.entry(status).or_default() += 1;
            }
            if outcome.is_processed() {
                summary.processed.push(path);
            } else {
                summary.skipped.push(path);
            }
        }

        self.log_summary(&summary);
        summary
    }

    fn log_summary(&self, summary: &ScanSummary) {
        let processed = summary.processed_count();
        let skipped = summary.skipped_count();
        if summary.dry_run {
            self.journal.log(format!(
                "Process completed. {processed} files would be adjusted, {skipped} files would be skipped."
            ));
            self.journal.log("Dry-run mode summary:");
            self.journal
                .log(format!("  Total files that would be processed: {processed}"));
            self.journal
                .log(format!("  Total files that would be skipped: {skipped}"));
        } else {
            self.journal.log(format!(
                "Process completed. {processed} files adjusted, {skipped} files skipped."
            ));
            self.journal.log("Full-run mode summary:");
            self.journal.log(format!("  Total files processed: {processed}"));
            self.journal.log(format!("  Total files skipped: {skipped}"));
        }

        if self.config.scan.list_files_in_summary {
            self.log_paths("Processed files:", &summary.processed);
            self.log_paths("Skipped files:", &summary.skipped);
        }
    }

    fn log_paths(&self, header: &str, paths: &[PathBuf]) {
        self.journal.log(header);
        for path in paths {
            self.journal.log(format!("  {}", path.display()));
        }
    }
}
