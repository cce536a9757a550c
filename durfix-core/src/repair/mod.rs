mod error;
mod transcode;
mod types;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::warn;

use crate::command::{CommandExecutor, SystemCommandExecutor};
use crate::config::{DurfixConfig, SkipPolicy};
use crate::journal::Journal;
use crate::ledger::{entry_suffix, Ledger, LedgerStatus};
use crate::probe::{DurationPair, DurationProber};

pub use error::{RepairError, RepairResult};
pub use transcode::Transcoder;
pub use types::{temp_path_for, FileOutcome};

/// Decides per file whether the durations disagree enough to trim, and trims.
#[derive(Clone)]
pub struct RepairEngine {
    config: Arc<DurfixConfig>,
    prober: DurationProber,
    transcoder: Transcoder,
    journal: Journal,
}

impl fmt::Debug for RepairEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepairEngine")
            .field("threshold_seconds", &self.config.repair.threshold_seconds)
            .field("dry_run", &self.config.repair.dry_run)
            .field("prober", &self.prober)
            .field("transcoder", &self.transcoder)
            .finish()
    }
}

impl RepairEngine {
    pub fn new(
        config: Arc<DurfixConfig>,
        journal: Journal,
        executor: Option<Arc<dyn CommandExecutor>>,
    ) -> Self {
        let executor = executor.unwrap_or_else(|| Arc::new(SystemCommandExecutor));
        let prober = DurationProber::new(&config.tools, Some(executor.clone()));
        let transcoder = Transcoder::new(&config.tools, &config.repair, executor);
        Self {
            config,
            prober,
            transcoder,
            journal,
        }
    }

    pub async fn process_file(&self, path: &Path, ledger: &Ledger) -> FileOutcome {
        if let Some(status) = self.already_handled(path, ledger) {
            return FileOutcome::AlreadyLogged { status };
        }

        let durations = match self.prober.durations(path).await {
            Ok(durations) => durations,
            Err(err) => {
                self.journal.log(format!(
                    "Error extracting durations from {}: {err}",
                    path.display()
                ));
                self.journal.log(format!(
                    "Skipping file {} due to missing duration data.{}",
                    path.display(),
                    entry_suffix(path, LedgerStatus::Error)
                ));
                return FileOutcome::ProbeFailed {
                    reason: err.to_string(),
                };
            }
        };

        self.journal.log(format!("File: {}", path.display()));
        self.journal
            .log(format!("  General Duration: {}s", durations.container));
        self.journal
            .log(format!("  Video Duration: {}s", durations.stream));
        self.journal
            .log(format!("  Discrepancy: {}s", durations.discrepancy()));

        let threshold = self.config.repair.threshold_seconds;
        if !durations.exceeds(threshold) {
            self.journal.log(format!(
                "  Discrepancy within acceptable range. No action taken.{}",
                entry_suffix(path, LedgerStatus::Skipped)
            ));
            return FileOutcome::WithinThreshold { durations };
        }

        self.journal
            .log(format!("  Discrepancy exceeds threshold of {threshold}s."));
        if self.config.repair.dry_run {
            self.journal.log(format!(
                "  Dry-run: No action taken.{}",
                entry_suffix(path, LedgerStatus::DryRun)
            ));
            return FileOutcome::DryRun { durations };
        }

        self.repair(path, durations).await
    }

    fn already_handled(&self, path: &Path, ledger: &Ledger) -> Option<LedgerStatus> {
        let status = ledger.status(path)?;
        match self.config.repair.skip_policy {
            SkipPolicy::AdjustedOnly if status == LedgerStatus::Adjusted => {
                self.journal.log(format!(
                    "Skipping file already processed: {} | STATUS: {status}",
                    path.display()
                ));
                Some(status)
            }
            SkipPolicy::AdjustedOnly => None,
            SkipPolicy::AnyEntry => {
                self.journal.log(format!(
                    "Skipping file already logged: {} | STATUS: {status}",
                    path.display()
                ));
                Some(status)
            }
        }
    }

    async fn repair(&self, path: &Path, durations: DurationPair) -> FileOutcome {
        match self.trim_into_place(path, durations.stream).await {
            Ok(output) => {
                let message = if output == path {
                    format!("  Adjusted file saved and replaced original: {}", path.display())
                } else {
                    format!("  Adjusted file saved to {}", output.display())
                };
                self.journal.log(format!(
                    "{message}{}",
                    entry_suffix(path, LedgerStatus::Adjusted)
                ));
                FileOutcome::Adjusted { durations, output }
            }
            Err(err) => {
                self.journal.log(format!(
                    "  Error adjusting file {}: {err}{}",
                    path.display(),
                    entry_suffix(path, LedgerStatus::Error)
                ));
                FileOutcome::RepairFailed {
                    durations,
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Trims into a sibling temp file and renames it over the destination.
    /// The destination is only touched after ffmpeg succeeded.
    async fn trim_into_place(&self, path: &Path, seconds: u64) -> RepairResult<PathBuf> {
        let destination = self.destination_for(path).await?;
        let temp = temp_path_for(&destination);

        if let Err(err) = self.transcoder.trim(path, &temp, seconds).await {
            discard(&temp).await;
            return Err(err);
        }
        if let Err(source) = fs::rename(&temp, &destination).await {
            discard(&temp).await;
            return Err(RepairError::io(source, destination));
        }
        Ok(destination)
    }

    async fn destination_for(&self, path: &Path) -> RepairResult<PathBuf> {
        let Some(rendered) = &self.config.paths.rendered_dir else {
            return Ok(path.to_path_buf());
        };
        let relative = path
            .strip_prefix(&self.config.paths.input_dir)
            .ok()
            .map(Path::to_path_buf)
            .or_else(|| path.file_name().map(PathBuf::from))
            .unwrap_or_else(|| path.to_path_buf());
        let destination = rendered.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| RepairError::io(source, parent))?;
        }
        Ok(destination)
    }
}

async fn discard(temp: &Path) {
    match fs::remove_file(temp).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            warn!(path = %temp.display(), error = %err, "failed to remove temporary file");
        }
    }
}
