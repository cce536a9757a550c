use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::ledger::LedgerStatus;
use crate::probe::DurationPair;

/// What happened to one file during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Skipped because of a prior journal entry.
    AlreadyLogged { status: LedgerStatus },
    ProbeFailed { reason: String },
    WithinThreshold { durations: DurationPair },
    DryRun { durations: DurationPair },
    Adjusted {
        durations: DurationPair,
        output: PathBuf,
    },
    RepairFailed {
        durations: DurationPair,
        reason: String,
    },
}

impl FileOutcome {
    /// Whether the file counts as processed in the run summary. A failed
    /// repair still counts: the repair was attempted.
    pub fn is_processed(&self) -> bool {
        matches!(
            self,
            FileOutcome::DryRun { .. }
                | FileOutcome::Adjusted { .. }
                | FileOutcome::RepairFailed { .. }
        )
    }

    /// Status journaled for this outcome; `None` when nothing new was recorded.
    pub fn status(&self) -> Option<LedgerStatus> {
        match self {
            FileOutcome::AlreadyLogged { .. } => None,
            FileOutcome::ProbeFailed { .. } | FileOutcome::RepairFailed { .. } => {
                Some(LedgerStatus::Error)
            }
            FileOutcome::WithinThreshold { .. } => Some(LedgerStatus::Skipped),
            FileOutcome::DryRun { .. } => Some(LedgerStatus::DryRun),
            FileOutcome::Adjusted { .. } => Some(LedgerStatus::Adjusted),
        }
    }

    pub fn durations(&self) -> Option<DurationPair> {
        match self {
            FileOutcome::WithinThreshold { durations }
            | FileOutcome::DryRun { durations }
            | FileOutcome::Adjusted { durations, .. }
            | FileOutcome::RepairFailed { durations, .. } => Some(*durations),
            FileOutcome::AlreadyLogged { .. } | FileOutcome::ProbeFailed { .. } => None,
        }
    }
}

/// Sibling scratch path for a trimmed copy: `a.mkv` becomes `a.mkv.temp.mkv`,
/// keeping the extension so the muxer picks the same container.
pub fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".temp");
    if let Some(ext) = destination.extension() {
        name.push(".");
        name.push(ext);
    }
    PathBuf::from(name)
}
