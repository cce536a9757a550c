use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::journal::Journal;

pub const FIELD_DELIMITER: &str = " | ";
pub const FILE_MARKER: &str = "FILE:";
pub const STATUS_MARKER: &str = "STATUS:";
pub const MALFORMED_WARNING: &str = "Warning: Malformed log entry skipped:";

/// Terminal per-file status as written to the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerStatus {
    DryRun,
    Adjusted,
    Error,
    Skipped,
}

impl LedgerStatus {
    pub const ALL: [LedgerStatus; 4] = [
        LedgerStatus::DryRun,
        LedgerStatus::Adjusted,
        LedgerStatus::Error,
        LedgerStatus::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::DryRun => "dry-run",
            LedgerStatus::Adjusted => "adjusted",
            LedgerStatus::Error => "error",
            LedgerStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ledger status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for LedgerStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LedgerStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

/// Suffix that marks a journal line as a terminal outcome for `path`.
pub fn entry_suffix(path: &Path, status: LedgerStatus) -> String {
    format!(
        "{FIELD_DELIMITER}{FILE_MARKER} {}{FIELD_DELIMITER}{STATUS_MARKER} {}",
        path.display(),
        status
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub path: PathBuf,
    pub status: LedgerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// No `FILE:`/`STATUS:` pair; ordinary journal chatter.
    Chatter,
    Entry(LedgerEntry),
    Malformed,
}

/// Classifies one journal line.
pub fn parse_line(line: &str) -> LineKind {
    let line = line.trim();
    // Our own warnings quote the bad line and must not be re-reported.
    if line.contains(MALFORMED_WARNING) {
        return LineKind::Chatter;
    }
    if !(line.contains(STATUS_MARKER) && line.contains(FILE_MARKER)) {
        return LineKind::Chatter;
    }

    // Paths may contain the delimiter: the status is the last field and the
    // path runs from the first file marker up to it.
    let status_field = format!("{FIELD_DELIMITER}{STATUS_MARKER}");
    let Some((head, status)) = line.rsplit_once(status_field.as_str()) else {
        return LineKind::Malformed;
    };
    let path = match head.strip_prefix(FILE_MARKER) {
        Some(path) => path,
        None => match head.split_once(format!("{FIELD_DELIMITER}{FILE_MARKER}").as_str()) {
            Some((_, path)) => path,
            None => return LineKind::Malformed,
        },
    };
    let path = path.trim();
    let Ok(status) = status.trim().parse() else {
        return LineKind::Malformed;
    };
    if path.is_empty() {
        return LineKind::Malformed;
    }

    LineKind::Entry(LedgerEntry {
        path: PathBuf::from(path),
        status,
    })
}

/// Last known status per file, rebuilt from the journal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: HashMap<PathBuf, LedgerStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct LedgerParse {
    pub ledger: Ledger,
    pub malformed: Vec<String>,
}

impl Ledger {
    /// Parses journal text. Later lines win for the same path.
    pub fn parse(contents: &str) -> LedgerParse {
        let mut parsed = LedgerParse::default();
        for line in contents.lines() {
            match parse_line(line) {
                LineKind::Chatter => {}
                LineKind::Entry(entry) => parsed.ledger.record(entry.path, entry.status),
                LineKind::Malformed => parsed.malformed.push(line.trim().to_string()),
            }
        }
        parsed
    }

    /// Reads the journal at `path`; a missing file is an empty ledger.
    /// Malformed lines are reported back through `journal`.
    pub fn load(path: &Path, journal: &Journal) -> std::io::Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err),
        };
        let parsed = Self::parse(&String::from_utf8_lossy(&bytes));
        for line in &parsed.malformed {
            journal.log(format!("{MALFORMED_WARNING} {line}"));
        }
        Ok(parsed.ledger)
    }

    pub fn record(&mut self, path: impl Into<PathBuf>, status: LedgerStatus) {
        self.entries.insert(path.into(), status);
    }

    pub fn status(&self, path: &Path) -> Option<LedgerStatus> {
        self.entries.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by path.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(path, status)| LedgerEntry {
                path: path.clone(),
                status: *status,
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}
