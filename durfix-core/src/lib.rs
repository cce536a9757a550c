pub mod command;
pub mod config;
pub mod error;
pub mod fixer;
pub mod journal;
pub mod ledger;
pub mod probe;
pub mod repair;
pub mod scan;

pub use command::{CommandExecutor, SystemCommandExecutor};
pub use config::{load_durfix_config, DurfixConfig, SkipPolicy};
pub use error::{ConfigError, FixerError, FixerResult, Result};
pub use fixer::DurationFixer;
pub use journal::Journal;
pub use ledger::{Ledger, LedgerEntry, LedgerStatus};
pub use probe::{DurationPair, DurationProber, ProbeError, ProbeResult};
pub use repair::{FileOutcome, RepairEngine, RepairError, RepairResult, Transcoder};
pub use scan::{DirectoryScanner, ScanSummary};
