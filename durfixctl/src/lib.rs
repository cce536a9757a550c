use std::fmt;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;
use thiserror::Error;

use durfix_core::{
    load_durfix_config, DurationFixer, DurationProber, DurfixConfig, Ledger,
    LedgerEntry, LedgerStatus, ScanSummary, SkipPolicy,
};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] durfix_core::ConfigError),
    #[error("{0}")]
    Run(#[from] durfix_core::FixerError),
    #[error("probe failed: {0}")]
    Probe(#[from] durfix_core::ProbeError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Finds media whose container outlasts its video stream and trims it", long_about = None)]
pub struct Cli {
    /// Path to durfix.toml; built-in defaults are used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Directory scanned for media (overrides paths.input_dir)
    #[arg(long)]
    pub input_dir: Option<PathBuf>,
    /// Directory holding the journal (overrides paths.log_dir)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
    /// Write repaired copies here instead of replacing originals
    #[arg(long)]
    pub rendered_dir: Option<PathBuf>,
    /// Discrepancy in seconds above which a file is trimmed
    #[arg(long)]
    pub threshold: Option<u64>,
    /// Only report what would be trimmed
    #[arg(long, conflicts_with = "apply")]
    pub dry_run: bool,
    /// Trim files for real
    #[arg(long)]
    pub apply: bool,
    /// Which journal entries make a file skip on rerun
    #[arg(long, value_enum)]
    pub skip_policy: Option<SkipPolicyArg>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SkipPolicyArg {
    AdjustedOnly,
    AnyEntry,
}

impl From<SkipPolicyArg> for SkipPolicy {
    fn from(value: SkipPolicyArg) -> Self {
        match value {
            SkipPolicyArg::AdjustedOnly => SkipPolicy::AdjustedOnly,
            SkipPolicyArg::AnyEntry => SkipPolicy::AnyEntry,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs one duration-check pass over the input directory
    Scan,
    /// Shows the per-file status rebuilt from the journal
    Ledger(LedgerArgs),
    /// Prints container and video durations for a single file
    Probe(ProbeArgs),
    /// Generates shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct LedgerArgs {
    /// Only entries with this status
    #[arg(long, value_enum)]
    pub status: Option<LedgerStatusArg>,
    /// Maximum number of entries shown
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LedgerStatusArg {
    DryRun,
    Adjusted,
    Error,
    Skipped,
}

impl From<LedgerStatusArg> for LedgerStatus {
    fn from(value: LedgerStatusArg) -> Self {
        match value {
            LedgerStatusArg::DryRun => LedgerStatus::DryRun,
            LedgerStatusArg::Adjusted => LedgerStatus::Adjusted,
            LedgerStatusArg::Error => LedgerStatus::Error,
            LedgerStatusArg::Skipped => LedgerStatus::Skipped,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Media file to inspect
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

pub async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        let name = command.get_name().to_string();
        clap_complete::generate(args.shell, &mut command, name, &mut std::io::stdout());
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    match &cli.command {
        Commands::Scan => {
            let summary = DurationFixer::new(config).run().await?;
            if matches!(cli.format, OutputFormat::Json) {
                render(&summary, cli.format)?;
            }
        }
        Commands::Ledger(args) => {
            let report = ledger_report(&config, args)?;
            render(&report, cli.format)?;
        }
        Commands::Probe(args) => {
            let report = probe_file(&config, &args.file).await?;
            render(&report, cli.format)?;
        }
        Commands::Completions(_) => {}
    }
    Ok(())
}

/// Loads the config file (or defaults) and applies command-line overrides.
pub fn resolve_config(cli: &Cli) -> Result<DurfixConfig> {
    let mut config = match &cli.config {
        Some(path) => load_durfix_config(path)?,
        None => DurfixConfig::default(),
    };
    if let Some(dir) = &cli.input_dir {
        config.paths.input_dir = dir.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.paths.log_dir = dir.clone();
    }
    if let Some(dir) = &cli.rendered_dir {
        config.paths.rendered_dir = Some(dir.clone());
    }
    if let Some(threshold) = cli.threshold {
        config.repair.threshold_seconds = threshold;
    }
    if cli.dry_run {
        config.repair.dry_run = true;
    }
    if cli.apply {
        config.repair.dry_run = false;
    }
    if let Some(policy) = cli.skip_policy {
        config.repair.skip_policy = policy.into();
    }
    if matches!(cli.format, OutputFormat::Json) {
        // stdout carries the JSON document
        config.logging.echo_stdout = false;
    }
    config.validate()?;
    Ok(config)
}

fn ledger_report(config: &DurfixConfig, args: &LedgerArgs) -> Result<LedgerReport> {
    let log_path = config.log_path();
    let contents = match std::fs::read(&log_path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err.into()),
    };
    // read-only view: malformed lines are counted, not journaled
    let parsed = Ledger::parse(&contents);
    let ledger = parsed.ledger;
    let status = args.status.map(LedgerStatus::from);
    let mut rows: Vec<LedgerRow> = ledger
        .entries()
        .into_iter()
        .filter(|entry| status.map_or(true, |wanted| entry.status == wanted))
        .map(LedgerRow::from)
        .collect();
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }
    Ok(LedgerReport {
        journal: log_path,
        malformed: parsed.malformed.len(),
        rows,
    })
}

async fn probe_file(config: &DurfixConfig, file: &Path) -> Result<ProbeReport> {
    let prober = DurationProber::new(&config.tools, None);
    let durations = prober.durations(file).await?;
    Ok(ProbeReport {
        file: file.to_path_buf(),
        container_seconds: durations.container,
        stream_seconds: durations.stream,
        discrepancy_seconds: durations.discrepancy(),
        threshold_seconds: config.repair.threshold_seconds,
        exceeds_threshold: durations.exceeds(config.repair.threshold_seconds),
    })
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

#[derive(Debug, Serialize)]
struct LedgerReport {
    journal: PathBuf,
    malformed: usize,
    rows: Vec<LedgerRow>,
}

#[derive(Debug, Serialize)]
struct LedgerRow {
    path: PathBuf,
    status: LedgerStatus,
}

impl From<LedgerEntry> for LedgerRow {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            path: entry.path,
            status: entry.status,
        }
    }
}

impl DisplayFallback for LedgerReport {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return format!("No entries in {}", self.journal.display());
        }
        let mut lines: Vec<String> = self
            .rows
            .iter()
            .map(|row| format!("{:<9} {}", row.status, row.path.display()))
            .collect();
        if self.malformed > 0 {
            lines.push(format!("({} malformed lines ignored)", self.malformed));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    file: PathBuf,
    container_seconds: u64,
    stream_seconds: u64,
    discrepancy_seconds: u64,
    threshold_seconds: u64,
    exceeds_threshold: bool,
}

impl DisplayFallback for ProbeReport {
    fn display(&self) -> String {
        format!(
            "File: {}\n  General Duration: {}s\n  Video Duration: {}s\n  Discrepancy: {}s ({})",
            self.file.display(),
            self.container_seconds,
            self.stream_seconds,
            self.discrepancy_seconds,
            Verdict(self.exceeds_threshold, self.threshold_seconds),
        )
    }
}

impl DisplayFallback for ScanSummary {
    fn display(&self) -> String {
        format!(
            "{} processed, {} skipped",
            self.processed_count(),
            self.skipped_count()
        )
    }
}

struct Verdict(bool, u64);

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 {
            write!(f, "exceeds {}s threshold", self.1)
        } else {
            write!(f, "within {}s threshold", self.1)
        }
    }
}
