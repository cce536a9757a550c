use std::fmt;
use std::sync::Arc;

use crate::command::CommandExecutor;
use crate::config::DurfixConfig;
use crate::error::{FixerError, FixerResult};
use crate::journal::Journal;
use crate::ledger::Ledger;
use crate::repair::RepairEngine;
use crate::scan::{DirectoryScanner, ScanSummary};

/// One full duration-check pass over the configured input directory.
pub struct DurationFixer {
    config: Arc<DurfixConfig>,
    journal: Journal,
    executor: Option<Arc<dyn CommandExecutor>>,
}

impl fmt::Debug for DurationFixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurationFixer")
            .field("config", &self.config)
            .field("journal", &self.journal)
            .finish()
    }
}

impl DurationFixer {
    pub fn new(config: DurfixConfig) -> Self {
        let journal = Journal::new(config.log_path()).with_echo(config.logging.echo_stdout);
        Self {
            config: Arc::new(config),
            journal,
            executor: None,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn config(&self) -> &DurfixConfig {
        &self.config
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub async fn run(&self) -> FixerResult<ScanSummary> {
        self.config.validate()?;
        self.prepare_directories()?;

        let input = &self.config.paths.input_dir;
        if !input.is_dir() {
            self.journal.log(format!(
                "Input directory {} not found. Exiting.",
                input.display()
            ));
            return Err(FixerError::InputMissing(input.clone()));
        }

        self.journal.log("Starting duration-check process.");
        let ledger = Ledger::load(self.journal.path(), &self.journal)
            .map_err(|source| FixerError::io(source, self.journal.path()))?;

        let engine = RepairEngine::new(
            self.config.clone(),
            self.journal.clone(),
            self.executor.clone(),
        );
        let scanner = DirectoryScanner::new(self.config.clone(), engine, self.journal.clone());
        let summary = scanner.scan(input, &ledger).await;
        self.journal.log("Process completed.");
        Ok(summary)
    }

    fn prepare_directories(&self) -> FixerResult<()> {
        let log_dir = &self.config.paths.log_dir;
        std::fs::create_dir_all(log_dir).map_err(|source| FixerError::io(source, log_dir))?;
        if let Some(rendered) = &self.config.paths.rendered_dir {
            std::fs::create_dir_all(rendered).map_err(|source| FixerError::io(source, rendered))?;
        }
        Ok(())
    }
}
