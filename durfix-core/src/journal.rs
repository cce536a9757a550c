use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Append-only run journal. Every call opens, appends one line and closes the
/// file, so nothing is held between calls.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
    echo: bool,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            echo: true,
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&self, message: impl AsRef<str>) {
        let message = single_line(message.as_ref());
        if let Err(err) = self.append(&message) {
            warn!(path = %self.path.display(), error = %err, "failed to append journal entry");
        }
        if self.echo {
            println!("{message}");
        }
    }

    fn append(&self, message: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "{}: {}",
            Local::now().format(TIMESTAMP_FORMAT),
            message
        )
    }
}

// Entries are line-oriented; a stray newline would split one entry in two.
fn single_line(message: &str) -> String {
    if message.contains(['\n', '\r']) {
        message
            .split(['\n', '\r'])
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        message.to_string()
    }
}
