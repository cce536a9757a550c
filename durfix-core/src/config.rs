use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

pub const DEFAULT_LOG_FILE: &str = "duration_fix.log";
pub const DEFAULT_THRESHOLD_SECONDS: u64 = 300;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DurfixConfig {
    pub paths: PathsSection,
    pub repair: RepairSection,
    pub tools: ToolsSection,
    pub scan: ScanSection,
    pub logging: LoggingSection,
}

impl DurfixConfig {
    pub fn log_path(&self) -> PathBuf {
        self.paths.log_dir.join(&self.paths.log_file)
    }

    /// Checks values that deserialize fine but cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.paths.log_file.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "paths.log_file",
                reason: "must not be empty".into(),
            });
        }
        if self.tools.probe_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "tools.probe_timeout_seconds",
                reason: "must be greater than zero".into(),
            });
        }
        if self.tools.transcode_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "tools.transcode_timeout_seconds",
                reason: "must be greater than zero".into(),
            });
        }
        if let Some(rendered) = &self.paths.rendered_dir {
            if rendered.starts_with(&self.paths.input_dir) {
                return Err(ConfigError::Invalid {
                    field: "paths.rendered_dir",
                    reason: format!(
                        "must not lie inside the input directory {}",
                        self.paths.input_dir.display()
                    ),
                });
            }
        }
        if self.scan.extensions.iter().all(|ext| normalize_extension(ext).is_empty()) {
            return Err(ConfigError::Invalid {
                field: "scan.extensions",
                reason: "at least one extension is required".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub input_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_file: String,
    /// When set, repaired copies land here instead of replacing the original.
    pub rendered_dir: Option<PathBuf>,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("/path/to/your/files"),
            log_dir: PathBuf::from("/path/to/your/logs"),
            log_file: DEFAULT_LOG_FILE.to_string(),
            rendered_dir: None,
        }
    }
}

/// Which prior ledger entries make a file skip on rerun.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipPolicy {
    /// Only files already recorded as `adjusted` are skipped.
    #[default]
    AdjustedOnly,
    /// Any recorded status skips the file, including `error`.
    AnyEntry,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepairSection {
    pub threshold_seconds: u64,
    pub dry_run: bool,
    pub skip_policy: SkipPolicy,
    pub map_all_streams: bool,
}

impl Default for RepairSection {
    fn default() -> Self {
        Self {
            threshold_seconds: DEFAULT_THRESHOLD_SECONDS,
            dry_run: true,
            skip_policy: SkipPolicy::default(),
            map_all_streams: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub mediainfo: PathBuf,
    pub ffmpeg: PathBuf,
    pub probe_timeout_seconds: u64,
    pub transcode_timeout_seconds: u64,
}

impl ToolsSection {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_seconds)
    }
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            mediainfo: PathBuf::from("mediainfo"),
            ffmpeg: PathBuf::from("ffmpeg"),
            probe_timeout_seconds: 60,
            transcode_timeout_seconds: 6 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    pub extensions: Vec<String>,
    pub list_files_in_summary: bool,
}

impl ScanSection {
    /// Case-insensitive suffix match on the file name, so `.mkv` alone counts.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(OsStr::to_str) else {
            return false;
        };
        let name = name.to_ascii_lowercase();
        self.extensions
            .iter()
            .map(|candidate| normalize_extension(candidate.as_str()))
            .filter(|candidate| !candidate.is_empty())
            .any(|candidate| name.ends_with(&format!(".{}", candidate.to_ascii_lowercase())))
    }
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            extensions: ["mkv", "mp4", "avi", "mov"]
                .into_iter()
                .map(String::from)
                .collect(),
            list_files_in_summary: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub echo_stdout: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { echo_stdout: true }
    }
}

fn normalize_extension(ext: &str) -> &str {
    ext.trim().trim_start_matches('.')
}

pub fn load_durfix_config<P: AsRef<Path>>(path: P) -> Result<DurfixConfig> {
    let config: DurfixConfig = load_toml(path)?;
    config.validate()?;
    Ok(config)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
