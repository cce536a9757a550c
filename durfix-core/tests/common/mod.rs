#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;

use durfix_core::{CommandExecutor, DurfixConfig};

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;
#[cfg(windows)]
use std::os::windows::process::ExitStatusExt;

#[derive(Debug, Clone)]
pub enum ProbeScript {
    Millis { general: String, video: String },
    Fail,
    /// Never answers; only a timeout ends the call.
    Hang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeScript {
    /// Writes `trimmed:<seconds>` to the output path and exits 0.
    Succeed,
    /// Leaves a partial output file behind and exits 1.
    FailWithPartialOutput,
    /// Exits 1 without touching the output path.
    Fail,
    /// Leaves a partial output file behind and never exits.
    Hang,
}

/// Longer than any timeout a test configures.
const STALL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn is_ffmpeg(&self) -> bool {
        self.program.ends_with("ffmpeg")
    }

    pub fn value_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|idx| self.args.get(idx + 1))
            .map(String::as_str)
    }
}

/// Stands in for mediainfo and ffmpeg.
pub struct ScriptedExecutor {
    probes: Mutex<HashMap<PathBuf, ProbeScript>>,
    transcode: Mutex<TranscodeScript>,
    pub calls: Mutex<Vec<Invocation>>,
}

impl ScriptedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            probes: Mutex::new(HashMap::new()),
            transcode: Mutex::new(TranscodeScript::Succeed),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn durations(&self, path: &Path, general_ms: &str, video_ms: &str) {
        self.probes.lock().unwrap().insert(
            path.to_path_buf(),
            ProbeScript::Millis {
                general: general_ms.to_string(),
                video: video_ms.to_string(),
            },
        );
    }

    pub fn probe_fails(&self, path: &Path) {
        self.probes
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), ProbeScript::Fail);
    }

    pub fn probe_hangs(&self, path: &Path) {
        self.probes
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), ProbeScript::Hang);
    }

    pub fn transcode(&self, script: TranscodeScript) {
        *self.transcode.lock().unwrap() = script;
    }

    pub fn ffmpeg_calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.is_ffmpeg())
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn probe(&self, args: &[String]) -> Output {
        let (Some(inform), Some(path)) = (args.first(), args.get(1)) else {
            return output(1, "", "missing arguments");
        };
        let script = self.probes.lock().unwrap().get(Path::new(path)).cloned();
        match script {
            Some(ProbeScript::Millis { general, video }) => {
                if inform.contains("General") {
                    output(0, &format!("{general}\n"), "")
                } else {
                    output(0, &format!("{video}\n"), "")
                }
            }
            Some(ProbeScript::Hang) => {
                tokio::time::sleep(STALL).await;
                output(1, "", "stalled")
            }
            Some(ProbeScript::Fail) | None => output(1, "", "Unable to open file"),
        }
    }

    async fn ffmpeg(&self, invocation: &Invocation) -> Output {
        let target = invocation.args.last().cloned().unwrap_or_default();
        let seconds = invocation.value_after("-t").unwrap_or("?").to_string();
        let script = *self.transcode.lock().unwrap();
        match script {
            TranscodeScript::Succeed => {
                std::fs::write(&target, format!("trimmed:{seconds}")).unwrap();
                output(0, "", "")
            }
            TranscodeScript::FailWithPartialOutput => {
                std::fs::write(&target, b"partial").unwrap();
                output(1, "", "Conversion failed!")
            }
            TranscodeScript::Fail => output(1, "", "Invalid data found when processing input"),
            TranscodeScript::Hang => {
                std::fs::write(&target, b"partial").unwrap();
                tokio::time::sleep(STALL).await;
                output(1, "", "stalled")
            }
        }
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn run(&self, command: &mut Command) -> std::io::Result<Output> {
        let std = command.as_std();
        let invocation = Invocation {
            program: std.get_program().to_string_lossy().into_owned(),
            args: std
                .get_args()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
        };
        self.calls.lock().unwrap().push(invocation.clone());
        if invocation.is_ffmpeg() {
            Ok(self.ffmpeg(&invocation).await)
        } else {
            Ok(self.probe(&invocation.args).await)
        }
    }
}

pub fn output(code: i32, stdout: &str, stderr: &str) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

fn exit_status(code: i32) -> ExitStatus {
    #[cfg(unix)]
    {
        ExitStatus::from_raw(code << 8)
    }
    #[cfg(windows)]
    {
        ExitStatus::from_raw(code as u32)
    }
}

/// Library + log directories inside `base`, journal echo off.
pub fn test_config(base: &TempDir, dry_run: bool) -> DurfixConfig {
    let mut config = DurfixConfig::default();
    config.paths.input_dir = base.path().join("library");
    config.paths.log_dir = base.path().join("logs");
    config.repair.dry_run = dry_run;
    config.logging.echo_stdout = false;
    std::fs::create_dir_all(&config.paths.input_dir).unwrap();
    config
}

pub fn media_file(config: &DurfixConfig, relative: &str, contents: &[u8]) -> PathBuf {
    let path = config.paths.input_dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn journal_lines(config: &DurfixConfig) -> Vec<String> {
    std::fs::read_to_string(config.log_path())
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn entry_line(path: &Path, status: &str) -> String {
    format!("| FILE: {} | STATUS: {status}", path.display())
}
