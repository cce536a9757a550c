use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::command::{describe, run_with_timeout, stderr_summary, CommandExecutor, CommandFailure};
use crate::config::{RepairSection, ToolsSection};

use super::error::{RepairError, RepairResult};

/// Stream-copy trimmer backed by ffmpeg.
#[derive(Clone)]
pub struct Transcoder {
    ffmpeg: PathBuf,
    timeout: Duration,
    map_all_streams: bool,
    executor: Arc<dyn CommandExecutor>,
}

impl fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcoder")
            .field("ffmpeg", &self.ffmpeg)
            .field("timeout", &self.timeout)
            .field("map_all_streams", &self.map_all_streams)
            .finish()
    }
}

impl Transcoder {
    pub fn new(
        tools: &ToolsSection,
        repair: &RepairSection,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            timeout: tools.transcode_timeout(),
            map_all_streams: repair.map_all_streams,
            executor,
        }
    }

    pub fn trim_command(&self, input: &Path, output: &Path, seconds: u64) -> Command {
        let mut command = Command::new(&self.ffmpeg);
        command
            .stdin(Stdio::null())
            .arg("-hide_banner")
            .arg("-nostdin")
            .arg("-y")
            .arg("-i")
            .arg(input);
        if self.map_all_streams {
            command.arg("-map").arg("0");
        }
        command
            .arg("-t")
            .arg(seconds.to_string())
            .arg("-c")
            .arg("copy")
            .arg(output);
        command
    }

    /// Copies every stream of `input` into `output`, cut at `seconds`.
    pub async fn trim(&self, input: &Path, output: &Path, seconds: u64) -> RepairResult<()> {
        let tool = self.ffmpeg.display().to_string();
        let mut command = self.trim_command(input, output, seconds);
        debug!(command = %describe(&command), "trimming streams");

        let result = run_with_timeout(self.executor.as_ref(), &mut command, self.timeout).await;
        let output = match result {
            Ok(output) => output,
            Err(CommandFailure::Io(source)) => return Err(RepairError::Spawn { tool, source }),
            Err(CommandFailure::TimedOut(limit)) => {
                return Err(RepairError::Timeout { tool, limit })
            }
        };
        if output.status.success() {
            return Ok(());
        }
        let stderr = stderr_summary(&output);
        warn!(
            status = output.status.code(),
            %stderr,
            input = %input.display(),
            "ffmpeg returned error"
        );
        Err(RepairError::Command {
            tool,
            status: output.status.code(),
            stderr,
        })
    }
}
