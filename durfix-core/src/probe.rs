use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::command::{
    describe, run_with_timeout, stderr_summary, CommandExecutor, CommandFailure,
    SystemCommandExecutor,
};
use crate::config::ToolsSection;

pub type ProbeResult<T> = Result<T, ProbeError>;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("failed to run {tool}: {source}")]
    Io {
        tool: String,
        source: std::io::Error,
    },
    #[error("{tool} exited with status {status:?}: {stderr}")]
    Command {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("{tool} timed out after {limit:?}")]
    Timeout { tool: String, limit: Duration },
    #[error("invalid {track} duration {value:?}: {reason}")]
    Parse {
        track: Track,
        value: String,
        reason: String,
    },
}

/// Which duration reading is requested from mediainfo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    General,
    Video,
}

impl Track {
    fn inform(&self) -> &'static str {
        match self {
            Track::General => "--Inform=General;%Duration%",
            Track::Video => "--Inform=Video;%Duration%",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::General => f.write_str("container"),
            Track::Video => f.write_str("video stream"),
        }
    }
}

/// Container and video-stream durations in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationPair {
    pub container: u64,
    pub stream: u64,
}

impl DurationPair {
    pub fn new(container: u64, stream: u64) -> Self {
        Self { container, stream }
    }

    pub fn discrepancy(&self) -> u64 {
        self.container.abs_diff(self.stream)
    }

    pub fn exceeds(&self, threshold_seconds: u64) -> bool {
        self.discrepancy() > threshold_seconds
    }
}

/// Converts a mediainfo millisecond reading to whole seconds, truncating.
pub fn parse_millis(track: Track, raw: &str) -> ProbeResult<u64> {
    let value = raw.trim();
    let parse_error = |reason: &str| ProbeError::Parse {
        track,
        value: value.to_string(),
        reason: reason.to_string(),
    };
    if value.is_empty() {
        return Err(parse_error("no duration reported"));
    }
    let millis: f64 = value.parse().map_err(|_| parse_error("not a number"))?;
    if !millis.is_finite() {
        return Err(parse_error("not finite"));
    }
    if millis < 0.0 {
        return Err(parse_error("negative"));
    }
    Ok((millis / 1000.0).trunc() as u64)
}

#[derive(Clone)]
pub struct DurationProber {
    mediainfo: PathBuf,
    timeout: Duration,
    executor: Arc<dyn CommandExecutor>,
}

impl fmt::Debug for DurationProber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurationProber")
            .field("mediainfo", &self.mediainfo)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DurationProber {
    pub fn new(tools: &ToolsSection, executor: Option<Arc<dyn CommandExecutor>>) -> Self {
        Self {
            mediainfo: tools.mediainfo.clone(),
            timeout: tools.probe_timeout(),
            executor: executor.unwrap_or_else(|| Arc::new(SystemCommandExecutor)),
        }
    }

    pub async fn durations(&self, path: &Path) -> ProbeResult<DurationPair> {
        if !path.exists() {
            return Err(ProbeError::MissingFile(path.to_path_buf()));
        }
        let container = self.read(path, Track::General).await?;
        let stream = self.read(path, Track::Video).await?;
        Ok(DurationPair { container, stream })
    }

    async fn read(&self, path: &Path, track: Track) -> ProbeResult<u64> {
        let tool = self.mediainfo.display().to_string();
        let mut command = Command::new(&self.mediainfo);
        command.stdin(Stdio::null()).arg(track.inform()).arg(path);
        debug!(command = %describe(&command), "probing duration");

        let output = match run_with_timeout(self.executor.as_ref(), &mut command, self.timeout).await
        {
            Ok(output) => output,
            Err(CommandFailure::Io(source)) => return Err(ProbeError::Io { tool, source }),
            Err(CommandFailure::TimedOut(limit)) => {
                return Err(ProbeError::Timeout { tool, limit })
            }
        };
        if !output.status.success() {
            let stderr = stderr_summary(&output);
            warn!(status = output.status.code(), %stderr, path = %path.display(), "mediainfo returned error");
            return Err(ProbeError::Command {
                tool,
                status: output.status.code(),
                stderr,
            });
        }
        parse_millis(track, &String::from_utf8_lossy(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Output;
    use std::sync::Mutex;

    #[cfg(unix)]
    use std::os::unix::process::ExitStatusExt;
    #[cfg(windows)]
    use std::os::windows::process::ExitStatusExt;

    struct MockExecutor {
        outputs: Mutex<Vec<Output>>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl CommandExecutor for MockExecutor {
        async fn run(&self, command: &mut Command) -> std::io::Result<Output> {
            self.seen.lock().unwrap().push(describe(command));
            self.outputs
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| std::io::Error::other("no output"))
        }
    }

    fn output(code: i32, stdout: &str) -> Output {
        #[cfg(unix)]
        let status = std::process::ExitStatus::from_raw(code << 8);
        #[cfg(windows)]
        let status = std::process::ExitStatus::from_raw(code as u32);
        Output {
            status,
            stdout: stdout.as_bytes().to_vec(),
            stderr: if code == 0 {
                Vec::new()
            } else {
                b"Unable to open file\n".to_vec()
            },
        }
    }

    fn prober(outputs: Vec<Output>) -> (DurationProber, Arc<MockExecutor>) {
        let mock = Arc::new(MockExecutor {
            outputs: Mutex::new(outputs.into_iter().rev().collect()),
            seen: Mutex::new(Vec::new()),
        });
        let prober = DurationProber::new(&ToolsSection::default(), Some(mock.clone()));
        (prober, mock)
    }

    #[test]
    fn millis_are_truncated_not_rounded() {
        assert_eq!(parse_millis(Track::General, "3600000\n").unwrap(), 3600);
        assert_eq!(parse_millis(Track::Video, "3290999.999").unwrap(), 3290);
        assert_eq!(parse_millis(Track::Video, "999").unwrap(), 0);
    }

    #[test]
    fn rejects_unusable_readings() {
        for raw in ["", "  \n", "abc", "-5", "NaN", "inf"] {
            assert!(
                matches!(parse_millis(Track::Video, raw), Err(ProbeError::Parse { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn discrepancy_is_absolute() {
        let pair = DurationPair::new(3290, 3600);
        assert_eq!(pair.discrepancy(), 310);
        assert!(pair.exceeds(300));
        assert!(!DurationPair::new(3600, 3300).exceeds(300));
    }

    #[tokio::test]
    async fn reads_container_then_stream() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie.mkv");
        std::fs::write(&file, b"media").unwrap();
        let (prober, mock) = prober(vec![output(0, "3600000.0\n"), output(0, "3290500\n")]);

        let pair = prober.durations(&file).await.unwrap();
        assert_eq!(pair, DurationPair::new(3600, 3290));

        let seen = mock.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].starts_with("mediainfo --Inform=General;%Duration% "));
        assert!(seen[1].starts_with("mediainfo --Inform=Video;%Duration% "));
        assert!(seen[1].ends_with("movie.mkv"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_command_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.mp4");
        std::fs::write(&file, b"junk").unwrap();
        let (prober, mock) = prober(vec![output(1, "")]);

        let err = prober.durations(&file).await.unwrap_err();
        match err {
            ProbeError::Command { status, stderr, .. } => {
                assert_eq!(status, Some(1));
                assert_eq!(stderr, "Unable to open file");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(mock.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_video_track_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("audio_only.mkv");
        std::fs::write(&file, b"media").unwrap();
        let (prober, _) = prober(vec![output(0, "120000\n"), output(0, "\n")]);

        let err = prober.durations(&file).await.unwrap_err();
        assert!(matches!(
            err,
            ProbeError::Parse {
                track: Track::Video,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_file_skips_mediainfo() {
        let dir = tempfile::tempdir().unwrap();
        let (prober, mock) = prober(Vec::new());

        let err = prober
            .durations(&dir.path().join("gone.mkv"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::MissingFile(_)));
        assert!(mock.seen.lock().unwrap().is_empty());
    }
}
