use std::process::Output;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

/// Runs external tools. Swapped out in tests so no real `mediainfo`/`ffmpeg`
/// is needed.
#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, command: &mut Command) -> std::io::Result<Output>;
}

#[derive(Debug, Default)]
pub struct SystemCommandExecutor;

#[async_trait::async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn run(&self, command: &mut Command) -> std::io::Result<Output> {
        command.output().await
    }
}

#[derive(Debug)]
pub enum CommandFailure {
    Io(std::io::Error),
    TimedOut(Duration),
}

/// Runs `command` through `executor`, killing the child if `limit` elapses.
pub async fn run_with_timeout(
    executor: &dyn CommandExecutor,
    command: &mut Command,
    limit: Duration,
) -> Result<Output, CommandFailure> {
    command.kill_on_drop(true);
    match timeout(limit, executor.run(command)).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(CommandFailure::Io(err)),
        Err(_) => Err(CommandFailure::TimedOut(limit)),
    }
}

/// Renders a command line for diagnostics.
pub fn describe(command: &Command) -> String {
    let std = command.as_std();
    let mut parts = vec![std.get_program().to_string_lossy().into_owned()];
    parts.extend(std.get_args().map(|arg| arg.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Last non-empty stderr line, which is where ffmpeg and mediainfo put the reason.
pub fn stderr_summary(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    use std::os::unix::process::ExitStatusExt;
    #[cfg(windows)]
    use std::os::windows::process::ExitStatusExt;

    struct StallingExecutor;

    #[async_trait::async_trait]
    impl CommandExecutor for StallingExecutor {
        async fn run(&self, _command: &mut Command) -> std::io::Result<Output> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(std::io::Error::other("unreachable"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_reported() {
        let mut command = Command::new("mediainfo");
        let result =
            run_with_timeout(&StallingExecutor, &mut command, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(CommandFailure::TimedOut(limit)) if limit == Duration::from_secs(5)));
    }

    #[test]
    fn describe_joins_program_and_args() {
        let mut command = Command::new("ffmpeg");
        command.arg("-i").arg("/media/a b.mkv");
        assert_eq!(describe(&command), "ffmpeg -i /media/a b.mkv");
    }

    #[test]
    fn stderr_summary_takes_last_line() {
        let output = Output {
            status: std::process::ExitStatus::from_raw(256),
            stdout: Vec::new(),
            stderr: b"header\nInvalid data found\n\n".to_vec(),
        };
        assert_eq!(stderr_summary(&output), "Invalid data found");
    }
}
