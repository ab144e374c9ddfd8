use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::Level;

use crate::errors::BackupError;
use crate::logging;

/// Spawns `command`, streams its output into the logger line-by-line and
/// waits for it to exit.
///
/// stderr always goes to the logger at error severity. stdout is only piped
/// and streamed when `stream_stdout` is set; tools like `tar` produce nothing
/// of interest there and get a null stdout instead.
///
/// Returns the exit code, `-1` when the process was killed by a signal.
pub(crate) async fn run_streamed(
    mut command: Command,
    tool: &str,
    stream_stdout: bool,
) -> Result<i32, BackupError> {
    command.stderr(Stdio::piped());
    command.stdout(if stream_stdout {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    // Stage deadlines cancel this future by dropping it; the child has to
    // die with it, or an expired tool keeps writing into a temp directory
    // that post-cleanup already removed.
    command.kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| BackupError::SpawnFailed {
        tool: tool.to_string(),
        source,
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stdout_task = async {
        if let Some(out) = stdout {
            stream_lines(out, Level::INFO).await;
        }
    };
    let stderr_task = async {
        if let Some(err) = stderr {
            stream_lines(err, Level::ERROR).await;
        }
    };

    let (status, _, _) = tokio::join!(child.wait(), stdout_task, stderr_task);
    let status = status.map_err(|source| BackupError::SpawnFailed {
        tool: tool.to_string(),
        source,
    })?;

    Ok(status.code().unwrap_or(-1))
}

async fn stream_lines<R: AsyncRead + Unpin>(reader: R, level: Level) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        logging::log(&line, Some(level));
    }
}
