use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dump,
    Archive,
    Upload,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Dump => write!(f, "dump"),
            Stage::Archive => write!(f, "archive"),
            Stage::Upload => write!(f, "upload"),
        }
    }
}

/// Everything that can go wrong inside one database's backup pipeline.
///
/// A job's reported outcome is always the first stage failure encountered.
/// `CleanupFailed` never becomes a job outcome; it only ever gets logged.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("dump tool exited with code {code}")]
    DumpFailed { code: i32 },

    #[error("tar exited with code {code}")]
    ArchiveFailed { code: i32 },

    #[error("upload to object storage failed: {message}")]
    UploadFailed { status: Option<u16>, message: String },

    #[error("database identifier {0:?} contains unsafe characters, refusing to back it up")]
    RejectedIdentifier(String),

    #[error("{stage} stage timed out after {timeout:?}")]
    StageTimedOut { stage: Stage, timeout: Duration },

    #[error("failed to run {tool}: {source}")]
    SpawnFailed {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A job fault outside the normal stage error flow (e.g. a panic in a
    /// stage task). Scoped to the affected job; other jobs keep running.
    #[error("backup job aborted: {0}")]
    Aborted(String),
}
