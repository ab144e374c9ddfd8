use std::io;
use std::path::Path;

use tracing::info;

/// Removes a file or directory, recursively and forcibly.
///
/// A path that does not exist is success, not an error, so the same call
/// serves both the stale-artifact pre-pass and the unconditional post-pass
/// of the backup pipeline.
pub async fn remove_rf(target: &Path) -> io::Result<()> {
    let metadata = match tokio::fs::metadata(target).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    info!("Removing {}", target.display());
    if metadata.is_dir() {
        tokio::fs::remove_dir_all(target).await
    } else {
        tokio::fs::remove_file(target).await
    }
}
