use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;
use which::which;

use crate::backup::logic::Archiver;
use crate::errors::BackupError;
use crate::utils::process::run_streamed;

/// Archiver spawning the system `tar` to gzip-compress one dump.
///
/// The input name is resolved relative to `work_dir` so archive members carry
/// relative paths. On success tar prints nothing, so only stderr is streamed.
pub struct TarArchiver;

#[async_trait]
impl Archiver for TarArchiver {
    async fn compress(
        &self,
        work_dir: &Path,
        input: &str,
        archive_name: &str,
    ) -> Result<(), BackupError> {
        let tool = which("tar").map_err(|e| BackupError::SpawnFailed {
            tool: "tar".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, e),
        })?;

        info!("Compressing {input} into {archive_name}");
        let mut cmd = Command::new(tool);
        cmd.current_dir(work_dir);
        cmd.args(["-zcf", archive_name, input]);

        let code = run_streamed(cmd, "tar", false).await?;
        if code == 0 {
            info!("Compressed {input} into {archive_name}");
            Ok(())
        } else {
            Err(BackupError::ArchiveFailed { code })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs::File;

    #[tokio::test]
    async fn compresses_a_dump_directory() {
        let work = tempfile::tempdir().unwrap();
        let dump = work.path().join("orders");
        std::fs::create_dir_all(&dump).unwrap();
        std::fs::write(dump.join("orders.bson"), b"fake dump payload").unwrap();

        TarArchiver
            .compress(work.path(), "orders", "orders_2024_3_7_1.tar.gz")
            .await
            .unwrap();

        let archive_path = work.path().join("orders_2024_3_7_1.tar.gz");
        assert!(archive_path.is_file());

        // Members must be relative to the working directory.
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(&archive_path).unwrap()));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n == "orders/orders.bson"));
    }

    #[tokio::test]
    async fn missing_input_fails_with_the_tar_exit_code() {
        let work = tempfile::tempdir().unwrap();
        let err = TarArchiver
            .compress(work.path(), "no_such_dump", "x.tar.gz")
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::ArchiveFailed { code } if code != 0));
    }
}
