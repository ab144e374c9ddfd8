use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;
use which::which;

use crate::backup::logic::DumpProvider;
use crate::config::{ALL_DATABASES, DatabaseKind, SourceConfig};
use crate::errors::BackupError;
use crate::utils::process::run_streamed;

fn find_tool(tool: &'static str) -> Result<PathBuf, BackupError> {
    which(tool).map_err(|e| BackupError::SpawnFailed {
        tool: tool.to_string(),
        source: io::Error::new(io::ErrorKind::NotFound, e),
    })
}

/// Argument vector for a `mongodump` run.
///
/// A named database is passed with `-d` and dumped into `<tmp_dir>/<db>` by
/// the tool itself; the all-databases sentinel drops the `-d` flag and points
/// the output at an `all/` subfolder instead, mirroring how mongodump lays
/// out a full-server dump.
pub(crate) fn mongodump_args(source: &SourceConfig, db: &str, tmp_dir: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-h".into(),
        format!("{}:{}", source.host, source.port).into(),
    ];

    let out_dir = if db != ALL_DATABASES {
        args.push("-d".into());
        args.push(db.into());
        tmp_dir.to_path_buf()
    } else {
        tmp_dir.join(ALL_DATABASES)
    };
    args.push("-o".into());
    args.push(out_dir.into());

    if let (Some(username), Some(password)) = (&source.username, &source.password) {
        args.push("-u".into());
        args.push(username.into());
        args.push("-p".into());
        args.push(password.into());
    }

    args
}

/// Argument vector for a `mysqldump` run writing to `out_file`.
///
/// Built as an argument vector, never a shell line, so identifier values are
/// never interpreted by a shell. `--result-file` replaces the historical
/// stdout redirect for the same reason.
pub(crate) fn mysqldump_args(source: &SourceConfig, db: &str, out_file: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--host".into(),
        source.host.clone().into(),
        "--port".into(),
        source.port.to_string().into(),
    ];

    if db == ALL_DATABASES {
        args.push("--all-databases".into());
    } else {
        args.push(db.into());
    }

    if let (Some(username), Some(password)) = (&source.username, &source.password) {
        args.push("--user".into());
        args.push(username.into());
        args.push(format!("--password={}", password).into());
    }

    args.push("--result-file".into());
    args.push(out_file.into());

    args
}

/// Dump Provider driving `mongodump`.
pub struct MongoDumpProvider;

#[async_trait]
impl DumpProvider for MongoDumpProvider {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Mongodb
    }

    fn check_identifier(&self, _db: &str) -> Result<(), BackupError> {
        Ok(())
    }

    async fn dump(
        &self,
        source: &SourceConfig,
        db: &str,
        tmp_dir: &Path,
    ) -> Result<(), BackupError> {
        let tool = find_tool("mongodump")?;

        info!("Starting mongodump of {db}");
        let mut cmd = Command::new(tool);
        cmd.args(mongodump_args(source, db, tmp_dir));

        let code = run_streamed(cmd, "mongodump", true).await?;
        if code == 0 {
            info!("mongodump of {db} finished");
            Ok(())
        } else {
            Err(BackupError::DumpFailed { code })
        }
    }
}

/// Dump Provider driving `mysqldump`.
///
/// Unlike mongodump the tool does not create its output directory, so the
/// temp root is created here before the run. Identifiers containing `;` are
/// refused outright; the argument-vector invocation already removes the
/// shell from the picture, the check stays as an allow-list backstop.
pub struct MySqlDumpProvider;

#[async_trait]
impl DumpProvider for MySqlDumpProvider {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Mysql
    }

    fn check_identifier(&self, db: &str) -> Result<(), BackupError> {
        if db.contains(';') {
            return Err(BackupError::RejectedIdentifier(db.to_string()));
        }
        Ok(())
    }

    async fn dump(
        &self,
        source: &SourceConfig,
        db: &str,
        tmp_dir: &Path,
    ) -> Result<(), BackupError> {
        self.check_identifier(db)?;
        let tool = find_tool("mysqldump")?;

        tokio::fs::create_dir_all(tmp_dir)
            .await
            .map_err(|source| BackupError::SpawnFailed {
                tool: "mysqldump".to_string(),
                source,
            })?;

        info!("Starting mysqldump of {db}");
        let mut cmd = Command::new(tool);
        cmd.args(mysqldump_args(source, db, &tmp_dir.join(db)));

        let code = run_streamed(cmd, "mysqldump", true).await?;
        if code == 0 {
            info!("mysqldump of {db} finished");
            Ok(())
        } else {
            Err(BackupError::DumpFailed { code })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(username: Option<&str>, password: Option<&str>) -> SourceConfig {
        SourceConfig {
            host: "db.internal".into(),
            port: 27017,
            username: username.map(str::to_string),
            password: password.map(str::to_string),
            dbs: None,
        }
    }

    #[test]
    fn mongodump_named_db_uses_scope_flag_and_plain_outdir() {
        let args = mongodump_args(&source(None, None), "orders", Path::new("/tmp/mongodb_s3_backup"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["-h", "db.internal:27017", "-d", "orders", "-o", "/tmp/mongodb_s3_backup"]
        );
    }

    #[test]
    fn mongodump_sentinel_suffixes_the_outdir_instead_of_a_scope_flag() {
        let args = mongodump_args(&source(None, None), ALL_DATABASES, Path::new("/tmp/mongodb_s3_backup"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(!args.contains(&"-d".to_string()));
        assert_eq!(
            args,
            vec!["-h", "db.internal:27017", "-o", "/tmp/mongodb_s3_backup/all"]
        );
    }

    #[test]
    fn mongodump_credentials_require_both_halves() {
        let args = mongodump_args(&source(Some("backup"), Some("pw")), "orders", Path::new("/tmp/x"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(args.windows(2).any(|w| w == ["-u", "backup"]));
        assert!(args.windows(2).any(|w| w == ["-p", "pw"]));

        let args = mongodump_args(&source(Some("backup"), None), "orders", Path::new("/tmp/x"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(!args.contains(&"-u".to_string()));
    }

    #[test]
    fn mysqldump_sentinel_dumps_all_databases() {
        let args = mysqldump_args(
            &source(None, None),
            ALL_DATABASES,
            Path::new("/tmp/mysql_s3_backup/all"),
        );
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(args.contains(&"--all-databases".to_string()));
        assert!(
            args.windows(2)
                .any(|w| w == ["--result-file", "/tmp/mysql_s3_backup/all"])
        );
    }

    #[test]
    fn mysqldump_named_db_with_credentials() {
        let args = mysqldump_args(
            &source(Some("backup"), Some("pw")),
            "orders",
            Path::new("/tmp/mysql_s3_backup/orders"),
        );
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(args.contains(&"orders".to_string()));
        assert!(!args.contains(&"--all-databases".to_string()));
        assert!(args.contains(&"--password=pw".to_string()));
    }

    #[test]
    fn mysql_identifier_with_semicolon_is_rejected() {
        let err = MySqlDumpProvider
            .check_identifier("prod; DROP TABLE users")
            .unwrap_err();
        assert!(matches!(err, BackupError::RejectedIdentifier(_)));
    }
}
