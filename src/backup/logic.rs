use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::backup::archive::TarArchiver;
use crate::backup::db_dump::{MongoDumpProvider, MySqlDumpProvider};
use crate::backup::s3_upload::{S3Uploader, object_key};
use crate::config::{DatabaseKind, RemoteConfig, SourceConfig};
use crate::errors::{BackupError, Stage};
use crate::utils::naming::archive_name;

/// Produces a database dump on local disk under the job's temp root.
#[async_trait]
pub trait DumpProvider: Send + Sync {
    fn kind(&self) -> DatabaseKind;

    /// Admission check run before any pipeline work for the identifier.
    fn check_identifier(&self, db: &str) -> Result<(), BackupError>;

    async fn dump(&self, source: &SourceConfig, db: &str, tmp_dir: &Path)
    -> Result<(), BackupError>;
}

/// Compresses a named input under `work_dir` into `archive_name`.
#[async_trait]
pub trait Archiver: Send + Sync {
    async fn compress(
        &self,
        work_dir: &Path,
        input: &str,
        archive_name: &str,
    ) -> Result<(), BackupError>;
}

/// Pushes a local file to object storage under `key`.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        remote: &RemoteConfig,
        file_path: &Path,
        key: &str,
    ) -> Result<(), BackupError>;
}

/// Recursive, forced, absence-tolerant removal of a local path.
#[async_trait]
pub trait Cleaner: Send + Sync {
    async fn remove_rf(&self, target: &Path) -> io::Result<()>;
}

/// The real [`Cleaner`].
pub struct TokioCleaner;

#[async_trait]
impl Cleaner for TokioCleaner {
    async fn remove_rf(&self, target: &Path) -> io::Result<()> {
        crate::utils::fs::remove_rf(target).await
    }
}

/// Outcome of one database's pipeline. There is no partial success; the
/// first stage failure is the whole job's failure.
#[derive(Debug)]
pub struct JobOutcome {
    pub database: String,
    pub result: Result<(), BackupError>,
}

/// Temp-filesystem coordinates of one job.
#[derive(Debug, Clone)]
struct JobPaths {
    /// `<OS temp root>/<kind>_s3_backup`, shared working folder.
    tmp_dir: PathBuf,
    /// Dump output for this database, `<tmp_dir>/<db>`.
    backup_dir: PathBuf,
    archive_name: String,
    /// The archive is a sibling of `backup_dir` inside `tmp_dir`.
    archive_path: PathBuf,
}

impl JobPaths {
    fn new(kind: DatabaseKind, db: &str) -> Self {
        let tmp_dir = kind.temp_root();
        let backup_dir = tmp_dir.join(db);
        let archive_name = archive_name(db, Local::now());
        let archive_path = tmp_dir.join(&archive_name);
        JobPaths {
            tmp_dir,
            backup_dir,
            archive_name,
            archive_path,
        }
    }
}

/// Sequences dump, compression and upload for every configured database and
/// guarantees temp artifacts are cleaned up whichever way a job ends.
#[derive(Clone)]
pub struct BackupPipeline {
    dump: Arc<dyn DumpProvider>,
    archiver: Arc<dyn Archiver>,
    uploader: Arc<dyn Uploader>,
    cleaner: Arc<dyn Cleaner>,
    stage_timeout: Option<Duration>,
}

impl BackupPipeline {
    /// Wires the real collaborators for the given database kind.
    pub fn for_kind(kind: DatabaseKind) -> Self {
        let dump: Arc<dyn DumpProvider> = match kind {
            DatabaseKind::Mongodb => Arc::new(MongoDumpProvider),
            DatabaseKind::Mysql => Arc::new(MySqlDumpProvider),
        };
        Self::with_collaborators(dump, Arc::new(TarArchiver), Arc::new(S3Uploader), Arc::new(TokioCleaner))
    }

    /// Assembles a pipeline from explicit collaborators. This is the seam
    /// tests and embedders use to substitute their own implementations.
    pub fn with_collaborators(
        dump: Arc<dyn DumpProvider>,
        archiver: Arc<dyn Archiver>,
        uploader: Arc<dyn Uploader>,
        cleaner: Arc<dyn Cleaner>,
    ) -> Self {
        BackupPipeline {
            dump,
            archiver,
            uploader,
            cleaner,
            stage_timeout: None,
        }
    }

    /// Applies a deadline to every stage of every job. A stage that blows
    /// the deadline fails the job the same way a tool failure would.
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    /// Runs one pipeline per configured database.
    ///
    /// Pipelines run concurrently with no ordering guarantee between them;
    /// within a pipeline the stages are strictly sequential. Returns once
    /// every job has settled and finished its own cleanup.
    pub async fn run(&self, source: &SourceConfig, remote: &RemoteConfig) -> Vec<JobOutcome> {
        let mut jobs = JoinSet::new();
        let mut job_names = HashMap::new();
        for db in source.databases() {
            let pipeline = self.clone();
            let source = source.clone();
            let remote = remote.clone();
            let name = db.clone();
            let handle = jobs.spawn(async move {
                let result = pipeline.run_job(&source, &remote, &db).await;
                JobOutcome {
                    database: db,
                    result,
                }
            });
            job_names.insert(handle.id(), name);
        }

        let mut outcomes = Vec::with_capacity(jobs.len());
        while let Some(joined) = jobs.join_next_with_id().await {
            match joined {
                Ok((_, outcome)) => outcomes.push(outcome),
                Err(e) => {
                    let database = job_names
                        .get(&e.id())
                        .cloned()
                        .unwrap_or_else(|| String::from("unknown"));
                    error!("Backup job for {database} terminated abnormally: {e}");
                    outcomes.push(JobOutcome {
                        database,
                        result: Err(BackupError::Aborted(e.to_string())),
                    });
                }
            }
        }
        outcomes
    }

    async fn run_job(
        &self,
        source: &SourceConfig,
        remote: &RemoteConfig,
        db: &str,
    ) -> Result<(), BackupError> {
        // Unsafe identifiers are skipped outright, before any temp-file or
        // process work happens for them.
        if let Err(e) = self.dump.check_identifier(db) {
            error!("{e}");
            return Err(e);
        }

        let paths = JobPaths::new(self.dump.kind(), db);

        // Pre-pass: drop stale artifacts a previously failed run left behind.
        self.best_effort_remove(&paths.backup_dir).await;
        self.best_effort_remove(&paths.archive_path).await;

        let result = self.run_stages_supervised(source, remote, db, &paths).await;

        // Post-pass: fires exactly once whatever the stages did, and its own
        // failures never override the already-determined outcome.
        self.best_effort_remove(&paths.backup_dir).await;
        self.best_effort_remove(&paths.archive_path).await;

        match &result {
            Ok(()) => info!("Successfully backed up {db}"),
            Err(e) => error!("Backup of {db} failed: {e}"),
        }
        result
    }

    /// Runs the stage sequence inside its own task so a fault outside the
    /// normal error flow (a panic) is contained to this job: the caller
    /// still performs cleanup and the other in-flight jobs are untouched.
    async fn run_stages_supervised(
        &self,
        source: &SourceConfig,
        remote: &RemoteConfig,
        db: &str,
        paths: &JobPaths,
    ) -> Result<(), BackupError> {
        let pipeline = self.clone();
        let source = source.clone();
        let remote = remote.clone();
        let db = db.to_string();
        let paths = paths.clone();

        let stages =
            tokio::spawn(async move { pipeline.run_stages(&source, &remote, &db, &paths).await });
        match stages.await {
            Ok(result) => result,
            Err(e) => Err(BackupError::Aborted(e.to_string())),
        }
    }

    async fn run_stages(
        &self,
        source: &SourceConfig,
        remote: &RemoteConfig,
        db: &str,
        paths: &JobPaths,
    ) -> Result<(), BackupError> {
        self.staged(Stage::Dump, self.dump.dump(source, db, &paths.tmp_dir))
            .await?;
        self.staged(
            Stage::Archive,
            self.archiver.compress(&paths.tmp_dir, db, &paths.archive_name),
        )
        .await?;

        let key = object_key(remote.destination.as_deref(), &paths.archive_name);
        self.staged(
            Stage::Upload,
            self.uploader.upload(remote, &paths.archive_path, &key),
        )
        .await?;
        Ok(())
    }

    async fn staged<F>(&self, stage: Stage, work: F) -> Result<(), BackupError>
    where
        F: Future<Output = Result<(), BackupError>>,
    {
        match self.stage_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, work).await {
                Ok(result) => result,
                Err(_) => Err(BackupError::StageTimedOut { stage, timeout }),
            },
            None => work.await,
        }
    }

    async fn best_effort_remove(&self, path: &Path) {
        if let Err(source) = self.cleaner.remove_rf(path).await {
            let e = BackupError::CleanupFailed {
                path: path.to_path_buf(),
                source,
            };
            warn!("{e}");
        }
    }
}
