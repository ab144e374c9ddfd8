pub(crate) mod archive;
pub(crate) mod db_dump;
mod logic;
pub(crate) mod s3_upload;

pub use archive::TarArchiver;
pub use db_dump::{MongoDumpProvider, MySqlDumpProvider};
pub use logic::{Archiver, BackupPipeline, Cleaner, DumpProvider, JobOutcome, TokioCleaner, Uploader};
pub use s3_upload::S3Uploader;

use crate::config::{DatabaseKind, RemoteConfig, SourceConfig};

/// Dumps the configured MongoDB databases, compresses each dump and uploads
/// the archives to object storage. One outcome per database.
pub async fn sync_mongo(source: &SourceConfig, remote: &RemoteConfig) -> Vec<JobOutcome> {
    BackupPipeline::for_kind(DatabaseKind::Mongodb)
        .run(source, remote)
        .await
}

/// Same pipeline as [`sync_mongo`], driving `mysqldump`.
pub async fn sync_mysql(source: &SourceConfig, remote: &RemoteConfig) -> Vec<JobOutcome> {
    BackupPipeline::for_kind(DatabaseKind::Mysql)
        .run(source, remote)
        .await
}
