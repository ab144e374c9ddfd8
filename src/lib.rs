//! Periodic database backups to S3-compatible object storage.
//!
//! For each configured database the pipeline runs dump → compress → upload
//! in strict sequence, then removes its temp artifacts whether the run
//! succeeded or failed. Pipelines for different databases run concurrently.
//!
//! The vendor dump tools (`mongodump`, `mysqldump`) and `tar` must be on the
//! `PATH`; this crate only orchestrates them.

pub mod backup;
pub mod config;
pub mod errors;
pub mod logging;
pub mod utils;

pub use backup::{BackupPipeline, JobOutcome, sync_mongo, sync_mysql};
pub use config::{ALL_DATABASES, AppConfig, DatabaseKind, RemoteConfig, SourceConfig};
pub use errors::BackupError;
