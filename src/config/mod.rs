use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Sentinel database identifier meaning "every database the source manages".
///
/// It changes both the dump invocation (no per-database flag) and the dump
/// output layout (an `all/` subfolder).
pub const ALL_DATABASES: &str = "all";

/// Which vendor dump tool the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Mongodb,
    Mysql,
}

impl DatabaseKind {
    pub fn slug(&self) -> &'static str {
        match self {
            DatabaseKind::Mongodb => "mongodb",
            DatabaseKind::Mysql => "mysql",
        }
    }

    pub fn dump_tool(&self) -> &'static str {
        match self {
            DatabaseKind::Mongodb => "mongodump",
            DatabaseKind::Mysql => "mysqldump",
        }
    }

    /// Temp working folder shared by all of this kind's jobs, e.g.
    /// `/tmp/mongodb_s3_backup`. Dump output and archives live under it.
    pub fn temp_root(&self) -> PathBuf {
        env::temp_dir().join(format!("{}_s3_backup", self.slug()))
    }
}

impl std::fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// How to reach the source database server. Read-only to the pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Databases to back up; omitted means the [`ALL_DATABASES`] sentinel.
    #[serde(default)]
    pub dbs: Option<Vec<String>>,
}

impl SourceConfig {
    /// The effective database list: the configured one, or a single
    /// sentinel job when none (or an empty list) was given.
    pub fn databases(&self) -> Vec<String> {
        match &self.dbs {
            Some(dbs) if !dbs.is_empty() => dbs.clone(),
            _ => vec![ALL_DATABASES.to_string()],
        }
    }
}

/// How to reach the object storage that receives the archives.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services (DigitalOcean Spaces etc.).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Destination path prefix inside the bucket, default `/`.
    #[serde(default)]
    pub destination: Option<String>,
    /// Request server-side encryption (AES-256) on uploaded objects.
    #[serde(default)]
    pub encrypt: bool,
}

/// Top-level configuration for the binary, loaded from `config.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_kind: DatabaseKind,
    pub source: SourceConfig,
    pub s3: RemoteConfig,
    /// Optional deadline applied to each stage of every job.
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,
}

impl AppConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        serde_json::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse JSON from config file at {}",
                config_path.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_full_config() -> anyhow::Result<()> {
        let value = json!({
            "database_kind": "mongodb",
            "source": {
                "host": "db.internal",
                "port": 27017,
                "username": "backup",
                "password": "hunter2",
                "dbs": ["orders", "sessions"]
            },
            "s3": {
                "access_key_id": "AKIA...",
                "secret_access_key": "secret",
                "bucket": "nightly-backups",
                "region": "eu-west-1",
                "destination": "/mongo",
                "encrypt": true
            },
            "stage_timeout_secs": 900
        });

        let config: AppConfig = serde_json::from_value(value)?;
        assert_eq!(config.database_kind, DatabaseKind::Mongodb);
        assert_eq!(config.source.databases(), vec!["orders", "sessions"]);
        assert_eq!(config.s3.destination.as_deref(), Some("/mongo"));
        assert!(config.s3.encrypt);
        assert_eq!(config.stage_timeout_secs, Some(900));
        Ok(())
    }

    #[test]
    fn optional_fields_default() -> anyhow::Result<()> {
        let value = json!({
            "database_kind": "mysql",
            "source": { "host": "localhost", "port": 3306 },
            "s3": {
                "access_key_id": "k",
                "secret_access_key": "s",
                "bucket": "b"
            }
        });

        let config: AppConfig = serde_json::from_value(value)?;
        assert_eq!(config.source.username, None);
        assert_eq!(config.source.dbs, None);
        assert_eq!(config.s3.destination, None);
        assert!(!config.s3.encrypt);
        assert_eq!(config.stage_timeout_secs, None);
        Ok(())
    }

    #[test]
    fn omitted_dbs_means_the_all_sentinel() {
        let source = SourceConfig {
            host: "localhost".into(),
            port: 27017,
            username: None,
            password: None,
            dbs: None,
        };
        assert_eq!(source.databases(), vec![ALL_DATABASES.to_string()]);

        let empty = SourceConfig {
            dbs: Some(vec![]),
            ..source
        };
        assert_eq!(empty.databases(), vec![ALL_DATABASES.to_string()]);
    }

    #[test]
    fn kind_slugs_feed_the_temp_root() {
        assert!(
            DatabaseKind::Mongodb
                .temp_root()
                .ends_with("mongodb_s3_backup")
        );
        assert!(DatabaseKind::Mysql.temp_root().ends_with("mysql_s3_backup"));
        assert_eq!(DatabaseKind::Mysql.dump_tool(), "mysqldump");
    }
}
