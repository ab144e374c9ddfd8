//! Database S3 Backup Tool
//!
//! Loads `config.json`, runs the backup pipeline for every configured
//! database and maps the aggregate outcome to the exit code.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use db_s3_backup::config::AppConfig;
use db_s3_backup::{BackupPipeline, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    match run_app().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    // Config path may be given as the only argument; defaults to config.json
    // next to the working directory, same as running with `cargo run`.
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"));
    let app_config = AppConfig::load_from_json(&config_path).with_context(|| {
        format!(
            "Failed to load application configuration from {}",
            config_path.display()
        )
    })?;

    let mut pipeline = BackupPipeline::for_kind(app_config.database_kind);
    if let Some(secs) = app_config.stage_timeout_secs {
        pipeline = pipeline.with_stage_timeout(Duration::from_secs(secs));
    }

    info!(
        "Starting {} backup of {} database(s)",
        app_config.database_kind,
        app_config.source.databases().len()
    );
    let outcomes = pipeline.run(&app_config.source, &app_config.s3).await;

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} backup job(s) failed", outcomes.len());
    }
    info!("All {} backup job(s) completed successfully", outcomes.len());
    Ok(())
}
