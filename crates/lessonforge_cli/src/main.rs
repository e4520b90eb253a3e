//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `lessonforge_core` linkage, logging and schema bootstrap.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `lessonforge_cli [config.json]`

use lessonforge_core::db::migrations::{latest_version, schema_version};
use lessonforge_core::{
    init_logging, logging_status, open_db, open_db_in_memory, EngineConfig, LoggingConfig,
};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("lessonforge_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_file(Path::new(&path)).map_err(|err| err.to_string())?,
        None => EngineConfig::default(),
    };
    start_logging(&config.logging)?;

    let conn = match &config.database_path {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }
    .map_err(|err| err.to_string())?;
    let schema = schema_version(&conn).map_err(|err| err.to_string())?;

    println!(
        "lessonforge_core version={}",
        lessonforge_core::core_version()
    );
    println!(
        "lessonforge_core schema={}/{}",
        schema,
        latest_version()
    );
    println!(
        "lessonforge_core deployment_quota={}",
        config
            .deployment_quota
            .map_or_else(|| "unlimited".to_string(), |quota| quota.to_string())
    );
    if let Some((level, log_dir)) = logging_status() {
        println!(
            "lessonforge_core logging level={} dir={}",
            level,
            log_dir.display()
        );
    }
    Ok(())
}

/// Starts file logging when the config names a log directory.
fn start_logging(config: &LoggingConfig) -> Result<bool, String> {
    if config.log_dir.is_none() {
        return Ok(false);
    }
    init_logging(config).map_err(|err| err.to_string())?;
    Ok(true)
}
