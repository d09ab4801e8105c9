//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `docvault_core` linkage.
//! - Open a store, make sure a namespace exists and report what it holds.
//!
//! Usage: `docvault_cli [--config <file.json> | <db_path>] [namespace]`

use docvault_core::{
    core_version, init_logging_from_config, logging_status, open_db_with_config, CoreConfig,
    DocError, DocumentService, SqliteKv,
};
use log::error;
use std::process::ExitCode;

const DEFAULT_NAMESPACE: &str = "default";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("docvault_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let (config, rest) = match args {
        [flag, path, rest @ ..] if flag == "--config" => {
            (CoreConfig::from_path(path).map_err(|err| err.to_string())?, rest)
        }
        [flag] if flag == "--config" => return Err("--config requires a file path".to_string()),
        [db_path, rest @ ..] => (CoreConfig::for_path(db_path), rest),
        [] => (CoreConfig::default(), args),
    };
    config.validate().map_err(|err| err.to_string())?;
    let namespace = rest.first().map_or(DEFAULT_NAMESPACE, String::as_str);

    if let Some(log) = &config.log {
        init_logging_from_config(log)?;
    }

    let conn = open_db_with_config(&config).map_err(|err| err.to_string())?;
    let service = DocumentService::new(SqliteKv::new(&conn));
    let store = service
        .create_document_store(namespace)
        .map_err(|err: DocError| err.to_string())?;

    println!("docvault_core version={}", core_version());
    println!(
        "docvault_core db={}",
        config
            .db_path
            .as_deref()
            .map_or_else(|| ":memory:".to_string(), |path| path.display().to_string())
    );
    println!("docvault_core namespace={} status=ready", store.namespace());
    if let Some((level, dir)) = logging_status() {
        println!("docvault_core log_level={level} log_dir={}", dir.display());
    }
    Ok(())
}
