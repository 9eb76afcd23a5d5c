use std::path::PathBuf;

use eyre::Result;
use log::{LevelFilter, info};

pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("transcript-api")
        .join("logs")
}

/// Log to stderr; RUST_LOG overrides the default level
pub fn init_stderr(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Append logs to `<log_dir>/<name>.log`, keeping stdout clean
pub fn init_file(name: &str) -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join(format!("{name}.log"));

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .try_init()?;

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}
