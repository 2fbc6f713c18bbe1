use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LoggingConfig};

pub const GITIGNORE_CONTENT: &str = "*\n!.gitignore\n";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {message}")]
    Filter { filter: String, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("subscriber already installed: {0}")]
    Init(String),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// `<prefix>-<YYYY-MM-DD_HH-MM-SS>.log`
pub fn log_file_name(prefix: &str, now: DateTime<Local>) -> String {
    let prefix = prefix.trim();
    let stamp = now.format("%Y-%m-%d_%H-%M-%S");
    if prefix.is_empty() {
        format!("{stamp}.log")
    } else {
        format!("{prefix}-{stamp}.log")
    }
}

/// Creates the log directory and keeps its contents out of version control.
pub fn prepare_log_dir(dir: &Path) -> Result<(), LoggingError> {
    fs::create_dir_all(dir)?;
    let gitignore = dir.join(".gitignore");
    if !gitignore.is_file() {
        fs::write(&gitignore, GITIGNORE_CONTENT)?;
    }
    Ok(())
}

pub fn open_log_file(
    config: &LoggingConfig,
    now: DateTime<Local>,
) -> Result<(File, PathBuf), LoggingError> {
    prepare_log_dir(&config.directory)?;
    let path = config.directory.join(log_file_name(&config.file_prefix, now));
    let file = File::create(&path)?;
    Ok((file, path))
}

fn stderr_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stderr)
            .with_line_number(true)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, file: File) -> BoxedLayer {
    let writer = Mutex::new(file);
    match format {
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
        LogFormat::Text => fmt::layer()
            .with_ansi(false)
            .with_line_number(true)
            .with_writer(writer)
            .boxed(),
    }
}

/// Installs the global subscriber. Returns the log file path when file
/// logging is enabled.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<PathBuf>, LoggingError> {
    let filter = EnvFilter::try_new(&config.level).map_err(|err| LoggingError::Filter {
        filter: config.level.clone(),
        message: err.to_string(),
    })?;

    let mut layers: Vec<BoxedLayer> = vec![stderr_layer(config.format)];
    let mut log_path = None;
    if config.to_file {
        let (file, path) = open_log_file(config, Local::now())?;
        layers.push(file_layer(config.format, file));
        log_path = Some(path);
    }

    tracing_subscriber::registry()
        .with(layers.with_filter(filter))
        .try_init()
        .map_err(|err| LoggingError::Init(err.to_string()))?;
    Ok(log_path)
}
