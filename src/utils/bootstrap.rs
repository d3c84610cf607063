//! Bootstrap utilities for the calendar binary.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LoggerConfig, LOG_ENV_VAR};

/// Initialize tracing with CALENDAR_LOG environment variable.
///
/// Falls back to the configured level, then to "info". When `config.path` is
/// set, events are also written as JSON lines to a timestamped file in that
/// directory; its path is returned.
pub fn init_tracing(config: &LoggerConfig) -> std::io::Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, log_path) = match &config.path {
        Some(dir) => {
            let (file, path) = open_log_file(Path::new(dir))?;
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Arc::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(log_path)
}

/// `calendar-<YYYYmmdd-HHMMSS>.log` in `dir`, creating the directory.
fn open_log_file(dir: &Path) -> std::io::Result<(File, PathBuf)> {
    fs::create_dir_all(dir)?;
    let name = format!("calendar-{}.log", chrono::Utc::now().format("%Y%m%d-%H%M%S"));
    let path = dir.join(name);
    let file = File::options().create(true).append(true).open(&path)?;
    Ok((file, path))
}
