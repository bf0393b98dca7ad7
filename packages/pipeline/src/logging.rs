//! Tracing setup for the binaries: human-readable events on stderr, and a
//! debug-level log file next to the registry database.

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{PipelineError, Result};

/// Log file filter: debug for this workspace, info for dependencies.
const FILE_FILTER: &str =
    "info,oaiharvest_harvester=debug,oaiharvest_pipeline=debug,oai_harvest=debug,oai_reg=debug";

/// Open (or create) `file_name` in `directory` for appending.
pub fn file_appender(directory: &Path, file_name: &str) -> Result<RollingFileAppender> {
    fs::create_dir_all(directory)?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(|e| {
            PipelineError::Config(format!(
                "cannot open log file {}: {e}",
                directory.join(file_name).display()
            ))
        })
}

/// Install the global subscriber.
///
/// The console honours `RUST_LOG`, defaulting to `console_default`. The
/// returned guard flushes the log file when dropped. Without a log
/// directory, or if the file cannot be opened, only the console is used.
pub fn init(
    log_directory: Option<&Path>,
    file_name: &str,
    console_default: &str,
) -> Option<WorkerGuard> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_default));
    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let mut file_error = None;
    let (file, guard) = match log_directory.map(|dir| file_appender(dir, file_name)) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(FILE_FILTER));
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            file_error = Some(e);
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();

    if let Some(e) = file_error {
        tracing::warn!(error = %e, "Logging to the console only");
    }
    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_file_appender_creates_directory_and_file() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join(".oai-harvest");

        let mut appender = file_appender(&log_dir, "harvest.log").unwrap();
        appender.write_all(b"first\n").unwrap();
        appender.flush().unwrap();

        assert_eq!(
            fs::read_to_string(log_dir.join("harvest.log")).unwrap(),
            "first\n"
        );
    }

    #[test]
    fn test_file_appender_appends() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("registry.log"), "earlier\n").unwrap();

        let mut appender = file_appender(dir.path(), "registry.log").unwrap();
        appender.write_all(b"later\n").unwrap();
        appender.flush().unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("registry.log")).unwrap(),
            "earlier\nlater\n"
        );
    }
}
