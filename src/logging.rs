use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Mode;

pub const LOG_FILE: &str = "bankwatch.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. The terminal UI owns the screen, so in
/// that mode logs go to `<data_dir>/bankwatch.log`; keep the returned guard
/// alive until exit so buffered lines are flushed.
pub fn init(mode: Mode, data_dir: &Path) -> std::io::Result<Option<WorkerGuard>> {
    if mode == Mode::Tui {
        std::fs::create_dir_all(data_dir)?;
        let appender = tracing_appender::rolling::never(data_dir, LOG_FILE);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(writer)
            .with_ansi(false)
            .init();
        return Ok(Some(guard));
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
    Ok(None)
}
