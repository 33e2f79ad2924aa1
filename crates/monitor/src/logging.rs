//! File logging for the monitor process.
//!
//! Filter: `AGENTWATCH_LOG_FILTER` > `RUST_LOG` > `info`. Format: JSON unless
//! `AGENTWATCH_LOG_FORMAT=pretty`.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::paths::log_dir;

const DEFAULT_FILTER: &str = "info";
const LOG_FILE_NAME: &str = "monitor.log";

pub struct LoggingHandle {
    pub run_id: String,
    pub guard: WorkerGuard,
}

/// Install the global subscriber, writing to `<data_dir>/logs/monitor.log`.
///
/// stdout carries the event stream, so nothing is ever logged there.
pub fn init_logging(data_dir: &Path) -> anyhow::Result<LoggingHandle> {
    let log_dir = log_dir(data_dir);
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(LOG_FILE_NAME);

    if std::env::var("AGENTWATCH_TRUNCATE_LOG_ON_START").as_deref() == Ok("1") {
        let _ = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&log_path)?;
    }

    let filter_source = filter_source();
    let filter = EnvFilter::try_new(&filter_source).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let format = std::env::var("AGENTWATCH_LOG_FORMAT").unwrap_or_else(|_| "json".into());

    let registry = tracing_subscriber::registry().with(filter);
    if format.eq_ignore_ascii_case("pretty") {
        registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .pretty()
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .json()
                    .flatten_event(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true)
                    .with_current_span(true),
            )
            .try_init()?;
    }

    let run_id = std::env::var("AGENTWATCH_RUN_ID").unwrap_or_else(|_| {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("pid-{}-{}", std::process::id(), now)
    });

    tracing::info!(
        component = "logging",
        event = "logging.initialized",
        log_path = %log_path.display(),
        format = %format,
        filter = %filter_source,
        run_id = %run_id,
    );

    Ok(LoggingHandle { run_id, guard })
}

/// `AGENTWATCH_LOG_FILTER`, then `RUST_LOG`, then `info`.
fn filter_source() -> String {
    pick_filter(
        std::env::var("AGENTWATCH_LOG_FILTER").ok(),
        std::env::var("RUST_LOG").ok(),
    )
}

fn pick_filter(own: Option<String>, rust_log: Option<String>) -> String {
    own.filter(|v| !v.trim().is_empty())
        .or_else(|| rust_log.filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_filter_wins_over_rust_log() {
        assert_eq!(
            pick_filter(Some("debug".into()), Some("warn".into())),
            "debug"
        );
        assert_eq!(pick_filter(None, Some("warn".into())), "warn");
        assert_eq!(pick_filter(Some("  ".into()), None), "info");
    }
}
