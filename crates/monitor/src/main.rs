//! agentwatch binary
//!
//! Reads host commands as NDJSON on stdin and writes agent events as NDJSON
//! on stdout. Logs go to a file under the data directory.

use std::path::PathBuf;
use std::time::Duration;

use agentwatch::config::{DEFAULT_MAX_FILE_AGE_SECS, DEFAULT_WAIT_DEBOUNCE_MS};
use agentwatch::logging::init_logging;
use agentwatch::paths::{resolve_data_dir, resolve_projects_root};
use agentwatch::stdio::{forward_commands, write_events};
use agentwatch::{start_monitor, MonitorConfig};
use agentwatch_protocol::new_host_id;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "agentwatch",
    version,
    about = "Live activity status for coding agents, read from their transcripts"
)]
struct Cli {
    /// Directory holding one transcript directory per working directory
    #[arg(long, env = "AGENTWATCH_PROJECTS_DIR")]
    projects_dir: Option<PathBuf>,

    /// Where agentwatch keeps its logs
    #[arg(long, env = "AGENTWATCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Ignore unclaimed transcripts older than this. 0 disables the limit.
    #[arg(long, env = "AGENTWATCH_MAX_FILE_AGE_SECS", default_value_t = DEFAULT_MAX_FILE_AGE_SECS)]
    max_file_age_secs: u64,

    /// Quiet period after a text-only reply before reporting "waiting"
    #[arg(long, env = "AGENTWATCH_WAIT_DEBOUNCE_MS", default_value_t = DEFAULT_WAIT_DEBOUNCE_MS)]
    wait_debounce_ms: u64,

    /// Open a host for this working directory at startup (repeatable)
    #[arg(long = "cwd")]
    cwds: Vec<PathBuf>,

    /// Known session id of the first --cwd host
    #[arg(long, requires = "cwds")]
    session_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = resolve_data_dir(cli.data_dir.as_deref());
    let logging = init_logging(&data_dir)?;

    let config = MonitorConfig::new(resolve_projects_root(cli.projects_dir.as_deref()))
        .with_max_file_age_secs(cli.max_file_age_secs)
        .with_wait_debounce(Duration::from_millis(cli.wait_debounce_ms));

    info!(
        component = "main",
        event = "main.starting",
        run_id = %logging.run_id,
        projects_root = %config.projects_root.display(),
        max_file_age = ?config.max_file_age,
        wait_debounce_ms = cli.wait_debounce_ms,
        "Starting agentwatch"
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (handle, monitor_task) = start_monitor(config, events_tx);
    let writer_task = tokio::spawn(write_events(events_rx, tokio::io::stdout()));

    for (index, cwd) in cli.cwds.iter().enumerate() {
        let session_id = if index == 0 {
            cli.session_id.clone()
        } else {
            None
        };
        handle.host_opened(new_host_id(), cwd.display().to_string(), cwd, session_id)?;
    }

    // A blocking stdin read on a runtime worker would hold up shutdown.
    let stdin_handle = handle.clone();
    std::thread::spawn(move || forward_commands(std::io::stdin().lock(), &stdin_handle));

    let signal_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(
                component = "main",
                event = "main.interrupted",
                "Interrupt received, shutting down"
            );
            let _ = signal_handle.shutdown();
        }
    });

    monitor_task.await?;
    writer_task.await??;

    info!(component = "main", event = "main.stopped", "agentwatch stopped");
    drop(logging);
    Ok(())
}
