//! Wake sources: one-shot timers, periodic tickers and file watches.
//!
//! None of these touch monitor state. Each one only sends a
//! [`WatcherMessage`] back to the event loop, which decides whether the
//! target is still alive.

use std::path::Path;
use std::time::Duration;

use agentwatch_protocol::AgentId;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::MonitorError;
use crate::transcript_watcher::WatcherMessage;

/// A cancellable one-shot timer tagged with the generation it was armed in.
#[derive(Debug)]
pub struct Timer {
    pub generation: u64,
    task: JoinHandle<()>,
}

impl Timer {
    /// Send `msg` after `delay`.
    pub fn after(
        delay: Duration,
        generation: u64,
        tx: mpsc::UnboundedSender<WatcherMessage>,
        msg: WatcherMessage,
    ) -> Self {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(msg);
        });
        Self { generation, task }
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

/// Send a message built by `make_msg` every `period`, starting immediately.
pub fn spawn_ticker<F>(
    period: Duration,
    tx: mpsc::UnboundedSender<WatcherMessage>,
    make_msg: F,
) -> JoinHandle<()>
where
    F: Fn() -> WatcherMessage + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if tx.send(make_msg()).is_err() {
                return;
            }
        }
    })
}

/// Both wake sources of one agent's transcript.
pub struct AgentWake {
    watcher: Option<RecommendedWatcher>,
    poll: JoinHandle<()>,
}

impl AgentWake {
    /// Subscribe to change notifications on `path` and start the backstop
    /// poll. A failed subscription leaves the poll as the only source.
    pub fn start(
        agent_id: AgentId,
        path: &Path,
        poll_interval: Duration,
        tx: mpsc::UnboundedSender<WatcherMessage>,
    ) -> Self {
        let watcher = match watch_file(agent_id, path, tx.clone()) {
            Ok(watcher) => Some(watcher),
            Err(err) => {
                debug!(
                    component = "wake",
                    event = "wake.watch_unavailable",
                    agent_id = %agent_id,
                    path = %path.display(),
                    error = %err,
                    "File watch unavailable, relying on polling"
                );
                None
            }
        };

        let poll = spawn_ticker(poll_interval, tx, move || WatcherMessage::Pump(agent_id));

        Self { watcher, poll }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn cancel(self) {
        self.poll.abort();
        drop(self.watcher);
    }
}

fn watch_file(
    agent_id: AgentId,
    path: &Path,
    tx: mpsc::UnboundedSender<WatcherMessage>,
) -> Result<RecommendedWatcher, MonitorError> {
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                if matches_supported_event_kind(&event.kind) {
                    let _ = tx.send(WatcherMessage::Pump(agent_id));
                }
            }
            Err(err) => {
                warn!(
                    component = "wake",
                    event = "wake.fs_event_error",
                    agent_id = %agent_id,
                    error = %err,
                    "Transcript watch event error"
                );
            }
        },
        notify::Config::default(),
    )?;

    watcher.watch(path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn matches_supported_event_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    )
}
