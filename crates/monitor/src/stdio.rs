//! NDJSON plumbing between the monitor and its embedding process.
//!
//! Commands arrive one JSON object per line; events leave the same way.

use std::io::BufRead;

use agentwatch_protocol::{HostCommand, MonitorEvent};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::MonitorError;
use crate::transcript_watcher::MonitorHandle;

/// Forward every well-formed command line to the monitor until the reader
/// ends or the monitor stops. Blocking; run it on its own thread.
pub fn forward_commands<R: BufRead>(reader: R, handle: &MonitorHandle) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(
                    component = "stdio",
                    event = "stdio.read_failed",
                    error = %err,
                    "Failed reading command input"
                );
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let cmd = match serde_json::from_str::<HostCommand>(line) {
            Ok(cmd) => cmd,
            Err(err) => {
                warn!(
                    component = "stdio",
                    event = "stdio.malformed_command",
                    error = %err,
                    "Skipping malformed command line"
                );
                continue;
            }
        };

        if handle.send(cmd).is_err() {
            debug!(
                component = "stdio",
                event = "stdio.monitor_gone",
                "Monitor stopped, no longer reading commands"
            );
            return;
        }
    }

    debug!(
        component = "stdio",
        event = "stdio.input_closed",
        "Command input closed"
    );
}

/// Write each event as one line until the monitor drops its sender.
pub async fn write_events<W>(
    mut events: mpsc::UnboundedReceiver<MonitorEvent>,
    mut writer: W,
) -> Result<(), MonitorError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = events.recv().await {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript_watcher::WatcherMessage;
    use agentwatch_protocol::{AgentId, AgentStatus, HostId};

    #[test]
    fn malformed_and_blank_lines_are_skipped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = MonitorHandle::new(tx);
        let input = concat!(
            "{\"type\":\"host_closed\",\"host_id\":\"h1\"}\n",
            "\n",
            "not json\n",
            "{\"type\":\"launch_rockets\"}\n",
            "{\"type\":\"request_existing_agents\"}\n",
        );

        forward_commands(input.as_bytes(), &handle);

        let mut commands = Vec::new();
        while let Ok(WatcherMessage::Command(cmd)) = rx.try_recv() {
            commands.push(cmd);
        }
        assert_eq!(
            commands,
            vec![
                HostCommand::HostClosed {
                    host_id: HostId::from("h1")
                },
                HostCommand::RequestExistingAgents,
            ]
        );
    }

    #[test]
    fn stops_once_the_monitor_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = MonitorHandle::new(tx);
        drop(rx);

        forward_commands("{\"type\":\"shutdown\"}\n".as_bytes(), &handle);
    }

    #[tokio::test]
    async fn events_are_written_one_per_line() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(MonitorEvent::AgentClosed { agent_id: AgentId(3) })
            .expect("send");
        tx.send(MonitorEvent::AgentStatus {
            agent_id: AgentId(4),
            status: AgentStatus::Waiting,
        })
        .expect("send");
        drop(tx);

        let mut out = Vec::new();
        write_events(rx, &mut out).await.expect("write events");

        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"type":"agent_closed","agent_id":3}"#);
        let second: serde_json::Value = serde_json::from_str(lines[1]).expect("json");
        assert_eq!(second["status"], "waiting");
    }
}
