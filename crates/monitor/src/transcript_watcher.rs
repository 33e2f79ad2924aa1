//! Transcript watcher event loop.
//!
//! One task owns the [`AgentRegistry`] and reacts to every inbound message in
//! order: host commands, scan ticks, pump requests from file watches and polls,
//! and timer firings. Wake sources never touch state directly, so a message
//! for a host or agent that has since been torn down is simply dropped.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use agentwatch_protocol::{AgentId, AgentStatus, HostCommand, HostId, MonitorEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::paths::transcript_dir;
use crate::record::parse_line;
use crate::scanner;
use crate::state::{AgentRegistry, HostState, PendingToolDone};
use crate::transition::{transition, Effect, Input};
use crate::wake::{spawn_ticker, AgentWake, Timer};

pub enum WatcherMessage {
    Command(HostCommand),
    ScanTick(HostId),
    Pump(AgentId),
    WaitTimerFired {
        agent_id: AgentId,
        generation: u64,
    },
    ToolDoneDue {
        agent_id: AgentId,
        tool_id: String,
        generation: u64,
    },
}

/// Handle to a running monitor (cheap to Clone).
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::UnboundedSender<WatcherMessage>,
}

impl MonitorHandle {
    pub fn new(tx: mpsc::UnboundedSender<WatcherMessage>) -> Self {
        Self { tx }
    }

    pub fn send(&self, cmd: HostCommand) -> Result<(), MonitorError> {
        self.tx
            .send(WatcherMessage::Command(cmd))
            .map_err(|_| MonitorError::ChannelClosed)
    }

    pub fn host_opened(
        &self,
        host_id: HostId,
        name: impl Into<String>,
        cwd: &Path,
        session_id: Option<String>,
    ) -> Result<(), MonitorError> {
        self.send(HostCommand::HostOpened {
            host_id,
            name: name.into(),
            cwd: cwd.to_string_lossy().to_string(),
            session_id,
        })
    }

    pub fn host_closed(&self, host_id: HostId) -> Result<(), MonitorError> {
        self.send(HostCommand::HostClosed { host_id })
    }

    pub fn request_existing_agents(&self) -> Result<(), MonitorError> {
        self.send(HostCommand::RequestExistingAgents)
    }

    pub fn shutdown(&self) -> Result<(), MonitorError> {
        self.send(HostCommand::Shutdown)
    }
}

/// Spawn the event loop. Events are delivered on `events_tx` until shutdown.
pub fn start_monitor(
    config: MonitorConfig,
    events_tx: mpsc::UnboundedSender<MonitorEvent>,
) -> (MonitorHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let runtime = WatcherRuntime::new(config, tx.clone(), events_tx);
    let task = tokio::spawn(runtime.run(rx));
    (MonitorHandle { tx }, task)
}

pub struct WatcherRuntime {
    config: MonitorConfig,
    registry: AgentRegistry,
    tx: mpsc::UnboundedSender<WatcherMessage>,
    events_tx: mpsc::UnboundedSender<MonitorEvent>,
    timer_generation: u64,
}

impl WatcherRuntime {
    pub fn new(
        config: MonitorConfig,
        tx: mpsc::UnboundedSender<WatcherMessage>,
        events_tx: mpsc::UnboundedSender<MonitorEvent>,
    ) -> Self {
        Self {
            config,
            registry: AgentRegistry::new(),
            tx,
            events_tx,
            timer_generation: 0,
        }
    }

    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<WatcherMessage>) {
        info!(
            component = "transcript_watcher",
            event = "transcript_watcher.started",
            projects_root = %self.config.projects_root.display(),
            "Transcript watcher started"
        );

        while let Some(msg) = rx.recv().await {
            if !self.handle_message(msg) {
                break;
            }
        }

        self.close_all_hosts();
        info!(
            component = "transcript_watcher",
            event = "transcript_watcher.stopped",
            "Transcript watcher stopped"
        );
    }

    /// Process one message. Returns false once the loop should stop.
    pub fn handle_message(&mut self, msg: WatcherMessage) -> bool {
        match msg {
            WatcherMessage::Command(cmd) => return self.handle_command(cmd),
            WatcherMessage::ScanTick(host_id) => self.scan_host(&host_id),
            WatcherMessage::Pump(agent_id) => self.pump(agent_id),
            WatcherMessage::WaitTimerFired {
                agent_id,
                generation,
            } => self.handle_wait_timer(agent_id, generation),
            WatcherMessage::ToolDoneDue {
                agent_id,
                tool_id,
                generation,
            } => self.handle_tool_done(agent_id, tool_id, generation),
        }
        true
    }

    fn handle_command(&mut self, cmd: HostCommand) -> bool {
        match cmd {
            HostCommand::HostOpened {
                host_id,
                name,
                cwd,
                session_id,
            } => self.open_host(host_id, name, PathBuf::from(cwd), session_id),
            HostCommand::HostLaunched {
                host_id,
                session_id,
            } => self.set_host_session(&host_id, session_id),
            HostCommand::HostClosed { host_id } => self.close_host(&host_id),
            HostCommand::RequestExistingAgents => self.send_existing_agents(),
            HostCommand::Shutdown => return false,
        }
        true
    }

    // -- Hosts --

    fn open_host(
        &mut self,
        host_id: HostId,
        name: String,
        cwd: PathBuf,
        session_id: Option<String>,
    ) {
        if self.registry.has_host(&host_id) {
            debug!(
                component = "transcript_watcher",
                event = "transcript_watcher.host_already_open",
                host_id = %host_id,
                "Host already tracked"
            );
            if let Some(session_id) = session_id {
                self.set_host_session(&host_id, session_id);
            }
            return;
        }

        let dir = transcript_dir(&self.config.projects_root, &cwd);
        info!(
            component = "transcript_watcher",
            event = "transcript_watcher.host_opened",
            host_id = %host_id,
            name = %name,
            transcript_dir = %dir.display(),
            session_id = ?session_id,
            "Host opened"
        );

        let mut host = HostState::new(host_id.clone(), name, cwd, dir);
        host.session_id = session_id;
        let tick_host = host_id;
        host.scan_task = Some(spawn_ticker(
            self.config.scan_interval,
            self.tx.clone(),
            move || WatcherMessage::ScanTick(tick_host.clone()),
        ));
        self.registry.add_host(host);
    }

    fn set_host_session(&mut self, host_id: &HostId, session_id: String) {
        let Some(host) = self.registry.get_host_mut(host_id) else {
            debug!(
                component = "transcript_watcher",
                event = "transcript_watcher.unknown_host",
                host_id = %host_id,
                "Session id for unknown host ignored"
            );
            return;
        };
        debug!(
            component = "transcript_watcher",
            event = "transcript_watcher.host_session_known",
            host_id = %host_id,
            session_id = %session_id,
            "Host session id recorded"
        );
        host.session_id = Some(session_id);
    }

    fn close_host(&mut self, host_id: &HostId) {
        let Some(mut host) = self.registry.remove_host(host_id) else {
            return;
        };
        host.cancel();

        for agent_id in self.registry.agents_for_host(host_id) {
            self.close_agent(agent_id);
        }

        info!(
            component = "transcript_watcher",
            event = "transcript_watcher.host_closed",
            host_id = %host_id,
            name = %host.name,
            cwd = %host.cwd.display(),
            "Host closed"
        );
    }

    fn close_all_hosts(&mut self) {
        for host_id in self.registry.host_ids() {
            self.close_host(&host_id);
        }
    }

    fn scan_host(&mut self, host_id: &HostId) {
        let Some(host) = self.registry.get_host(host_id) else {
            return;
        };
        let dir = host.transcript_dir.clone();
        let session_id = host.session_id.clone();

        let claimed = scanner::scan(
            &dir,
            session_id.as_deref(),
            self.registry.claims_mut(),
            self.config.max_file_age,
            SystemTime::now(),
        );
        for path in claimed {
            self.adopt(host_id.clone(), path);
        }
    }

    // -- Agents --

    fn adopt(&mut self, host_id: HostId, path: PathBuf) {
        let agent_id = self.registry.create_agent(host_id.clone(), path.clone());
        info!(
            component = "transcript_watcher",
            event = "transcript_watcher.agent_created",
            agent_id = %agent_id,
            host_id = %host_id,
            path = %path.display(),
            "Agent created"
        );
        self.emit(MonitorEvent::AgentCreated {
            agent_id,
            host_id,
            transcript_path: path.to_string_lossy().to_string(),
        });

        let wake = AgentWake::start(agent_id, &path, self.config.poll_interval, self.tx.clone());
        debug!(
            component = "transcript_watcher",
            event = "transcript_watcher.wake_started",
            agent_id = %agent_id,
            file_watch = wake.is_watching(),
            "Wake sources started"
        );
        if let Some(agent) = self.registry.get_agent_mut(agent_id) {
            agent.wake = Some(wake);
        }

        self.pump(agent_id);
    }

    fn close_agent(&mut self, agent_id: AgentId) {
        let Some(agent) = self.registry.get_agent_mut(agent_id) else {
            return;
        };
        agent.cancel_all();
        self.registry.remove_agent(agent_id);

        info!(
            component = "transcript_watcher",
            event = "transcript_watcher.agent_closed",
            agent_id = %agent_id,
            "Agent closed"
        );
        self.emit(MonitorEvent::AgentClosed { agent_id });
    }

    fn pump(&mut self, agent_id: AgentId) {
        let Some(agent) = self.registry.get_agent_mut(agent_id) else {
            return;
        };

        let lines = match agent.tail.pump(&agent.transcript_path) {
            Ok(lines) => lines,
            Err(err) => {
                warn!(
                    component = "transcript_watcher",
                    event = "transcript_watcher.pump_failed",
                    agent_id = %agent_id,
                    path = %agent.transcript_path.display(),
                    error = %err,
                    "Failed reading transcript, retrying on next wake"
                );
                return;
            }
        };

        for line in lines {
            match parse_line(&line) {
                Some(input) => self.apply(agent_id, input),
                None => trace!(
                    component = "transcript_watcher",
                    event = "transcript_watcher.line_ignored",
                    agent_id = %agent_id,
                    "Transcript line carries no activity signal"
                ),
            }
        }
    }

    fn apply(&mut self, agent_id: AgentId, input: Input) {
        if let Input::ToolsStarted(tools) = &input {
            let restarted: Vec<&str> = tools.iter().filter_map(|t| t.id.as_deref()).collect();
            self.flush_tool_done(agent_id, &restarted);
        }

        let Some(agent) = self.registry.get_agent_mut(agent_id) else {
            return;
        };
        let state = std::mem::take(&mut agent.activity);
        let (state, effects) = transition(state, agent_id, input);
        agent.activity = state;
        self.execute(agent_id, effects);
    }

    fn execute(&mut self, agent_id: AgentId, effects: Vec<Effect>) {
        let Some(agent) = self.registry.get_agent_mut(agent_id) else {
            return;
        };

        for effect in effects {
            match effect {
                Effect::Emit(event) => {
                    let _ = self.events_tx.send(event);
                }
                Effect::ArmWaitTimer => {
                    agent.cancel_wait_timer();
                    self.timer_generation += 1;
                    let generation = self.timer_generation;
                    agent.wait_timer = Some(Timer::after(
                        self.config.wait_debounce,
                        generation,
                        self.tx.clone(),
                        WatcherMessage::WaitTimerFired {
                            agent_id,
                            generation,
                        },
                    ));
                }
                Effect::CancelWaitTimer => agent.cancel_wait_timer(),
                Effect::ScheduleToolDone { tool_id, status } => {
                    self.timer_generation += 1;
                    let generation = self.timer_generation;
                    let timer = Timer::after(
                        self.config.tool_done_delay,
                        generation,
                        self.tx.clone(),
                        WatcherMessage::ToolDoneDue {
                            agent_id,
                            tool_id: tool_id.clone(),
                            generation,
                        },
                    );
                    if let Some(previous) = agent
                        .tool_done_timers
                        .insert(tool_id, PendingToolDone { status, timer })
                    {
                        previous.timer.cancel();
                    }
                }
                Effect::CancelToolDone => agent.cancel_tool_done_timers(),
            }
        }
    }

    /// Emit any still-pending done for `tool_ids` right away, so a reused id
    /// closes its previous start before opening a new one.
    fn flush_tool_done(&mut self, agent_id: AgentId, tool_ids: &[&str]) {
        let Some(agent) = self.registry.get_agent_mut(agent_id) else {
            return;
        };
        let mut flushed = Vec::new();
        for tool_id in tool_ids {
            if let Some(pending) = agent.tool_done_timers.remove(*tool_id) {
                pending.timer.cancel();
                flushed.push(tool_id.to_string());
            }
        }
        for tool_id in flushed {
            self.emit(MonitorEvent::AgentToolDone { agent_id, tool_id });
        }
    }

    fn handle_wait_timer(&mut self, agent_id: AgentId, generation: u64) {
        let Some(agent) = self.registry.get_agent_mut(agent_id) else {
            return;
        };
        if agent.wait_timer.as_ref().map(|t| t.generation) != Some(generation) {
            return;
        }
        agent.wait_timer = None;
        self.apply(agent_id, Input::WaitTimerFired);
    }

    fn handle_tool_done(&mut self, agent_id: AgentId, tool_id: String, generation: u64) {
        let Some(agent) = self.registry.get_agent_mut(agent_id) else {
            return;
        };
        match agent.tool_done_timers.get(&tool_id) {
            Some(pending) if pending.timer.generation == generation => {}
            _ => return,
        }
        agent.tool_done_timers.remove(&tool_id);
        self.emit(MonitorEvent::AgentToolDone { agent_id, tool_id });
    }

    fn send_existing_agents(&mut self) {
        let mut events = vec![MonitorEvent::ExistingAgents {
            agent_ids: self.registry.agent_ids(),
        }];

        for agent in self.registry.agents() {
            for tool in &agent.activity.active_tools {
                events.push(MonitorEvent::AgentToolStart {
                    agent_id: agent.id,
                    tool_id: tool.tool_id.clone(),
                    status: tool.status.clone(),
                });
            }
            // Finished tools whose done is still due are replayed as started,
            // so the done that follows matches a start this observer saw.
            let mut pending: Vec<_> = agent.tool_done_timers.iter().collect();
            pending.sort_by(|a, b| a.0.cmp(b.0));
            for (tool_id, done) in pending {
                events.push(MonitorEvent::AgentToolStart {
                    agent_id: agent.id,
                    tool_id: tool_id.clone(),
                    status: done.status.clone(),
                });
            }
            if agent.activity.reported_status() == Some(AgentStatus::Waiting) {
                events.push(MonitorEvent::AgentStatus {
                    agent_id: agent.id,
                    status: AgentStatus::Waiting,
                });
            }
        }

        for event in events {
            self.emit(event);
        }
    }

    fn emit(&self, event: MonitorEvent) {
        trace!(
            component = "transcript_watcher",
            event = "transcript_watcher.emit",
            agent_id = ?event.agent_id(),
            "Emitting monitor event"
        );
        let _ = self.events_tx.send(event);
    }
}
