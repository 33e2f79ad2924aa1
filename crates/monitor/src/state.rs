//! Agent registry
//!
//! Single owner of every mutable map: hosts, agents and the claim set. Lives
//! inside the event loop; nothing else holds a reference across an await.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use agentwatch_protocol::{AgentId, HostId};
use tokio::task::JoinHandle;

use crate::claims::ClaimRegistry;
use crate::tail::TranscriptTail;
use crate::transition::ActivityState;
use crate::wake::{AgentWake, Timer};

/// A terminal-like session host under observation
pub struct HostState {
    pub id: HostId,
    pub name: String,
    pub cwd: PathBuf,
    pub transcript_dir: PathBuf,
    /// Session id the host is known to write `<id>.jsonl` for
    pub session_id: Option<String>,
    pub scan_task: Option<JoinHandle<()>>,
}

impl HostState {
    pub fn new(id: HostId, name: String, cwd: PathBuf, transcript_dir: PathBuf) -> Self {
        Self {
            id,
            name,
            cwd,
            transcript_dir,
            session_id: None,
            scan_task: None,
        }
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.scan_task.take() {
            task.abort();
        }
    }
}

/// A finished tool whose done event has not been emitted yet
pub struct PendingToolDone {
    /// Status line the tool was started with, for resync replay
    pub status: String,
    pub timer: Timer,
}

/// One tracked agent run, bound to exactly one transcript file
pub struct AgentState {
    pub id: AgentId,
    pub host_id: HostId,
    pub transcript_path: PathBuf,
    pub tail: TranscriptTail,
    pub activity: ActivityState,
    pub wait_timer: Option<Timer>,
    pub tool_done_timers: HashMap<String, PendingToolDone>,
    pub wake: Option<AgentWake>,
}

impl AgentState {
    fn new(id: AgentId, host_id: HostId, transcript_path: PathBuf) -> Self {
        Self {
            id,
            host_id,
            transcript_path,
            tail: TranscriptTail::new(),
            activity: ActivityState::default(),
            wait_timer: None,
            tool_done_timers: HashMap::new(),
            wake: None,
        }
    }

    pub fn cancel_wait_timer(&mut self) {
        if let Some(timer) = self.wait_timer.take() {
            timer.cancel();
        }
    }

    pub fn cancel_tool_done_timers(&mut self) {
        for (_, pending) in self.tool_done_timers.drain() {
            pending.timer.cancel();
        }
    }

    /// Cancel every timer and wake source this agent owns.
    pub fn cancel_all(&mut self) {
        self.cancel_wait_timer();
        self.cancel_tool_done_timers();
        if let Some(wake) = self.wake.take() {
            wake.cancel();
        }
    }
}

#[derive(Default)]
pub struct AgentRegistry {
    hosts: HashMap<HostId, HostState>,
    agents: BTreeMap<AgentId, AgentState>,
    claims: ClaimRegistry,
    last_agent_id: u64,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Hosts --

    pub fn add_host(&mut self, host: HostState) {
        self.hosts.insert(host.id.clone(), host);
    }

    pub fn has_host(&self, id: &HostId) -> bool {
        self.hosts.contains_key(id)
    }

    pub fn get_host(&self, id: &HostId) -> Option<&HostState> {
        self.hosts.get(id)
    }

    pub fn get_host_mut(&mut self, id: &HostId) -> Option<&mut HostState> {
        self.hosts.get_mut(id)
    }

    pub fn remove_host(&mut self, id: &HostId) -> Option<HostState> {
        self.hosts.remove(id)
    }

    pub fn host_ids(&self) -> Vec<HostId> {
        self.hosts.keys().cloned().collect()
    }

    // -- Claims --

    pub fn claims(&self) -> &ClaimRegistry {
        &self.claims
    }

    pub fn claims_mut(&mut self) -> &mut ClaimRegistry {
        &mut self.claims
    }

    // -- Agents --

    /// Create an agent for a transcript the caller has already claimed.
    pub fn create_agent(&mut self, host_id: HostId, transcript_path: PathBuf) -> AgentId {
        self.last_agent_id += 1;
        let id = AgentId(self.last_agent_id);
        self.agents
            .insert(id, AgentState::new(id, host_id, transcript_path));
        id
    }

    pub fn get_agent(&self, id: AgentId) -> Option<&AgentState> {
        self.agents.get(&id)
    }

    pub fn get_agent_mut(&mut self, id: AgentId) -> Option<&mut AgentState> {
        self.agents.get_mut(&id)
    }

    /// Remove an agent and release its claim. Timers must already be cancelled.
    pub fn remove_agent(&mut self, id: AgentId) -> Option<AgentState> {
        let agent = self.agents.remove(&id)?;
        self.claims.release(&agent.transcript_path);
        Some(agent)
    }

    /// All live agent ids, ascending.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn agents_for_host(&self, host_id: &HostId) -> Vec<AgentId> {
        self.agents
            .values()
            .filter(|agent| &agent.host_id == host_id)
            .map(|agent| agent.id)
            .collect()
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentState> {
        self.agents.values()
    }
}
