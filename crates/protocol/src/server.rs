//! Monitor → Host events

use serde::{Deserialize, Serialize};

use crate::types::{AgentId, AgentStatus, HostId};

/// Status and lifecycle events emitted by the monitor, keyed by agent id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    // Lifecycle
    AgentCreated {
        agent_id: AgentId,
        host_id: HostId,
        transcript_path: String,
    },
    AgentClosed {
        agent_id: AgentId,
    },

    // Activity
    AgentStatus {
        agent_id: AgentId,
        status: AgentStatus,
    },
    AgentToolStart {
        agent_id: AgentId,
        tool_id: String,
        status: String,
    },
    AgentToolDone {
        agent_id: AgentId,
        tool_id: String,
    },
    AgentToolsClear {
        agent_id: AgentId,
    },

    // Full resync, ids ascending
    ExistingAgents {
        agent_ids: Vec<AgentId>,
    },
}

impl MonitorEvent {
    /// The agent this event is about, if it concerns a single agent.
    pub fn agent_id(&self) -> Option<AgentId> {
        match self {
            MonitorEvent::AgentCreated { agent_id, .. }
            | MonitorEvent::AgentClosed { agent_id }
            | MonitorEvent::AgentStatus { agent_id, .. }
            | MonitorEvent::AgentToolStart { agent_id, .. }
            | MonitorEvent::AgentToolDone { agent_id, .. }
            | MonitorEvent::AgentToolsClear { agent_id } => Some(*agent_id),
            MonitorEvent::ExistingAgents { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MonitorEvent;
    use crate::types::*;

    #[test]
    fn serializes_status_with_snake_case_tags() {
        let event = MonitorEvent::AgentStatus {
            agent_id: AgentId(3),
            status: AgentStatus::Waiting,
        };

        let json = serde_json::to_value(&event).expect("serialize status");
        assert_eq!(
            json,
            serde_json::json!({"type": "agent_status", "agent_id": 3, "status": "waiting"})
        );
    }

    #[test]
    fn existing_agents_carries_plain_ids() {
        let event = MonitorEvent::ExistingAgents {
            agent_ids: vec![AgentId(1), AgentId(4)],
        };

        let json = serde_json::to_string(&event).expect("serialize snapshot");
        assert_eq!(json, r#"{"type":"existing_agents","agent_ids":[1,4]}"#);
        assert_eq!(event.agent_id(), None);
    }
}
