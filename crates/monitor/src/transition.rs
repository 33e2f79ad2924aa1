//! Pure activity transition function
//!
//! All status logic for one agent lives here as a pure, synchronous function:
//! `transition(state, agent_id, input) -> (state, effects)`.
//! No IO, no timers, no async. The event loop executes the effects.

use agentwatch_protocol::{AgentId, AgentStatus, MonitorEvent};
use serde_json::Value;

use crate::tool_status::format_tool_status;

// ---------------------------------------------------------------------------
// ActivityState: per-agent interpreter state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTool {
    pub tool_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityState {
    /// Open tool invocations in the order they started
    pub active_tools: Vec<ActiveTool>,
    pub waiting: bool,
}

impl ActivityState {
    pub fn has_tool(&self, tool_id: &str) -> bool {
        self.active_tools.iter().any(|t| t.tool_id == tool_id)
    }

    /// Status an observer should currently see, if any has been established.
    pub fn reported_status(&self) -> Option<AgentStatus> {
        if !self.active_tools.is_empty() {
            Some(AgentStatus::Active)
        } else if self.waiting {
            Some(AgentStatus::Waiting)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Input: one variant per recognized transcript record, plus timer firings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: Option<String>,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Assistant record carrying at least one tool invocation
    ToolsStarted(Vec<ToolInvocation>),
    /// Assistant record with text but no tool invocation
    AssistantText,
    /// User record carrying tool results, by invocation id
    ToolsFinished(Vec<String>),
    /// A new user prompt
    UserTurn,
    /// Authoritative end-of-turn record
    TurnEnded,
    /// The text debounce elapsed without being cancelled
    WaitTimerFired,
}

// ---------------------------------------------------------------------------
// Effects: describe timers and emissions for the caller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Emit(MonitorEvent),
    /// Start the wait debounce, replacing any pending one
    ArmWaitTimer,
    CancelWaitTimer,
    /// Emit tool-done for this id after the tool-done delay. `status` is the
    /// line the tool was started with.
    ScheduleToolDone { tool_id: String, status: String },
    /// Drop every pending tool-done emission
    CancelToolDone,
}

pub fn transition(
    mut state: ActivityState,
    agent_id: AgentId,
    input: Input,
) -> (ActivityState, Vec<Effect>) {
    let mut effects = Vec::new();

    match input {
        Input::ToolsStarted(tools) => {
            effects.push(Effect::CancelWaitTimer);
            state.waiting = false;
            effects.push(status(agent_id, AgentStatus::Active));

            for tool in tools {
                let Some(tool_id) = tool.id else {
                    continue;
                };
                if state.has_tool(&tool_id) {
                    continue;
                }
                let status = format_tool_status(&tool.name, &tool.input);
                state.active_tools.push(ActiveTool {
                    tool_id: tool_id.clone(),
                    status: status.clone(),
                });
                effects.push(Effect::Emit(MonitorEvent::AgentToolStart {
                    agent_id,
                    tool_id,
                    status,
                }));
            }
        }

        Input::AssistantText => {
            effects.push(Effect::ArmWaitTimer);
        }

        Input::ToolsFinished(tool_ids) => {
            for tool_id in tool_ids {
                let Some(index) = state.active_tools.iter().position(|t| t.tool_id == tool_id)
                else {
                    continue;
                };
                let tool = state.active_tools.remove(index);
                effects.push(Effect::ScheduleToolDone {
                    tool_id,
                    status: tool.status,
                });
            }
        }

        Input::UserTurn => {
            effects.push(Effect::CancelWaitTimer);
            effects.push(Effect::CancelToolDone);
            state.active_tools.clear();
            state.waiting = false;
            effects.push(Effect::Emit(MonitorEvent::AgentToolsClear { agent_id }));
            effects.push(status(agent_id, AgentStatus::Active));
        }

        Input::TurnEnded => {
            effects.push(Effect::CancelWaitTimer);
            if !state.active_tools.is_empty() {
                state.active_tools.clear();
                effects.push(Effect::CancelToolDone);
                effects.push(Effect::Emit(MonitorEvent::AgentToolsClear { agent_id }));
            }
            state.waiting = true;
            effects.push(status(agent_id, AgentStatus::Waiting));
        }

        Input::WaitTimerFired => {
            // Running tools keep the agent active; an already reported wait
            // is not repeated.
            if state.active_tools.is_empty() && !state.waiting {
                state.waiting = true;
                effects.push(status(agent_id, AgentStatus::Waiting));
            }
        }
    }

    (state, effects)
}

fn status(agent_id: AgentId, status: AgentStatus) -> Effect {
    Effect::Emit(MonitorEvent::AgentStatus { agent_id, status })
}
