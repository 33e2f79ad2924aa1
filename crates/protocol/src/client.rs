//! Host → Monitor commands

use serde::{Deserialize, Serialize};

use crate::types::HostId;

/// Lifecycle notifications sent by the host surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostCommand {
    HostOpened {
        host_id: HostId,
        #[serde(default)]
        name: String,
        cwd: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    HostClosed {
        host_id: HostId,
    },
    /// The host was started with a known session id and will write
    /// `<session_id>.jsonl` into its transcript directory.
    HostLaunched {
        host_id: HostId,
        session_id: String,
    },
    RequestExistingAgents,
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::HostCommand;
    use crate::types::HostId;

    #[test]
    fn deserializes_host_opened_without_optional_fields() {
        let json = r#"{"type":"host_opened","host_id":"term-1","cwd":"/tmp/project"}"#;

        let parsed: HostCommand = serde_json::from_str(json).expect("parse host_opened");
        assert_eq!(
            parsed,
            HostCommand::HostOpened {
                host_id: HostId::from("term-1"),
                name: String::new(),
                cwd: "/tmp/project".to_string(),
                session_id: None,
            }
        );
    }

    #[test]
    fn deserializes_unit_commands() {
        let parsed: HostCommand =
            serde_json::from_str(r#"{"type":"request_existing_agents"}"#).expect("parse");
        assert_eq!(parsed, HostCommand::RequestExistingAgents);

        let parsed: HostCommand = serde_json::from_str(r#"{"type":"shutdown"}"#).expect("parse");
        assert_eq!(parsed, HostCommand::Shutdown);
    }

    #[test]
    fn rejects_unknown_command() {
        let result = serde_json::from_str::<HostCommand>(r#"{"type":"focus_agent","id":3}"#);
        assert!(result.is_err());
    }
}
