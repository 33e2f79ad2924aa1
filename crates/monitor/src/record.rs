//! Transcript record parsing
//!
//! Maps one JSONL transcript line onto an interpreter [`Input`]. Lines that are
//! not JSON, or whose shape carries no activity signal, yield `None`.

use serde::Deserialize;
use serde_json::Value;

use crate::transition::{Input, ToolInvocation};

/// System subtype the agent writes once a turn has fully ended.
const TURN_COMPLETE_SUBTYPE: &str = "turn_duration";

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawRecord {
    Assistant {
        #[serde(default)]
        message: Option<RawMessage>,
    },
    User {
        #[serde(default)]
        message: Option<RawMessage>,
    },
    System {
        #[serde(default)]
        subtype: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: Option<RawContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Blocks(Vec<RawBlock>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawBlock {
    ToolUse {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: Option<String>,
    },
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

pub fn parse_line(line: &str) -> Option<Input> {
    let record: RawRecord = serde_json::from_str(line).ok()?;
    match record {
        RawRecord::Assistant { message } => assistant_input(message?.content?),
        RawRecord::User { message } => user_input(message?.content?),
        RawRecord::System { subtype } => {
            (subtype.as_deref() == Some(TURN_COMPLETE_SUBTYPE)).then_some(Input::TurnEnded)
        }
        RawRecord::Other => None,
    }
}

fn assistant_input(content: RawContent) -> Option<Input> {
    let RawContent::Blocks(blocks) = content else {
        return None;
    };

    let mut tools = Vec::new();
    let mut has_text = false;
    for block in blocks {
        match block {
            RawBlock::ToolUse { id, name, input } => tools.push(ToolInvocation {
                id,
                name: name.unwrap_or_default(),
                input,
            }),
            RawBlock::Text { text } => has_text |= !text.trim().is_empty(),
            RawBlock::ToolResult { .. } | RawBlock::Other => {}
        }
    }

    if !tools.is_empty() {
        Some(Input::ToolsStarted(tools))
    } else if has_text {
        Some(Input::AssistantText)
    } else {
        None
    }
}

fn user_input(content: RawContent) -> Option<Input> {
    match content {
        RawContent::Text(text) => (!text.trim().is_empty()).then_some(Input::UserTurn),
        RawContent::Blocks(blocks) => {
            let mut saw_result = false;
            let mut tool_ids = Vec::new();
            for block in blocks {
                if let RawBlock::ToolResult { tool_use_id } = block {
                    saw_result = true;
                    tool_ids.extend(tool_use_id);
                }
            }
            if saw_result {
                Some(Input::ToolsFinished(tool_ids))
            } else {
                Some(Input::UserTurn)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Option<Input> {
        parse_line(&value.to_string())
    }

    #[test]
    fn assistant_tool_use_starts_tools() {
        let input = parse(json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "text", "text": "Let me look."},
                {"type": "tool_use", "id": "toolu_1", "name": "Read", "input": {"file_path": "/a/b.rs"}}
            ]}
        }));

        let Some(Input::ToolsStarted(tools)) = input else {
            panic!("expected ToolsStarted, got {input:?}");
        };
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].id.as_deref(), Some("toolu_1"));
        assert_eq!(tools[0].name, "Read");
        assert_eq!(tools[0].input["file_path"], "/a/b.rs");
    }

    #[test]
    fn assistant_text_only_arms_debounce() {
        let input = parse(json!({
            "type": "assistant",
            "message": {"content": [{"type": "text", "text": "Done."}]}
        }));
        assert!(matches!(input, Some(Input::AssistantText)));
    }

    #[test]
    fn assistant_thinking_only_is_ignored() {
        let input = parse(json!({
            "type": "assistant",
            "message": {"content": [{"type": "thinking", "thinking": "hmm", "signature": "x"}]}
        }));
        assert!(input.is_none());
    }

    #[test]
    fn user_tool_results_collect_ids() {
        let input = parse(json!({
            "type": "user",
            "message": {"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "toolu_1", "content": "ok"},
                {"type": "tool_result", "tool_use_id": "toolu_2", "content": [{"type": "text", "text": "ok"}]}
            ]}
        }));

        let Some(Input::ToolsFinished(ids)) = input else {
            panic!("expected ToolsFinished, got {input:?}");
        };
        assert_eq!(ids, vec!["toolu_1", "toolu_2"]);
    }

    #[test]
    fn user_prompt_starts_new_turn() {
        let string_prompt = parse(json!({
            "type": "user",
            "message": {"role": "user", "content": "fix the tests"}
        }));
        assert!(matches!(string_prompt, Some(Input::UserTurn)));

        let block_prompt = parse(json!({
            "type": "user",
            "message": {"role": "user", "content": [{"type": "text", "text": "and lint"}]}
        }));
        assert!(matches!(block_prompt, Some(Input::UserTurn)));
    }

    #[test]
    fn empty_user_string_is_ignored() {
        let input = parse(json!({"type": "user", "message": {"content": "  "}}));
        assert!(input.is_none());
    }

    #[test]
    fn turn_duration_ends_turn() {
        let input = parse(json!({"type": "system", "subtype": "turn_duration", "durationMs": 5120}));
        assert!(matches!(input, Some(Input::TurnEnded)));

        let other = parse(json!({"type": "system", "subtype": "compact_boundary"}));
        assert!(other.is_none());
    }

    #[test]
    fn unknown_and_malformed_lines_are_ignored() {
        assert!(parse(json!({"type": "progress", "data": {}})).is_none());
        assert!(parse(json!({"type": "file-history-snapshot", "snapshot": {}})).is_none());
        assert!(parse(json!({"message": "no discriminant"})).is_none());
        assert!(parse_line("{not json").is_none());
        assert!(parse_line("").is_none());
    }
}
