//! Human-readable status line for a tool invocation.

use serde_json::Value;

const COMMAND_DISPLAY_MAX_CHARS: usize = 30;

/// Status shown while a tool runs. Total and pure: any name and any input
/// produce a line.
pub fn format_tool_status(tool_name: &str, input: &Value) -> String {
    match tool_name {
        "Read" => with_file("Reading", input),
        "Edit" | "MultiEdit" => with_file("Editing", input),
        "Write" => with_file("Writing", input),
        "NotebookEdit" => "Editing notebook".to_string(),
        "Bash" => {
            let command = get_str(input, "command").unwrap_or_default();
            format!("Running: {}", truncate_command(command))
        }
        "Glob" => "Searching files".to_string(),
        "Grep" => "Searching code".to_string(),
        "WebFetch" => "Fetching web content".to_string(),
        "WebSearch" => "Searching the web".to_string(),
        "Task" | "Agent" => "Running subtask".to_string(),
        "TodoWrite" => "Updating plan".to_string(),
        "EnterPlanMode" | "ExitPlanMode" => "Planning".to_string(),
        "AskUserQuestion" => "Waiting for your answer".to_string(),
        "" => "Using tool".to_string(),
        other => format!("Using {other}"),
    }
}

fn with_file(verb: &str, input: &Value) -> String {
    match get_str(input, "file_path")
        .or_else(|| get_str(input, "notebook_path"))
        .map(basename)
        .filter(|name| !name.is_empty())
    {
        Some(name) => format!("{verb} {name}"),
        None => format!("{verb} file"),
    }
}

fn get_str<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

/// Last path component, for either separator style.
fn basename(path: &str) -> &str {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path)
}

fn truncate_command(command: &str) -> String {
    let single_line = command.replace('\n', " ");
    if single_line.chars().count() > COMMAND_DISPLAY_MAX_CHARS {
        let cut: String = single_line.chars().take(COMMAND_DISPLAY_MAX_CHARS).collect();
        format!("{cut}…")
    } else {
        single_line
    }
}
