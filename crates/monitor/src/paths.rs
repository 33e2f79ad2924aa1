//! Central path resolution for transcripts and agentwatch's own files.
//!
//! Transcript root: CLI `--projects-dir` > `AGENTWATCH_PROJECTS_DIR` env > `~/.claude/projects`.
//! Data dir (logs): CLI `--data-dir` > `AGENTWATCH_DATA_DIR` env > `~/.agentwatch`.

use std::path::{Path, PathBuf};

const TRANSCRIPT_EXTENSION: &str = "jsonl";

/// Resolve the directory holding one transcript directory per working directory.
pub fn resolve_projects_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Ok(env_val) = std::env::var("AGENTWATCH_PROJECTS_DIR") {
        return PathBuf::from(env_val);
    }
    home_dir().join(".claude").join("projects")
}

/// Resolve agentwatch's own data directory.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Ok(env_val) = std::env::var("AGENTWATCH_DATA_DIR") {
        return PathBuf::from(env_val);
    }
    home_dir().join(".agentwatch")
}

pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(std::env::temp_dir)
}

/// Directory name the agent process uses for a working directory:
/// every path separator and drive colon becomes `-`.
pub fn project_dir_name(cwd: &Path) -> String {
    cwd.to_string_lossy()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            other => other,
        })
        .collect()
}

/// Transcript directory for a working directory.
pub fn transcript_dir(projects_root: &Path, cwd: &Path) -> PathBuf {
    projects_root.join(project_dir_name(cwd))
}

/// File name of the transcript a session with a known id writes.
pub fn transcript_file_name(session_id: &str) -> String {
    format!("{session_id}.{TRANSCRIPT_EXTENSION}")
}

pub fn is_transcript_path(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some(TRANSCRIPT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_dir_name_replaces_separators() {
        assert_eq!(
            project_dir_name(Path::new("/Users/me/code/app")),
            "-Users-me-code-app"
        );
        assert_eq!(
            project_dir_name(Path::new(r"C:\Users\me\app")),
            "C--Users-me-app"
        );
    }

    #[test]
    fn transcript_dir_joins_encoded_cwd() {
        let dir = transcript_dir(Path::new("/home/me/.claude/projects"), Path::new("/srv/repo"));
        assert_eq!(dir, PathBuf::from("/home/me/.claude/projects/-srv-repo"));
    }

    #[test]
    fn transcript_file_name_uses_jsonl_extension() {
        let name = transcript_file_name("0b4c-11ef");
        assert_eq!(name, "0b4c-11ef.jsonl");
        assert!(is_transcript_path(Path::new(&name)));
        assert!(!is_transcript_path(Path::new("notes.json")));
    }

    #[test]
    fn explicit_dirs_take_priority() {
        let explicit = Path::new("/opt/transcripts");
        assert_eq!(resolve_projects_root(Some(explicit)), explicit);
        assert_eq!(log_dir(Path::new("/opt/aw")), PathBuf::from("/opt/aw/logs"));
    }
}
