//! Incremental transcript reader.
//!
//! Tracks how many bytes of a growing file have been consumed and keeps the
//! unterminated trailing fragment until the writer finishes the line.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::MonitorError;

#[derive(Debug, Default)]
pub struct TranscriptTail {
    offset: u64,
    partial: Vec<u8>,
}

impl TranscriptTail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes read past the last newline.
    pub fn partial_len(&self) -> usize {
        self.partial.len()
    }

    /// Read everything appended since the last pump and return the complete,
    /// non-blank lines in file order.
    ///
    /// A file that is no larger than the consumed offset is left alone. On
    /// error neither the offset nor the carried fragment changes.
    pub fn pump(&mut self, path: &Path) -> Result<Vec<String>, MonitorError> {
        let size = fs::metadata(path)?.len();
        if size <= self.offset {
            return Ok(Vec::new());
        }

        let chunk = read_range(path, self.offset, size)?;
        if chunk.is_empty() {
            return Ok(Vec::new());
        }
        self.offset += chunk.len() as u64;
        self.partial.extend_from_slice(&chunk);

        let Some(last_newline) = self.partial.iter().rposition(|b| *b == b'\n') else {
            return Ok(Vec::new());
        };
        let rest = self.partial.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial, rest);

        Ok(complete
            .split(|b| *b == b'\n')
            .filter_map(|raw| {
                let line = String::from_utf8_lossy(raw);
                let line = line.trim();
                if line.is_empty() {
                    None
                } else {
                    Some(line.to_string())
                }
            })
            .collect())
    }
}

fn read_range(path: &Path, start: u64, end: u64) -> Result<Vec<u8>, MonitorError> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start))?;
    let mut buf = Vec::with_capacity((end - start) as usize);
    file.take(end - start).read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn append(path: &Path, bytes: &[u8]) {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .expect("open transcript")
            .write_all(bytes)
            .expect("append transcript");
    }

    #[test]
    fn returns_complete_lines_and_carries_fragment() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("t.jsonl");
        append(&path, b"{\"a\":1}\n{\"b\":");

        let mut tail = TranscriptTail::new();
        let lines = tail.pump(&path).expect("pump");
        assert_eq!(lines, vec![r#"{"a":1}"#]);
        assert_eq!(tail.offset(), 13);
        assert_eq!(tail.partial_len(), 5);

        append(&path, b"2}\n");
        let lines = tail.pump(&path).expect("pump");
        assert_eq!(lines, vec![r#"{"b":2}"#]);
        assert_eq!(tail.partial_len(), 0);
    }

    #[test]
    fn redundant_pumps_are_no_ops() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("t.jsonl");
        append(&path, b"one\n");

        let mut tail = TranscriptTail::new();
        assert_eq!(tail.pump(&path).expect("pump"), vec!["one"]);
        assert!(tail.pump(&path).expect("pump").is_empty());
        assert!(tail.pump(&path).expect("pump").is_empty());
        assert_eq!(tail.offset(), 4);
    }

    #[test]
    fn skips_blank_lines_and_strips_carriage_returns() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("t.jsonl");
        append(&path, b"one\r\n\n   \ntwo\n");

        let mut tail = TranscriptTail::new();
        assert_eq!(tail.pump(&path).expect("pump"), vec!["one", "two"]);
    }

    #[test]
    fn truncated_file_does_not_rewind() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("t.jsonl");
        append(&path, b"first line\n");

        let mut tail = TranscriptTail::new();
        tail.pump(&path).expect("pump");
        fs::write(&path, b"x\n").expect("truncate");

        assert!(tail.pump(&path).expect("pump").is_empty());
        assert_eq!(tail.offset(), 11);
    }

    #[test]
    fn missing_file_errors_without_moving_offset() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("t.jsonl");
        append(&path, b"one\ntw");

        let mut tail = TranscriptTail::new();
        tail.pump(&path).expect("pump");
        fs::remove_file(&path).expect("remove");

        assert!(tail.pump(&path).is_err());
        assert_eq!(tail.offset(), 6);
        assert_eq!(tail.partial_len(), 2);
    }

    #[test]
    fn multibyte_characters_split_across_reads_survive() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("t.jsonl");
        let text = "{\"text\":\"héllo – wörld\"}\n".as_bytes();
        let mut tail = TranscriptTail::new();
        let mut lines = Vec::new();

        // Feed one byte at a time, cutting every multi-byte sequence.
        for byte in text {
            append(&path, std::slice::from_ref(byte));
            lines.extend(tail.pump(&path).expect("pump"));
        }

        assert_eq!(lines, vec!["{\"text\":\"héllo – wörld\"}"]);
        assert_eq!(tail.offset(), text.len() as u64);
    }

    #[test]
    fn arbitrary_chunking_reproduces_every_line() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("t.jsonl");
        let expected: Vec<String> = (0..40).map(|i| format!("{{\"n\":{i}}}")).collect();
        let stream = expected.join("\n") + "\n";
        let bytes = stream.as_bytes();

        let mut tail = TranscriptTail::new();
        let mut seen = Vec::new();
        let mut start = 0;
        let mut step = 1;
        while start < bytes.len() {
            let end = (start + step).min(bytes.len());
            append(&path, &bytes[start..end]);
            seen.extend(tail.pump(&path).expect("pump"));
            start = end;
            step = step % 17 + 3;
        }

        assert_eq!(seen, expected);
        assert_eq!(tail.offset(), bytes.len() as u64);
        assert_eq!(tail.partial_len(), 0);
    }
}
