//! Directory scanner and recency filter.
//!
//! One scan per host tick: first the deterministic claim of the transcript a
//! known session id names, then opportunistic adoption of every other unclaimed
//! transcript young enough to pass the recency filter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::claims::ClaimRegistry;
use crate::paths::{is_transcript_path, transcript_file_name};

/// Whether an unclaimed transcript may be adopted at `now`.
///
/// A file that cannot be stat'ed is never eligible, whatever the threshold.
pub fn is_eligible(path: &Path, max_age: Option<Duration>, now: SystemTime) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    let Some(max_age) = max_age else {
        return true;
    };
    let Ok(modified) = meta.modified() else {
        return false;
    };
    let Ok(age) = now.duration_since(modified) else {
        return true;
    };
    age < max_age
}

/// Transcript files directly inside `dir`, sorted by path.
pub fn list_transcripts(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_file() && is_transcript_path(&path) {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Run one scan of `dir` and return the paths newly claimed, in claim order.
pub fn scan(
    dir: &Path,
    session_id: Option<&str>,
    claims: &mut ClaimRegistry,
    max_age: Option<Duration>,
    now: SystemTime,
) -> Vec<PathBuf> {
    let mut claimed = Vec::new();

    if let Some(session_id) = session_id {
        let expected = dir.join(transcript_file_name(session_id));
        if expected.is_file() && claims.try_claim(&expected) {
            debug!(
                component = "scanner",
                event = "scanner.claimed_known_session",
                path = %expected.display(),
                "Claimed transcript for known session id"
            );
            claimed.push(expected);
        }
    }

    let files = match list_transcripts(dir) {
        Ok(files) => files,
        Err(err) => {
            debug!(
                component = "scanner",
                event = "scanner.list_failed",
                path = %dir.display(),
                error = %err,
                "Transcript directory not readable, retrying next tick"
            );
            return claimed;
        }
    };

    for path in files {
        if claims.is_claimed(&path) || !is_eligible(&path, max_age, now) {
            continue;
        }
        if claims.try_claim(&path) {
            debug!(
                component = "scanner",
                event = "scanner.adopted_recent",
                path = %path.display(),
                "Adopted recent unclaimed transcript"
            );
            claimed.push(path);
        }
    }

    claimed
}
