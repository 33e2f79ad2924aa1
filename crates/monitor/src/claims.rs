//! Session claim registry
//!
//! The set of transcript paths currently owned by an agent. A path is owned by
//! at most one agent; the first caller to claim it wins.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct ClaimRegistry {
    claimed: HashSet<PathBuf>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path`. Returns false if another agent already owns it.
    pub fn try_claim(&mut self, path: &Path) -> bool {
        if self.claimed.contains(path) {
            return false;
        }
        self.claimed.insert(path.to_path_buf())
    }

    /// Release `path`. Releasing an unclaimed path is a no-op.
    pub fn release(&mut self, path: &Path) {
        self.claimed.remove(path);
    }

    pub fn is_claimed(&self, path: &Path) -> bool {
        self.claimed.contains(path)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
