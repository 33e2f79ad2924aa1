//! Monitor configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::paths::resolve_projects_root;

pub const DEFAULT_MAX_FILE_AGE_SECS: u64 = 600;
pub const DEFAULT_WAIT_DEBOUNCE_MS: u64 = 2_000;

const SCAN_INTERVAL_MS: u64 = 1_000;
const POLL_INTERVAL_MS: u64 = 2_000;
const TOOL_DONE_DELAY_MS: u64 = 300;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Directory containing one transcript directory per working directory
    pub projects_root: PathBuf,
    /// Unclaimed files older than this are not adopted. `None` adopts any age.
    pub max_file_age: Option<Duration>,
    /// Period of the per-host directory scan
    pub scan_interval: Duration,
    /// Period of the per-agent backstop poll
    pub poll_interval: Duration,
    /// Quiet period after a text-only reply before reporting "waiting"
    pub wait_debounce: Duration,
    /// Delay between a tool result and the tool-done event
    pub tool_done_delay: Duration,
}

impl MonitorConfig {
    pub fn new(projects_root: PathBuf) -> Self {
        Self {
            projects_root,
            max_file_age: max_file_age_from_secs(DEFAULT_MAX_FILE_AGE_SECS),
            scan_interval: Duration::from_millis(SCAN_INTERVAL_MS),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            wait_debounce: Duration::from_millis(DEFAULT_WAIT_DEBOUNCE_MS),
            tool_done_delay: Duration::from_millis(TOOL_DONE_DELAY_MS),
        }
    }

    pub fn with_max_file_age_secs(mut self, secs: u64) -> Self {
        self.max_file_age = max_file_age_from_secs(secs);
        self
    }

    pub fn with_wait_debounce(mut self, debounce: Duration) -> Self {
        self.wait_debounce = debounce;
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new(resolve_projects_root(None))
    }
}

/// `0` means unlimited.
pub fn max_file_age_from_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_age_means_unlimited() {
        assert_eq!(max_file_age_from_secs(0), None);
        assert_eq!(max_file_age_from_secs(90), Some(Duration::from_secs(90)));
    }

    #[test]
    fn defaults_match_reference_timings() {
        let config = MonitorConfig::new(PathBuf::from("/tmp/projects"));
        assert_eq!(config.max_file_age, Some(Duration::from_secs(600)));
        assert_eq!(config.scan_interval, Duration::from_secs(1));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.wait_debounce, Duration::from_secs(2));
        assert_eq!(config.tool_done_delay, Duration::from_millis(300));

        let config = config.with_max_file_age_secs(0);
        assert_eq!(config.max_file_age, None);
    }
}
