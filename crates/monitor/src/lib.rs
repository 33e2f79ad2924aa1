//! agentwatch
//!
//! Watches the transcript files coding agents append to and reports, per
//! agent, whether it is working or waiting for input and which tools are
//! running.

pub mod claims;
pub mod config;
pub mod error;
pub mod logging;
pub mod paths;
pub mod record;
pub mod scanner;
pub mod state;
pub mod stdio;
pub mod tail;
pub mod tool_status;
pub mod transcript_watcher;
pub mod transition;
pub mod wake;

pub use config::MonitorConfig;
pub use error::MonitorError;
pub use transcript_watcher::{start_monitor, MonitorHandle, WatcherMessage, WatcherRuntime};
