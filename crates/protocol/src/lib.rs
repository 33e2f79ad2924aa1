//! agentwatch Protocol
//!
//! Types exchanged between the transcript monitor and the host that embeds it.
//! Both directions are serialized as one JSON object per line.

use uuid::Uuid;

pub mod client;
pub mod server;
pub mod types;

pub use client::HostCommand;
pub use server::MonitorEvent;
pub use types::*;

/// Generate a new host id for hosts that do not bring their own.
pub fn new_host_id() -> HostId {
    HostId::new(Uuid::new_v4().to_string())
}
