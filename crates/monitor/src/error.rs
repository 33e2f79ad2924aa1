use thiserror::Error;

/// Errors that can occur while servicing transcripts
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Transcript I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Monitor channel closed")]
    ChannelClosed,
}
