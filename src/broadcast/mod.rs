pub mod job;
pub mod pusher;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("invalid channel name {0:?}")]
    InvalidChannel(String),

    #[error("invalid event name {0:?}")]
    InvalidEvent(String),

    #[error("payload is {size} bytes, limit is {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("failed to encode broadcast body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("broadcast request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("broadcast rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Publishes events to subscribers of a real-time channel.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn trigger(&self, channel: &str, event: &str, data: &str) -> Result<(), BroadcastError>;
}
