use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider acknowledgement of an accepted outbound message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Ack {
    pub message_id: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotificationError {
    #[error("Messaging provider is not configured")]
    NotConfigured,

    #[error("Recipient has no phone number")]
    MissingPhone,

    #[error("Messaging provider rejected the message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Messaging provider unreachable: {0}")]
    Transport(String),

    #[error("Notification timed out after {0} seconds")]
    Timeout(u64),
}

/// Outbound messaging port. Implementations are built from explicit
/// configuration and shared behind an `Arc`.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<Ack, NotificationError>;
}
