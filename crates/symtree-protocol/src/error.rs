//! Delivery queue errors.

/// Errors returned by [`crate::PayloadManager`].
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError
{
    /// The worker thread is gone, so the command could not be queued or
    /// acknowledged.
    #[error("Payload queue is closed")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
