/// Errors reported by a transport client.
///
/// String payloads carry the underlying transport message. They are
/// diagnostic text; callers should not match on their content.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Publisher unreachable at {0}")]
    Unreachable(String),
    #[error("Subscription rejected: {0}")]
    Rejected(String),
    #[error("Transport closed")]
    Closed,

    #[error("An unknown error occurred: {0}")]
    Other(anyhow::Error),
}
