/// Unified error type for connection-provider and client-handle operations.
///
/// `Clone` so a single construction failure can be delivered identically to
/// every caller waiting on the same in-flight construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The connection provider failed to build a client handle.
    ConstructionFailed(String),
    /// Closing a client handle failed.
    CloseFailed(String),
    /// A send operation failed.
    SendFailed(String),
    /// A receive operation failed.
    ReceiveFailed(String),
    /// Operation timed out.
    Timeout,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::ConstructionFailed(msg) => {
                write!(f, "Failed to construct client: {}", msg)
            }
            ClientError::CloseFailed(msg) => write!(f, "Failed to close client: {}", msg),
            ClientError::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            ClientError::ReceiveFailed(msg) => write!(f, "Receive failed: {}", msg),
            ClientError::Timeout => write!(f, "Timeout waiting for operation"),
        }
    }
}

impl std::error::Error for ClientError {}
