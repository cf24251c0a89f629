/// Error type for client cache operations.
///
/// `Clone` so the one in-flight construction outcome can be delivered
/// identically to every waiting caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The connection provider failed to build the client. The cache entry
    /// is rolled back; the cache does not retry on its own.
    ConstructionFailed(String),
    /// Operation attempted after `shutdown`.
    Closed,
    /// Acquire/release pairing was violated by the caller.
    InvariantViolation(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::ConstructionFailed(msg) => {
                write!(f, "Failed to construct client: {}", msg)
            }
            CacheError::Closed => write!(f, "Client cache is closed"),
            CacheError::InvariantViolation(msg) => {
                write!(f, "Cache invariant violated: {}", msg)
            }
        }
    }
}

impl std::error::Error for CacheError {}
