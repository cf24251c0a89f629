use std::time::Duration;

use async_trait::async_trait;

use super::descriptor::ClientDescriptor;
use super::error::ClientError;
use super::message::{InboundMessage, OutboundMessage};

/// Boundary to the broker transport: builds and tears down live client
/// handles from a full descriptor.
///
/// `construct` may block for the duration of a real network handshake; the
/// cache guarantees it is never invoked under a cache-wide lock and at most
/// once per descriptor while an entry is live. `close` is best-effort:
/// failures are logged by the cache, never propagated.
#[async_trait]
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Opaque live resource representing a constructed producer/consumer.
    type Handle: Send + Sync + 'static;

    async fn construct(&self, descriptor: &ClientDescriptor)
        -> Result<Self::Handle, ClientError>;

    async fn close(&self, handle: &Self::Handle) -> Result<(), ClientError>;
}

/// Operation surface of a producer handle.
#[async_trait]
pub trait ProducerClient: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), ClientError>;

    /// Flushes buffered messages. Default is a no-op for unbuffered clients.
    async fn flush(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Operation surface of a consumer handle.
#[async_trait]
pub trait ConsumerClient: Send + Sync {
    /// Waits up to `timeout` for the next message.
    ///
    /// Returns [`ClientError::Timeout`] when no message arrives in time.
    async fn receive(&self, timeout: Duration) -> Result<InboundMessage, ClientError>;
}
