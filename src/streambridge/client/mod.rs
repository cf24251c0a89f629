//! Client-side building blocks: the cacheable client identity
//! ([`ClientDescriptor`]), construction customizers, the connection-provider
//! boundary behind which the real broker transport lives, and the message
//! envelopes exchanged with handles.

mod customizer;
mod descriptor;
mod error;
mod message;
mod provider;

pub use customizer::{ClientCustomizer, ClientSettings, PropertyCustomizer};
pub use descriptor::ClientDescriptor;
pub use error::ClientError;
pub use message::{InboundMessage, OutboundMessage};
pub use provider::{ConnectionProvider, ConsumerClient, ProducerClient};
