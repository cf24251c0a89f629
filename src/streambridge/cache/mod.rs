//! Pooled client caching.
//!
//! [`ClientCache`] maps a [`ClientDescriptor`] to a lazily-created,
//! reference-counted client handle: at most one live client per unique
//! descriptor, at most one in-flight construction per descriptor, idle-time
//! eviction with LRU ordering under capacity pressure, and closure of
//! evicted handles through the connection provider.
//!
//! Bookkeeping (the descriptor map, reference counts, access times) is
//! serialized under a single lock that is never held across an await;
//! construction and close calls always run outside it.
//!
//! [`ClientDescriptor`]: crate::streambridge::client::ClientDescriptor

mod client_cache;
mod clock;
mod error;
mod lease;

pub use client_cache::ClientCache;
pub use clock::{Clock, SystemClock};
pub use error::CacheError;
pub use lease::Lease;
