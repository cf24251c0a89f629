use std::ops::Deref;
use std::sync::Arc;

use log::error;

use crate::streambridge::client::{ClientDescriptor, ConnectionProvider};

use super::client_cache::ClientCache;
use super::error::CacheError;

/// RAII grip on a pooled client handle.
///
/// Dropping the lease returns the handle to the cache on every exit path —
/// success, error or cancellation — without closing it; the cache decides
/// when the underlying client is actually torn down.
pub struct Lease<P: ConnectionProvider> {
    cache: ClientCache<P>,
    descriptor: ClientDescriptor,
    handle: Arc<P::Handle>,
    released: bool,
}

impl<P: ConnectionProvider> Lease<P> {
    pub(super) fn new(
        cache: ClientCache<P>,
        descriptor: ClientDescriptor,
        handle: Arc<P::Handle>,
    ) -> Self {
        Lease {
            cache,
            descriptor,
            handle,
            released: false,
        }
    }

    pub fn handle(&self) -> &P::Handle {
        &self.handle
    }

    pub fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    /// Releases eagerly, surfacing any pairing violation instead of logging
    /// it from `Drop`.
    pub fn release(mut self) -> Result<(), CacheError> {
        self.released = true;
        self.cache.release(&self.descriptor)
    }
}

impl<P: ConnectionProvider> Deref for Lease<P> {
    type Target = P::Handle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl<P: ConnectionProvider> Drop for Lease<P> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(err) = self.cache.release(&self.descriptor) {
                error!(
                    "Failed to release client lease for destination '{}': {}",
                    self.descriptor.destination(),
                    err
                );
            }
        }
    }
}
