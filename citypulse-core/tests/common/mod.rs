//! Shared helpers for integration tests.

use std::sync::Arc;

use citypulse_core::platform::memory::{MemoryHost, MemoryKeyValueStore, MemorySecureStore};
use citypulse_core::platform::{KeyValueStore, PlatformHost, SecureStore};
use citypulse_core::SessionContext;

/// One simulated device: durable storage, secure storage, and an app shell
/// that all outlive individual session contexts, so tests can "restart the
/// process" by booting a fresh context over the same stores.
pub struct Device {
    pub store: Arc<MemoryKeyValueStore>,
    pub secure: Arc<MemorySecureStore>,
    pub host: Arc<MemoryHost>,
}

impl Device {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryKeyValueStore::new()),
            secure: Arc::new(MemorySecureStore::new()),
            host: Arc::new(MemoryHost::new()),
        }
    }

    /// Boots a fresh session context over this device's stores.
    pub fn boot(&self) -> SessionContext {
        SessionContext::new(
            Arc::clone(&self.store) as Arc<dyn KeyValueStore>,
            Arc::clone(&self.secure) as Arc<dyn SecureStore>,
            Arc::clone(&self.host) as Arc<dyn PlatformHost>,
        )
    }
}
