//! In-memory implementations of the platform traits.
//!
//! These implementations are NOT protected storage. They exist for unit
//! and integration testing of the session layer — including its
//! default-on-failure contract, via the failure-injection switches — and
//! for running the core without a real host.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::TextDirection;

use super::{
    BiometricCapability, BiometricOutcome, BiometricPrompt, KeyValueStore, PlatformHost,
    SecureStore, StoreError, StoreResult,
};

// =============================================================================
// Durable store
// =============================================================================

/// In-memory [`KeyValueStore`].
///
/// "Durable" only for the lifetime of the process; share one instance
/// across contexts to simulate data surviving a restart.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    /// Makes every subsequent write and delete fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Raw view of a stored value, for asserting persisted layouts.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Plants a raw value, bypassing the trait surface.
    pub fn put_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(StoreError::unavailable("injected read failure"));
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::unavailable("injected write failure"));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::unavailable("injected delete failure"));
        }
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

// =============================================================================
// Secure store
// =============================================================================

/// In-memory [`SecureStore`].
///
/// Offers the same failure injection as [`MemoryKeyValueStore`] plus
/// `drop_writes`, which acknowledges writes without storing them — the
/// silent-failure mode the biometric link's round-trip verification exists
/// to catch.
#[derive(Default)]
pub struct MemorySecureStore {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    drop_writes: AtomicBool,
}

impl MemorySecureStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    /// Makes every subsequent write and delete fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Makes writes report success without storing anything.
    pub fn set_drop_writes(&self, drop: bool) {
        self.drop_writes.store(drop, Ordering::Relaxed);
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(StoreError::unavailable("injected read failure"));
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::unavailable("injected write failure"));
        }
        if !self.drop_writes.load(Ordering::Relaxed) {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::unavailable("injected delete failure"));
        }
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

// =============================================================================
// App shell
// =============================================================================

/// In-memory [`PlatformHost`] recording the effects it was asked for.
#[derive(Default)]
pub struct MemoryHost {
    directions: Mutex<Vec<TextDirection>>,
    restarts: AtomicU32,
    fail_direction: AtomicBool,
    fail_restart: AtomicBool,
}

impl MemoryHost {
    /// Creates a host with no recorded effects.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last text direction applied, if any.
    #[must_use]
    pub fn last_direction(&self) -> Option<TextDirection> {
        self.directions.lock().unwrap().last().copied()
    }

    /// Number of restart requests that went through.
    #[must_use]
    pub fn restart_count(&self) -> u32 {
        self.restarts.load(Ordering::Relaxed)
    }

    /// Makes direction changes fail.
    pub fn set_fail_direction(&self, fail: bool) {
        self.fail_direction.store(fail, Ordering::Relaxed);
    }

    /// Makes restart requests fail.
    pub fn set_fail_restart(&self, fail: bool) {
        self.fail_restart.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl PlatformHost for MemoryHost {
    fn set_text_direction(&self, direction: TextDirection) -> StoreResult<()> {
        if self.fail_direction.load(Ordering::Relaxed) {
            return Err(StoreError::unavailable("injected direction failure"));
        }
        self.directions.lock().unwrap().push(direction);
        Ok(())
    }

    async fn request_restart(&self) -> StoreResult<()> {
        if self.fail_restart.load(Ordering::Relaxed) {
            return Err(StoreError::unavailable("injected restart failure"));
        }
        self.restarts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// =============================================================================
// Biometric prompt
// =============================================================================

/// Scripted [`BiometricPrompt`] for tests.
pub struct MemoryBiometricPrompt {
    capability: Mutex<BiometricCapability>,
    outcome: Mutex<BiometricOutcome>,
}

impl MemoryBiometricPrompt {
    /// Creates a prompt that reports available hardware and approves.
    #[must_use]
    pub fn new() -> Self {
        Self {
            capability: Mutex::new(BiometricCapability::Available),
            outcome: Mutex::new(BiometricOutcome::Success),
        }
    }

    /// Scripts the reported capability.
    pub fn set_capability(&self, capability: BiometricCapability) {
        *self.capability.lock().unwrap() = capability;
    }

    /// Scripts the outcome of the next prompts.
    pub fn set_outcome(&self, outcome: BiometricOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }
}

impl Default for MemoryBiometricPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BiometricPrompt for MemoryBiometricPrompt {
    async fn capability(&self) -> BiometricCapability {
        *self.capability.lock().unwrap()
    }

    async fn authenticate(&self, _message: &str) -> BiometricOutcome {
        self.outcome.lock().unwrap().clone()
    }
}
