//! Platform interfaces the host application provides.
//!
//! CityPulse runs inside a host app that owns durable storage, the OS
//! secure store, the app shell, and the biometric prompt. The core only
//! reaches those capabilities through the traits below; [`memory`] carries
//! in-process implementations for tests and host-less use.

use async_trait::async_trait;
use thiserror::Error;

use crate::TextDirection;

pub mod memory;

/// Result alias for platform store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure surface of the host-provided stores.
///
/// The session layer treats every variant as recoverable: reads degrade to
/// defaults and writes are best-effort. The type exists so hosts can say
/// what actually went wrong in logs.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or failed the operation.
    #[error("store_unavailable: {context}")]
    Unavailable {
        /// Context describing the failed operation.
        context: String,
    },
}

impl StoreError {
    /// Builds an [`StoreError::Unavailable`] with the given context.
    #[must_use]
    pub fn unavailable(context: impl Into<String>) -> Self {
        Self::Unavailable {
            context: context.into(),
        }
    }
}

/// Durable string-keyed key-value store.
///
/// Values survive process restarts. Hosts back this with whatever the
/// platform offers (app preferences, a file, a database); the core writes
/// whole values per key and never patches.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value at `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot serve the read.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes `value` at `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the write.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Deletes the value at `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot perform the delete.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// OS-protected store for small sensitive values.
///
/// Same surface as [`KeyValueStore`], but hosts are expected to back it
/// with hardware-protected storage (Keychain, Keystore). The crate uses a
/// single slot, [`crate::keys::BIOMETRIC_USER_KEY`].
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Reads the value at `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot serve the read.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes `value` at `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the write.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Deletes the value at `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot perform the delete.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// App-shell effects owned by the host.
#[async_trait]
pub trait PlatformHost: Send + Sync {
    /// Applies a text direction to the running UI.
    ///
    /// The change may only take full visual effect after a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell refuses the change.
    fn set_text_direction(&self, direction: TextDirection) -> StoreResult<()>;

    /// Requests a full application restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the restart cannot be initiated; the caller
    /// keeps its in-memory state either way.
    async fn request_restart(&self) -> StoreResult<()>;
}

/// What the device reports about its biometric hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricCapability {
    /// Hardware present and at least one biometric enrolled.
    Available,
    /// The device has no supported biometric hardware.
    NoHardware,
    /// Hardware present but nothing enrolled.
    NotEnrolled,
}

/// Outcome of showing the biometric prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiometricOutcome {
    /// The user passed the biometric check.
    Success,
    /// The user dismissed the prompt.
    Canceled,
    /// The prompt could not run.
    Unavailable {
        /// Human-readable reason for the UI.
        reason: String,
    },
}

/// Biometric prompt collaborator.
///
/// Hosts surface these outcomes to the user directly; they are never
/// mapped onto store-level errors. The session core itself does not invoke
/// the prompt — passing it before
/// [`crate::SessionContext::login_from_biometric_link`] is the host's
/// responsibility.
#[async_trait]
pub trait BiometricPrompt: Send + Sync {
    /// Reports device capability; hosts check this before prompting.
    async fn capability(&self) -> BiometricCapability;

    /// Shows the prompt with `message` and waits for the user.
    async fn authenticate(&self, message: &str) -> BiometricOutcome;
}
