//! Key layout of the on-device stores.
//!
//! The key strings are shared with the shipped mobile app; changing any of
//! them orphans data already on users' devices. Versioned keys (`…:v1`)
//! exist so a future layout change can migrate instead.

/// Durable key holding the serialized session snapshot.
pub const SESSION_SNAPSHOT_KEY: &str = "citypulse:userStore:v1";

/// Durable key holding the JSON map of normalized email to stored user.
pub const USERS_KEY: &str = "citypulse:users:v1";

/// Prefix of the per-identity favorites slots.
pub const FAVORITES_KEY_PREFIX: &str = "citypulse:favorites:";

/// Secure-store slot binding one account email for biometric login.
pub const BIOMETRIC_USER_KEY: &str = "citypulse:biometricUser";

/// Reserved identity scoping favorites while no user is signed in.
pub const GUEST_USER_ID: &str = "guest";

/// Returns the durable key of an identity's favorites slot.
#[must_use]
pub fn favorites_key(user_id: &str) -> String {
    format!("{FAVORITES_KEY_PREFIX}{user_id}")
}
