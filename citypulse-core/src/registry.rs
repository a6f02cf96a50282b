//! Local user registry: the authoritative map of on-device accounts.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::keys::USERS_KEY;
use crate::platform::KeyValueStore;

/// A locally registered account, keyed in the registry by normalized email.
///
/// This is the app's mock account scheme: the password is stored and
/// compared in plaintext on-device. The type never crosses into session
/// state — sessions only carry [`crate::UserProfile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    /// Stable account id, assigned once at first registration.
    pub id: String,
    /// Display name, overwritten on re-registration.
    pub name: String,
    /// Normalized (trimmed, lowercased) email; the registry key.
    pub email: String,
    /// Plaintext password of the mock scheme.
    pub password: String,
}

/// Normalizes an email for use as a registry key.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Mints a creation-time-derived account id.
///
/// The monotonic suffix keeps ids distinct when two registrations land in
/// the same millisecond.
fn mint_user_id() -> String {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("u_{millis}_{seq}")
}

/// Registry of local accounts, persisted as one JSON map under
/// [`USERS_KEY`].
///
/// Every mutation rewrites the whole map. A read that fails for any reason
/// — missing key, malformed JSON, backend failure — is an empty registry;
/// that default is part of the contract, not an error to surface.
pub struct UserRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl UserRegistry {
    /// Creates a registry over the given durable store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Registers or re-registers an account. Always succeeds.
    ///
    /// A known normalized email keeps its id while name and password are
    /// overwritten; a new email mints a fresh id. The returned record is
    /// what was persisted.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> StoredUser {
        let mut users = self.load_map().await;
        let key = normalize_email(email);
        let id = users
            .get(&key)
            .map_or_else(mint_user_id, |existing| existing.id.clone());
        let user = StoredUser {
            id,
            name: name.to_string(),
            email: key.clone(),
            password: password.to_string(),
        };
        users.insert(key, user.clone());
        self.save_map(&users).await;
        user
    }

    /// Checks credentials against the registry.
    ///
    /// `None` covers both an unknown email and a password mismatch; the
    /// two causes are deliberately indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Option<StoredUser> {
        let users = self.load_map().await;
        let user = users.get(&normalize_email(email))?;
        if user.password == password {
            Some(user.clone())
        } else {
            None
        }
    }

    /// Looks up an account by email (raw or normalized).
    pub async fn find_by_email(&self, email: &str) -> Option<StoredUser> {
        self.load_map().await.get(&normalize_email(email)).cloned()
    }

    async fn load_map(&self) -> HashMap<String, StoredUser> {
        match self.store.get(USERS_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
            Ok(None) => HashMap::new(),
            Err(err) => {
                tracing::warn!("user registry read failed, treating as empty: {err}");
                HashMap::new()
            }
        }
    }

    async fn save_map(&self, users: &HashMap<String, StoredUser>) {
        let Ok(raw) = serde_json::to_string(users) else {
            return;
        };
        if let Err(err) = self.store.set(USERS_KEY, &raw).await {
            tracing::warn!("user registry write failed: {err}");
        }
    }
}

impl fmt::Debug for UserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::MemoryKeyValueStore;
    use test_case::test_case;

    fn registry() -> (Arc<MemoryKeyValueStore>, UserRegistry) {
        let store = Arc::new(MemoryKeyValueStore::new());
        let registry = UserRegistry::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        (store, registry)
    }

    #[test_case("  Alice@X.com  ", "alice@x.com")]
    #[test_case("BOB@EXAMPLE.COM", "bob@example.com")]
    #[test_case("plain@x.com", "plain@x.com")]
    fn test_normalize_email(raw: &str, expected: &str) {
        assert_eq!(normalize_email(raw), expected);
    }

    #[test]
    fn test_minted_ids_are_distinct() {
        assert_ne!(mint_user_id(), mint_user_id());
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let (_, registry) = registry();
        let registered = registry.register("Alice", "alice@x.com", "pw1").await;
        let authed = registry.authenticate("alice@x.com", "pw1").await.unwrap();
        assert_eq!(authed.id, registered.id);
        assert_eq!(authed.name, "Alice");
    }

    #[tokio::test]
    async fn test_reregistration_preserves_id() {
        let (_, registry) = registry();
        let first = registry.register("Alice", "alice@x.com", "pw1").await;
        let second = registry.register("Alicia", "Alice@X.com", "pw2").await;
        assert_eq!(first.id, second.id);

        // Old password no longer matches, new one does.
        assert!(registry.authenticate("alice@x.com", "pw1").await.is_none());
        let authed = registry.authenticate("alice@x.com", "pw2").await.unwrap();
        assert_eq!(authed.name, "Alicia");
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_indistinct() {
        let (_, registry) = registry();
        registry.register("Alice", "alice@x.com", "pw1").await;
        assert!(registry.authenticate("alice@x.com", "wrong").await.is_none());
        assert!(registry.authenticate("nobody@x.com", "pw1").await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_normalizes_email() {
        let (_, registry) = registry();
        registry.register("Alice", "alice@x.com", "pw1").await;
        let found = registry.find_by_email(" ALICE@x.com ").await.unwrap();
        assert_eq!(found.email, "alice@x.com");
        let authed = registry.authenticate(" Alice@X.COM ", "pw1").await;
        assert!(authed.is_some());
    }

    #[tokio::test]
    async fn test_corrupt_map_is_empty_registry() {
        let (store, registry) = registry();
        store.put_raw(USERS_KEY, "{not json");
        assert!(registry.authenticate("alice@x.com", "pw1").await.is_none());

        // Registration over the corrupt slot starts a fresh map.
        registry.register("Alice", "alice@x.com", "pw1").await;
        assert!(registry.authenticate("alice@x.com", "pw1").await.is_some());
    }

    #[tokio::test]
    async fn test_read_failure_is_empty_registry() {
        let (store, registry) = registry();
        registry.register("Alice", "alice@x.com", "pw1").await;
        store.set_fail_reads(true);
        assert!(registry.authenticate("alice@x.com", "pw1").await.is_none());
    }
}
