//! Per-identity favorites persistence.

use std::fmt;
use std::sync::Arc;

use crate::keys::favorites_key;
use crate::platform::KeyValueStore;

/// Persists each identity's favorite event ids in its own durable slot.
///
/// Slots are independent per user id (including the guest pseudo-identity)
/// so switching identities swaps the visible set without merging.
pub struct FavoritesRepository {
    store: Arc<dyn KeyValueStore>,
}

impl FavoritesRepository {
    /// Creates a repository over the given durable store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Loads the favorites slot of `user_id`.
    ///
    /// An absent slot, an unparsable slot, and a backend failure are all an
    /// empty list; the default is part of the contract and never surfaced
    /// as an error.
    pub async fn load(&self, user_id: &str) -> Vec<String> {
        match self.store.get(&favorites_key(user_id)).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!("favorites read failed for {user_id}, treating as empty: {err}");
                Vec::new()
            }
        }
    }

    /// Overwrites the favorites slot of `user_id`.
    ///
    /// Best-effort: the session already reflects the in-memory list, so a
    /// persistence failure is logged and swallowed.
    pub async fn save(&self, user_id: &str, ids: &[String]) {
        let Ok(raw) = serde_json::to_string(ids) else {
            return;
        };
        if let Err(err) = self.store.set(&favorites_key(user_id), &raw).await {
            tracing::warn!("favorites write failed for {user_id}: {err}");
        }
    }
}

impl fmt::Debug for FavoritesRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FavoritesRepository").finish_non_exhaustive()
    }
}
