//! The session context: the app's central account/preference state machine.
//!
//! Exactly one [`SessionContext`] exists per process. It is created at
//! startup, handed to the UI layer, and torn down at exit; all mutation
//! goes through its methods and every mutation is broadcast to subscribers
//! as a fresh [`SessionState`] snapshot.
//!
//! The session is always in one of two shapes: **Guest**
//! (`is_authenticated == false`, no profile, favorites scoped to the guest
//! pseudo-identity) or **Authenticated** (`is_authenticated == true`, a
//! profile, favorites scoped to that profile's id).
//!
//! None of the public operations fail. Storage reads degrade to defaults
//! and storage writes are best-effort tail effects — the durable stores
//! mirror the in-memory state, they do not gate it. Callers must not
//! interleave two mutations against the same logical resource faster than
//! their storage round-trips; the last write observed by storage wins.

mod biometric;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::favorites::FavoritesRepository;
use crate::keys::{GUEST_USER_ID, SESSION_SNAPSHOT_KEY};
use crate::platform::{KeyValueStore, PlatformHost, SecureStore};
use crate::registry::{StoredUser, UserRegistry};
use crate::Language;

/// The session-visible subset of an account. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable account id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Normalized email.
    pub email: String,
}

impl From<&StoredUser> for UserProfile {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Reactive session state observed by the UI layer.
///
/// `favorites` always reflects the active identity: the signed-in user's
/// list, or the guest list while signed out. The serialized form doubles
/// as the durable snapshot layout (camelCase keys, shared with the shipped
/// app), except that a persisted snapshot never carries favorites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Current language preference.
    pub language: Language,
    /// Favorite event ids of the active identity.
    pub favorites: Vec<String>,
    /// Profile of the signed-in user, if any.
    pub profile: Option<UserProfile>,
    /// Whether a user is signed in.
    pub is_authenticated: bool,
}

/// Durable snapshot fields, applied independently when present so a
/// partial or older snapshot still restores what it can.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFields {
    language: Option<Language>,
    profile: Option<UserProfile>,
    is_authenticated: Option<bool>,
}

/// Central session/preference store of the app.
///
/// Construct one per process over the host's platform collaborators, then
/// call [`Self::load_from_storage`] to restore the durable snapshot:
///
/// ```
/// use std::sync::Arc;
///
/// use citypulse_core::platform::memory::{
///     MemoryHost, MemoryKeyValueStore, MemorySecureStore,
/// };
/// use citypulse_core::SessionContext;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let session = SessionContext::new(
///     Arc::new(MemoryKeyValueStore::new()),
///     Arc::new(MemorySecureStore::new()),
///     Arc::new(MemoryHost::new()),
/// );
/// session.load_from_storage().await;
/// assert!(!session.state().is_authenticated);
/// # }
/// ```
pub struct SessionContext {
    registry: UserRegistry,
    favorites: FavoritesRepository,
    store: Arc<dyn KeyValueStore>,
    secure: Arc<dyn SecureStore>,
    host: Arc<dyn PlatformHost>,
    state_tx: watch::Sender<SessionState>,
    state_rx: watch::Receiver<SessionState>,
}

impl SessionContext {
    /// Creates the process-wide session context over the host's stores.
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        secure: Arc<dyn SecureStore>,
        host: Arc<dyn PlatformHost>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(SessionState::default());
        Self {
            registry: UserRegistry::new(Arc::clone(&store)),
            favorites: FavoritesRepository::new(Arc::clone(&store)),
            store,
            secure,
            host,
            state_tx,
            state_rx,
        }
    }

    /// Returns a snapshot of the current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Subscribes to state changes.
    ///
    /// The receiver is marked changed on every mutation; each borrow
    /// observes the latest full state, so slow subscribers skip
    /// intermediate states rather than queue them.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Identity whose favorites slot is active: the signed-in user's id,
    /// or the guest pseudo-identity.
    #[must_use]
    pub fn active_user_id(&self) -> String {
        self.state_rx
            .borrow()
            .profile
            .as_ref()
            .map_or_else(|| GUEST_USER_ID.to_string(), |profile| profile.id.clone())
    }

    /// Restores session state from the durable snapshot.
    ///
    /// Snapshot fields are applied individually; the restored profile is
    /// then reconciled against the registry — the registry is the source
    /// of truth for the display name, the snapshot may be stale — and
    /// finally the active identity's favorites are loaded. Any read or
    /// parse failure along the way falls back to the Guest/English
    /// defaults.
    pub async fn load_from_storage(&self) {
        if let Ok(Some(raw)) = self.store.get(SESSION_SNAPSHOT_KEY).await {
            if let Ok(fields) = serde_json::from_str::<SnapshotFields>(&raw) {
                self.state_tx.send_modify(|state| {
                    if let Some(language) = fields.language {
                        state.language = language;
                    }
                    if let Some(is_authenticated) = fields.is_authenticated {
                        state.is_authenticated = is_authenticated;
                    }
                    if let Some(profile) = fields.profile {
                        state.profile = Some(profile);
                    }
                });
            }
        }

        let cached = self.state_rx.borrow().profile.clone();
        if let Some(profile) = cached {
            if let Some(found) = self.registry.find_by_email(&profile.email).await {
                if found.name != profile.name {
                    self.state_tx
                        .send_modify(|state| state.profile = Some(UserProfile::from(&found)));
                }
            }
        }

        let favorites = self.favorites.load(&self.active_user_id()).await;
        self.state_tx.send_modify(|state| state.favorites = favorites);
    }

    /// Writes the durable session snapshot.
    ///
    /// The snapshot never carries favorites — those live in per-identity
    /// slots — and a write failure is logged and swallowed.
    pub async fn persist(&self) {
        let snapshot = SessionState {
            favorites: Vec::new(),
            ..self.state()
        };
        let Ok(raw) = serde_json::to_string(&snapshot) else {
            return;
        };
        if let Err(err) = self.store.set(SESSION_SNAPSHOT_KEY, &raw).await {
            tracing::warn!("session snapshot write failed: {err}");
        }
    }

    /// Registers an account (idempotent upsert) and signs it in.
    ///
    /// Session favorites reset to empty; the account's stored favorites
    /// slot is left untouched, so registration acts as an identity reset
    /// even for an email that had prior history. Re-registering an email
    /// keeps its id.
    pub async fn register_user(&self, name: &str, email: &str, password: &str) {
        let user = self.registry.register(name, email, password).await;
        tracing::debug!(user_id = %user.id, "registered user");
        self.state_tx.send_modify(|state| {
            state.profile = Some(UserProfile::from(&user));
            state.is_authenticated = true;
            state.favorites = Vec::new();
        });
        self.persist().await;
    }

    /// Signs in with email and password.
    ///
    /// On a registry match the session transitions to Authenticated and
    /// that user's stored favorites replace the session list. Returns
    /// `false` without touching any state when the credentials do not
    /// match — unknown email and wrong password are indistinguishable.
    pub async fn login_user(&self, email: &str, password: &str) -> bool {
        let Some(user) = self.registry.authenticate(email, password).await else {
            return false;
        };
        self.complete_login(&user).await;
        true
    }

    /// Shared Guest → Authenticated transition for password and biometric
    /// logins.
    async fn complete_login(&self, user: &StoredUser) {
        self.state_tx.send_modify(|state| {
            state.is_authenticated = true;
            state.profile = Some(UserProfile::from(user));
        });
        self.persist().await;
        let favorites = self.favorites.load(&user.id).await;
        self.state_tx.send_modify(|state| state.favorites = favorites);
        tracing::debug!(user_id = %user.id, "signed in");
    }

    /// Signs out.
    ///
    /// Clears the profile and the session favorites immediately — the view
    /// goes empty, it does not swap to the guest's stored list — and
    /// persists the snapshot. Stored user and favorites records are
    /// untouched.
    pub async fn logout(&self) {
        self.state_tx.send_modify(|state| {
            state.is_authenticated = false;
            state.profile = None;
            state.favorites = Vec::new();
        });
        self.persist().await;
    }

    /// Sets the language preference.
    ///
    /// Applies the matching text direction, persists the snapshot, then
    /// asks the host for a full restart so the direction change takes
    /// visual effect. A failed host call leaves the in-memory change in
    /// place until the next natural restart.
    pub async fn set_language(&self, language: Language) {
        self.state_tx.send_modify(|state| state.language = language);
        if let Err(err) = self.host.set_text_direction(language.text_direction()) {
            tracing::warn!("text direction change failed: {err}");
        }
        self.persist().await;
        if let Err(err) = self.host.request_restart().await {
            tracing::warn!("restart request failed: {err}");
        }
    }

    /// Adds or removes `event_id` from the active identity's favorites.
    ///
    /// The sole favorites mutation entry point; it always targets whoever
    /// is active now. Session state updates first, then the per-identity
    /// slot is overwritten best-effort.
    pub async fn toggle_favorite(&self, event_id: &str) {
        let mut list = self.state_rx.borrow().favorites.clone();
        if let Some(index) = list.iter().position(|id| id == event_id) {
            list.remove(index);
        } else {
            list.push(event_id.to_string());
        }
        self.state_tx
            .send_modify(|state| state.favorites.clone_from(&list));
        self.favorites.save(&self.active_user_id(), &list).await;
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("state", &*self.state_rx.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{favorites_key, GUEST_USER_ID, SESSION_SNAPSHOT_KEY};
    use crate::platform::memory::{MemoryHost, MemoryKeyValueStore, MemorySecureStore};
    use crate::TextDirection;

    struct Fixture {
        store: Arc<MemoryKeyValueStore>,
        secure: Arc<MemorySecureStore>,
        host: Arc<MemoryHost>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(MemoryKeyValueStore::new()),
                secure: Arc::new(MemorySecureStore::new()),
                host: Arc::new(MemoryHost::new()),
            }
        }

        fn session(&self) -> SessionContext {
            SessionContext::new(
                Arc::clone(&self.store) as Arc<dyn KeyValueStore>,
                Arc::clone(&self.secure) as Arc<dyn SecureStore>,
                Arc::clone(&self.host) as Arc<dyn PlatformHost>,
            )
        }
    }

    #[tokio::test]
    async fn test_register_toggle_logout_login_restores_favorites() {
        let fixture = Fixture::new();
        let session = fixture.session();

        session.register_user("Alice", "alice@x.com", "pw1").await;
        let state = session.state();
        assert!(state.is_authenticated);
        assert!(state.favorites.is_empty());

        session.toggle_favorite("evt1").await;
        assert_eq!(session.state().favorites, vec!["evt1".to_string()]);

        session.logout().await;
        let state = session.state();
        assert!(!state.is_authenticated);
        assert!(state.profile.is_none());
        assert!(state.favorites.is_empty());

        assert!(session.login_user("alice@x.com", "pw1").await);
        assert_eq!(session.state().favorites, vec!["evt1".to_string()]);
    }

    #[tokio::test]
    async fn test_login_on_empty_registry_leaves_session_untouched() {
        let fixture = Fixture::new();
        let session = fixture.session();
        session.load_from_storage().await;

        let before = session.state();
        assert!(!session.login_user("nobody@x.com", "x").await);
        assert_eq!(session.state(), before);
    }

    #[tokio::test]
    async fn test_wrong_password_is_plain_false() {
        let fixture = Fixture::new();
        let session = fixture.session();
        session.register_user("Alice", "alice@x.com", "pw1").await;
        session.logout().await;

        assert!(!session.login_user("alice@x.com", "wrong").await);
        assert!(!session.state().is_authenticated);
    }

    #[tokio::test]
    async fn test_favorites_are_identity_scoped() {
        let fixture = Fixture::new();
        let session = fixture.session();

        session.register_user("Alice", "alice@x.com", "pw").await;
        session.toggle_favorite("evt-a").await;
        session.logout().await;

        session.register_user("Bob", "bob@x.com", "pw").await;
        assert!(session.state().favorites.is_empty());
        session.toggle_favorite("evt-b").await;
        session.logout().await;

        assert!(session.login_user("alice@x.com", "pw").await);
        assert_eq!(session.state().favorites, vec!["evt-a".to_string()]);

        session.logout().await;
        assert!(session.login_user("bob@x.com", "pw").await);
        assert_eq!(session.state().favorites, vec!["evt-b".to_string()]);
    }

    #[tokio::test]
    async fn test_toggle_is_an_involution() {
        let fixture = Fixture::new();
        let session = fixture.session();
        session.register_user("Alice", "alice@x.com", "pw").await;

        session.toggle_favorite("evt1").await;
        session.toggle_favorite("evt2").await;
        session.toggle_favorite("evt1").await;
        session.toggle_favorite("evt1").await;
        assert_eq!(
            session.state().favorites,
            vec!["evt2".to_string(), "evt1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_guest_favorites_use_reserved_slot() {
        let fixture = Fixture::new();
        let session = fixture.session();

        session.toggle_favorite("evt1").await;
        assert_eq!(
            fixture.store.raw(&favorites_key(GUEST_USER_ID)).unwrap(),
            "[\"evt1\"]"
        );
    }

    #[tokio::test]
    async fn test_snapshot_never_carries_favorites() {
        let fixture = Fixture::new();
        let session = fixture.session();
        session.register_user("Alice", "alice@x.com", "pw").await;
        session.toggle_favorite("evt1").await;
        session.persist().await;

        let raw = fixture.store.raw(SESSION_SNAPSHOT_KEY).unwrap();
        let snapshot: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(snapshot["favorites"], serde_json::json!([]));
        assert_eq!(snapshot["isAuthenticated"], serde_json::json!(true));
        assert_eq!(snapshot["profile"]["email"], "alice@x.com");
    }

    #[tokio::test]
    async fn test_startup_restores_session_and_favorites() {
        let fixture = Fixture::new();
        let session = fixture.session();
        session.register_user("Alice", "alice@x.com", "pw").await;
        session.toggle_favorite("evt1").await;

        // Fresh context over the same stores, as after a process restart.
        let restored = fixture.session();
        restored.load_from_storage().await;
        let state = restored.state();
        assert!(state.is_authenticated);
        assert_eq!(state.profile.unwrap().email, "alice@x.com");
        assert_eq!(state.favorites, vec!["evt1".to_string()]);
    }

    #[tokio::test]
    async fn test_startup_reconciles_stale_profile_name() {
        let fixture = Fixture::new();
        let session = fixture.session();
        session.register_user("Alice", "alice@x.com", "pw").await;

        // The name changes through a later re-registration; the first
        // context's snapshot on disk still carries the old one.
        let other = fixture.session();
        other.register_user("Alicia", "alice@x.com", "pw").await;
        session.persist().await;

        let restored = fixture.session();
        restored.load_from_storage().await;
        assert_eq!(restored.state().profile.unwrap().name, "Alicia");
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_falls_back_to_defaults() {
        let fixture = Fixture::new();
        fixture.store.put_raw(SESSION_SNAPSHOT_KEY, "not json at all");
        let session = fixture.session();
        session.load_from_storage().await;
        assert_eq!(session.state(), SessionState::default());
    }

    #[tokio::test]
    async fn test_unreadable_storage_falls_back_to_defaults() {
        let fixture = Fixture::new();
        fixture.store.set_fail_reads(true);
        let session = fixture.session();
        session.load_from_storage().await;
        assert_eq!(session.state(), SessionState::default());
    }

    #[tokio::test]
    async fn test_set_language_applies_direction_and_restarts() {
        let fixture = Fixture::new();
        let session = fixture.session();

        session.set_language(Language::Ar).await;
        assert_eq!(session.state().language, Language::Ar);
        assert_eq!(fixture.host.last_direction(), Some(TextDirection::Rtl));
        assert_eq!(fixture.host.restart_count(), 1);

        let raw = fixture.store.raw(SESSION_SNAPSHOT_KEY).unwrap();
        assert!(raw.contains("\"language\":\"ar\""));
    }

    #[tokio::test]
    async fn test_set_language_survives_restart_failure() {
        let fixture = Fixture::new();
        fixture.host.set_fail_restart(true);
        fixture.host.set_fail_direction(true);
        let session = fixture.session();

        session.set_language(Language::Ar).await;
        assert_eq!(session.state().language, Language::Ar);
        assert_eq!(fixture.host.restart_count(), 0);
    }

    #[tokio::test]
    async fn test_registration_resets_session_favorites_only() {
        let fixture = Fixture::new();
        let session = fixture.session();
        session.register_user("Alice", "alice@x.com", "pw").await;
        session.toggle_favorite("evt1").await;
        let user_id = session.active_user_id();
        session.logout().await;

        // Re-registration resets the visible list but leaves the stored
        // slot alone until the next toggle overwrites it.
        session.register_user("Alice", "alice@x.com", "pw").await;
        assert!(session.state().favorites.is_empty());
        assert_eq!(
            fixture.store.raw(&favorites_key(&user_id)).unwrap(),
            "[\"evt1\"]"
        );
    }

    #[tokio::test]
    async fn test_subscribers_observe_mutations() {
        let fixture = Fixture::new();
        let session = fixture.session();
        let mut updates = session.subscribe();
        assert!(!updates.has_changed().unwrap());

        session.register_user("Alice", "alice@x.com", "pw").await;
        assert!(updates.has_changed().unwrap());
        assert!(updates.borrow_and_update().is_authenticated);

        session.logout().await;
        assert!(updates.has_changed().unwrap());
        assert!(!updates.borrow_and_update().is_authenticated);
    }

    #[tokio::test]
    async fn test_write_failures_never_surface() {
        let fixture = Fixture::new();
        fixture.store.set_fail_writes(true);
        let session = fixture.session();

        session.register_user("Alice", "alice@x.com", "pw").await;
        session.toggle_favorite("evt1").await;
        session.set_language(Language::Ar).await;
        session.logout().await;

        // Nothing was persisted, but every in-memory transition held.
        assert!(fixture.store.raw(SESSION_SNAPSHOT_KEY).is_none());
        assert_eq!(session.state().language, Language::Ar);
    }
}
