//! End-to-end journeys through the public session API.

mod common;

use citypulse_core::keys::SESSION_SNAPSHOT_KEY;
use citypulse_core::{Language, SessionState};

use common::Device;

#[tokio::test]
async fn test_full_user_journey_across_restart() {
    let device = Device::new();

    // First app run: sign up, collect favorites, link biometrics, switch
    // the app to Arabic.
    let session = device.boot();
    session.load_from_storage().await;
    session.register_user("Alice", "Alice@X.com", "pw1").await;
    session.toggle_favorite("evt1").await;
    session.toggle_favorite("evt2").await;
    assert!(session.enable_biometrics_for_current_user().await);
    session.set_language(Language::Ar).await;
    assert_eq!(device.host.restart_count(), 1);
    session.logout().await;
    drop(session);

    // Second run: the language survived, the session is Guest, and the
    // biometric link signs the account back in with its favorites.
    let session = device.boot();
    session.load_from_storage().await;
    let state = session.state();
    assert_eq!(state.language, Language::Ar);
    assert!(!state.is_authenticated);
    assert!(state.favorites.is_empty());

    assert!(session.login_from_biometric_link().await);
    let state = session.state();
    assert_eq!(state.profile.unwrap().email, "alice@x.com");
    assert_eq!(
        state.favorites,
        vec!["evt1".to_string(), "evt2".to_string()]
    );
}

#[tokio::test]
async fn test_favorites_stay_scoped_across_restarts() {
    let device = Device::new();

    let session = device.boot();
    session.register_user("Alice", "alice@x.com", "pw").await;
    session.toggle_favorite("evt-a").await;
    session.logout().await;
    session.register_user("Bob", "bob@x.com", "pw").await;
    session.toggle_favorite("evt-b").await;
    session.logout().await;
    drop(session);

    let session = device.boot();
    session.load_from_storage().await;
    assert!(session.login_user("alice@x.com", "pw").await);
    assert_eq!(session.state().favorites, vec!["evt-a".to_string()]);
    session.logout().await;
    assert!(session.login_user("bob@x.com", "pw").await);
    assert_eq!(session.state().favorites, vec!["evt-b".to_string()]);
}

#[tokio::test]
async fn test_login_on_pristine_device_fails_cleanly() {
    let device = Device::new();
    let session = device.boot();
    session.load_from_storage().await;

    assert!(!session.login_user("nobody@x.com", "x").await);
    assert_eq!(session.state(), SessionState::default());
    assert!(device.store.raw(SESSION_SNAPSHOT_KEY).is_none());
}

#[tokio::test]
async fn test_degraded_device_still_boots_to_defaults() {
    let device = Device::new();

    // Populate the device, then break its storage.
    let session = device.boot();
    session.register_user("Alice", "alice@x.com", "pw").await;
    assert!(session.enable_biometrics_for_current_user().await);
    drop(session);
    device.store.set_fail_reads(true);
    device.secure.set_fail_reads(true);

    let session = device.boot();
    session.load_from_storage().await;
    assert_eq!(session.state(), SessionState::default());
    assert!(!session.login_from_biometric_link().await);
    assert!(session.biometric_linked_email().await.is_none());
}
