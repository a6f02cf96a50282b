//! Biometric fast-login link.
//!
//! The link binds this device to at most one account: a single secure-store
//! slot holding a normalized email. Possession of the slot is treated as
//! proof of identity — no password check — so the link is exactly as strong
//! as the OS protection of the secure store and no stronger. Enabling
//! biometrics for another account overwrites the slot; the previous account
//! is revoked without any explicit unlink event.

use crate::keys::BIOMETRIC_USER_KEY;
use crate::registry::normalize_email;

use super::SessionContext;

impl SessionContext {
    /// Links the signed-in account for biometric login.
    ///
    /// Writes the profile's normalized email into the secure slot and then
    /// reads it back: success means "write verified by round-trip", which
    /// guards against secure stores that acknowledge writes they did not
    /// keep. Returns `false` when signed out, when the write fails, or
    /// when the round-trip does not match.
    pub async fn enable_biometrics_for_current_user(&self) -> bool {
        let Some(profile) = self.state_rx.borrow().profile.clone() else {
            return false;
        };
        let email = normalize_email(&profile.email);
        if let Err(err) = self.secure.set(BIOMETRIC_USER_KEY, &email).await {
            tracing::warn!("biometric link write failed: {err}");
            return false;
        }
        self.biometric_linked_email().await.as_deref() == Some(email.as_str())
    }

    /// Email currently linked for biometric login, if any.
    ///
    /// A read error and an absent slot are both `None`; "never set" and
    /// "store unavailable" are not distinguished.
    pub async fn biometric_linked_email(&self) -> Option<String> {
        let value = self.secure.get(BIOMETRIC_USER_KEY).await.ok().flatten()?;
        if value.is_empty() {
            return None;
        }
        Some(normalize_email(&value))
    }

    /// Whether the signed-in account is the one linked on this device.
    ///
    /// Goes `false` as soon as a different profile becomes active, without
    /// any call to [`Self::disable_biometrics`].
    pub async fn is_biometrics_linked_for_current_user(&self) -> bool {
        let Some(profile) = self.state_rx.borrow().profile.clone() else {
            return false;
        };
        let email = normalize_email(&profile.email);
        self.biometric_linked_email().await.as_deref() == Some(email.as_str())
    }

    /// Signs in the linked account without a password check.
    ///
    /// Returns `false` when no link exists or when the linked email no
    /// longer matches any registered account; otherwise performs the same
    /// transition as [`Self::login_user`].
    pub async fn login_from_biometric_link(&self) -> bool {
        let Some(linked) = self.biometric_linked_email().await else {
            return false;
        };
        let Some(user) = self.registry.find_by_email(&linked).await else {
            return false;
        };
        self.complete_login(&user).await;
        true
    }

    /// Removes the device's biometric link. Idempotent; errors swallowed.
    pub async fn disable_biometrics(&self) {
        if let Err(err) = self.secure.delete(BIOMETRIC_USER_KEY).await {
            tracing::warn!("biometric link delete failed: {err}");
        }
    }
}
