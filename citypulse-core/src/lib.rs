#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! On-device account, session, and favorites layer for the CityPulse app.
//!
//! Everything here is client-resident: accounts live in a JSON map in the
//! host's durable store, sessions are reconciled against it at startup, and
//! the biometric "fast login" link is one slot in the host's secure store.
//! There is no server-side identity authority and no real cryptographic
//! authentication — the account scheme is an explicit mock (see
//! [`StoredUser`]).
//!
//! Hosts provide storage and app-shell capabilities through the traits in
//! [`platform`]; [`platform::memory`] ships in-memory implementations for
//! tests and host-less use. The [`catalog`] module is the stateless
//! Ticketmaster Discovery client the rest of the app reads events from —
//! the session core itself only ever stores event ids.

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Language preference of the app UI.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    /// English.
    #[default]
    En,
    /// Arabic.
    Ar,
}

impl Language {
    /// Text direction matching this language.
    #[must_use]
    pub const fn text_direction(self) -> TextDirection {
        match self {
            Self::En => TextDirection::Ltr,
            Self::Ar => TextDirection::Rtl,
        }
    }
}

/// Horizontal layout direction requested from the app shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    /// Left-to-right.
    Ltr,
    /// Right-to-left.
    Rtl,
}

mod error;
pub use error::*;

mod favorites;
pub use favorites::*;

mod registry;
pub use registry::*;

mod session;
pub use session::*;

pub mod catalog;
pub mod keys;
pub mod platform;
