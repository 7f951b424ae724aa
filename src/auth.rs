//! Access-token state shared with the rest of the dashboard.
//!
//! The HTTP login flow lives elsewhere; this module only holds the current
//! access token, mirrors it to persistent storage, and exposes it through the
//! [`TokenProvider`] seam the realtime link consumes. Writing a new token (or
//! clearing it on logout) is the "credential changed" signal the connection
//! manager reacts to.

use dioxus::prelude::*;

use crate::storage;

const TOKEN_KEY: &str = "vigil_access_token";

/// Current access token, restored from storage on first read.
pub static ACCESS_TOKEN: GlobalSignal<Option<String>> =
    Signal::global(|| storage::load(TOKEN_KEY));

/// Store a fresh access token (login or refresh).
pub fn set_token(token: String) {
    storage::save(TOKEN_KEY, &token);
    *ACCESS_TOKEN.write() = Some(token);
}

/// Drop the access token (logout or forced invalidation).
pub fn clear_token() {
    storage::remove(TOKEN_KEY);
    *ACCESS_TOKEN.write() = None;
}

/// Snapshot of the current token.
pub fn current_token() -> Option<String> {
    ACCESS_TOKEN.read().clone()
}

/// Synchronous access-credential source for the realtime link.
///
/// Injected into the connection manager so the URL builder and unit tests do
/// not reach into global state.
pub trait TokenProvider {
    fn access_token(&self) -> Option<String>;
}

/// [`TokenProvider`] backed by [`ACCESS_TOKEN`].
#[derive(Clone, Copy, Default)]
pub struct SessionTokens;

impl TokenProvider for SessionTokens {
    fn access_token(&self) -> Option<String> {
        current_token()
    }
}
