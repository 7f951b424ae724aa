//! Hooks for components consuming the realtime link.
//!
//! Components should read application data from the global stores; these
//! hooks only expose the link handle itself and its two observables (the
//! connection-status indicator and a diagnostic last-frame view).

use dioxus::prelude::*;

use crate::events::RawFrame;
use crate::ws::connection::RealtimeLink;

/// The link provided by the nearest [`crate::ws::RealtimeProvider`].
pub fn use_realtime() -> RealtimeLink {
    use_context::<RealtimeLink>()
}

/// Reactive connection flag, for a persistent status indicator.
pub fn use_connected() -> bool {
    let link = use_realtime();
    let connected = link.is_connected();
    let value = *connected.read();
    value
}

/// Most recently decoded frame.
pub fn use_last_event() -> Option<RawFrame> {
    let link = use_realtime();
    let last = link.last_event();
    let value = last.read().clone();
    value
}
