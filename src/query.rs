//! Named query-cache invalidation.
//!
//! Fetched API data is cached per component via `use_live_query`, which pairs
//! a `use_resource` with a per-key version signal. Bumping the version
//! (usually from a realtime event handler) re-runs every resource registered
//! under that key. Keys are logical resource names, not URLs.

use std::collections::HashMap;
use std::future::Future;

use dioxus::prelude::*;

/// Logical resource names used by the realtime handlers.
pub mod keys {
    pub const SESSIONS: &str = "sessions";
    pub const BEACONS: &str = "beacons";
    pub const DASHBOARD_STATS: &str = "dashboard-stats";

    /// Per-beacon task list key.
    pub fn beacon_tasks(beacon_id: &str) -> String {
        format!("beacon-tasks:{}", beacon_id)
    }
}

/// One version signal per query key, created lazily.
pub static QUERY_VERSIONS: GlobalSignal<HashMap<String, Signal<u32>>> =
    Signal::global(HashMap::new);

fn version_signal(key: &str) -> Signal<u32> {
    // peek: looking up a key must not subscribe the caller to the whole map
    if let Some(sig) = QUERY_VERSIONS.peek().get(key) {
        return *sig;
    }
    let sig = Signal::new(0u32);
    QUERY_VERSIONS.write().insert(key.to_string(), sig);
    sig
}

/// Mark a named query stale, re-running every live resource bound to it.
pub fn invalidate_query(key: &str) {
    let mut sig = version_signal(key);
    sig.with_mut(|v| *v = v.wrapping_add(1));
}

/// A `use_resource` that re-runs whenever its query key is invalidated.
///
/// ```rust,ignore
/// let sessions = use_live_query(keys::SESSIONS, move || async move {
///     api.list_sessions().await
/// });
/// ```
pub fn use_live_query<T, F>(key: &str, mut future: impl FnMut() -> F + 'static) -> Resource<T>
where
    T: 'static,
    F: Future<Output = T> + 'static,
{
    let version = use_hook({
        let key = key.to_string();
        move || version_signal(&key)
    });
    use_resource(move || {
        let _ = *version.read();
        future()
    })
}

/// Cache-invalidation seam consumed by the message router.
pub trait QueryInvalidator {
    fn invalidate(&self, key: &str);
}

/// Live [`QueryInvalidator`] bumping the global version signals.
#[derive(Clone, Copy, Default)]
pub struct SignalQueries;

impl QueryInvalidator for SignalQueries {
    fn invalidate(&self, key: &str) {
        invalidate_query(key);
    }
}
