//! Platform transport drivers for the realtime link.
//!
//! Both drivers expose the same `RealtimeLink` surface: `connect`,
//! `disconnect`, `send`, plus the `is_connected` / `last_event` observables.
//! The lifecycle rules live in [`crate::ws::retry`]; the drivers only own the
//! socket, its event plumbing, and the pending reconnect timer.

#[cfg(target_arch = "wasm32")]
mod connection_wasm;
#[cfg(target_arch = "wasm32")]
pub use connection_wasm::RealtimeLink;

#[cfg(not(target_arch = "wasm32"))]
mod connection_native;
#[cfg(not(target_arch = "wasm32"))]
pub use connection_native::RealtimeLink;

/// Event-loop sleep used for the post-credential-change connect delay and
/// the native retry interval.
pub(crate) async fn sleep_ms(ms: u32) {
    #[cfg(target_arch = "wasm32")]
    gloo_timers::future::TimeoutFuture::new(ms).await;
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(std::time::Duration::from_millis(ms as u64)).await;
}
