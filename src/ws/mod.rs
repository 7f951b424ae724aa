//! Realtime event distribution.
//!
//! One persistent, authenticated WebSocket from the dashboard to the server,
//! fanned out to independent consumers:
//!
//! ```text
//!   ┌──────────────────────────────────────────────┐
//!   │               RealtimeProvider               │
//!   │   (owns the link, reacts to token changes)   │
//!   └──────────────────────────────────────────────┘
//!                         │
//!                         ▼
//!                  ┌──────────────┐     retry rules
//!                  │ RealtimeLink │ ◄── LinkLifecycle
//!                  └──────────────┘
//!                         │ text frames
//!                         ▼
//!                  ┌──────────────┐
//!                  │ MessageRouter│
//!                  └──────────────┘
//!            ┌────────────┼─────────────┐
//!            ▼            ▼             ▼
//!      query versions   inbox        toasts
//!      (invalidation)  (store)      (queue)
//! ```
//!
//! Components read from the stores and hooks, never from raw frames. Frames
//! are processed in delivery order; nothing survives a reconnect boundary
//! (a reconnect is indistinguishable from a fresh subscription).

pub mod connection;
pub mod hooks;
pub mod manager;
pub mod retry;
pub mod router;

pub use connection::RealtimeLink;
pub use hooks::{use_connected, use_last_event, use_realtime};
pub use manager::{build_link, RealtimeProvider};
pub use retry::{CloseOutcome, ConnectionState, LinkLifecycle, ReconnectPolicy, NORMAL_CLOSURE};
pub use router::MessageRouter;
