//! Vigil client - realtime core for the operations dashboard.
//!
//! This crate holds the dashboard's event distribution subsystem: the
//! authenticated WebSocket link with auto-reconnect, the router that fans
//! inbound events out to query invalidation / toasts / the notification
//! inbox, and the inbox store itself with its persisted delivery settings.
//! CRUD views and the HTTP API client live elsewhere and consume this crate
//! through the hooks and global stores.

pub mod audio;
pub mod auth;
pub mod desktop;
pub mod events;
pub mod logging;
pub mod query;
pub mod storage;
pub mod toast;

pub mod stores;
pub mod ws;

pub use auth::{SessionTokens, TokenProvider};
pub use events::{ClientMessage, RawFrame, ServerEvent};
pub use stores::notifications::{
    Notification, NotificationCategory, NotificationSettings, NotificationStore, SettingsPatch,
};
pub use toast::{Toast, ToastVariant};
pub use ws::{ConnectionState, RealtimeLink, RealtimeProvider};
