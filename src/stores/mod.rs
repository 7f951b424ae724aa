//! Global stores for application state.

pub mod notifications;

pub use notifications::{
    clear_all_notifications, clear_notification, enable_desktop_notifications,
    mark_all_notifications_read, mark_notification_read, push_notification,
    update_notification_settings, InboxSink, Notification, NotificationCandidate,
    NotificationCategory, NotificationSettings, NotificationSink, NotificationStore,
    SettingsPatch, MAX_NOTIFICATIONS, NOTIFICATIONS,
};
