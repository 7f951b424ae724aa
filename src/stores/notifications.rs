//! Notification inbox store.
//!
//! Single source of truth for what the operator has and has not seen, plus
//! the delivery policy (per-category admission, sound and desktop alerts).
//! The list is ephemeral per session and capacity-bounded, most recent first;
//! settings persist across restarts independently of the list.
//!
//! `unread_count` is maintained incrementally, so every mutation path in
//! [`NotificationStore`] is responsible for keeping it equal to the number of
//! unread records currently in the list.

use chrono::{DateTime, Utc};
use dioxus::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{audio, desktop, storage};

/// Records beyond this are silently dropped, oldest first.
pub const MAX_NOTIFICATIONS: usize = 50;

const SETTINGS_KEY: &str = "vigil_notification_settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Session,
    Beacon,
    Listener,
    Info,
    Warning,
    Error,
}

/// One inbox record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique per record, never reused.
    pub id: String,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    /// Client clock at creation.
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    /// Opaque payload carried through for UI deep-linking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// What a handler wants stored; the store synthesizes id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationCandidate {
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    pub data: Option<Value>,
}

impl NotificationCandidate {
    pub fn new(
        category: NotificationCategory,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            title: title.into(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Delivery settings, persisted across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub sound_enabled: bool,
    pub desktop_enabled: bool,
    pub show_new_sessions: bool,
    pub show_new_beacons: bool,
    pub show_listener_events: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            // Off until the browser permission is actually granted
            desktop_enabled: false,
            show_new_sessions: true,
            show_new_beacons: true,
            show_listener_events: true,
        }
    }
}

impl NotificationSettings {
    /// Per-category admission gate, checked before a record is created.
    pub fn admits(&self, category: NotificationCategory) -> bool {
        match category {
            NotificationCategory::Session => self.show_new_sessions,
            NotificationCategory::Beacon => self.show_new_beacons,
            NotificationCategory::Listener => self.show_listener_events,
            NotificationCategory::Info
            | NotificationCategory::Warning
            | NotificationCategory::Error => true,
        }
    }
}

/// Partial settings update; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub sound_enabled: Option<bool>,
    pub desktop_enabled: Option<bool>,
    pub show_new_sessions: Option<bool>,
    pub show_new_beacons: Option<bool>,
    pub show_listener_events: Option<bool>,
}

/// The inbox state machine. Fields are private so every mutation keeps the
/// unread counter consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationStore {
    items: Vec<Notification>,
    unread: usize,
    settings: NotificationSettings,
}

impl NotificationStore {
    pub fn new(settings: NotificationSettings) -> Self {
        Self {
            items: Vec::new(),
            unread: 0,
            settings,
        }
    }

    /// Fresh store with settings restored from persistent storage.
    pub fn restore() -> Self {
        Self::new(storage::load(SETTINGS_KEY).unwrap_or_default())
    }

    /// Most recent first.
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.unread
    }

    pub fn settings(&self) -> NotificationSettings {
        self.settings
    }

    /// Admit a candidate into the inbox.
    ///
    /// Returns the stored record, or `None` when the category's admission
    /// setting rejected it (no list mutation, no counter change).
    pub fn add(&mut self, candidate: NotificationCandidate) -> Option<&Notification> {
        if !self.settings.admits(candidate.category) {
            return None;
        }

        self.items.insert(
            0,
            Notification {
                id: fresh_id(),
                category: candidate.category,
                title: candidate.title,
                message: candidate.message,
                timestamp: Utc::now(),
                read: false,
                data: candidate.data,
            },
        );
        self.unread += 1;

        // Oldest records fall off the tail; dropped unread ones must leave
        // the counter too.
        while self.items.len() > MAX_NOTIFICATIONS {
            if let Some(dropped) = self.items.pop() {
                if !dropped.read {
                    self.unread -= 1;
                }
            }
        }

        self.items.first()
    }

    /// Flip one record to read. Idempotent; unknown ids are a no-op.
    pub fn mark_as_read(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|n| n.id == id && !n.read) {
            Some(n) => {
                n.read = true;
                self.unread -= 1;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.items {
            n.read = true;
        }
        self.unread = 0;
    }

    /// Remove one record, adjusting the unread counter if needed.
    pub fn clear(&mut self, id: &str) {
        if let Some(pos) = self.items.iter().position(|n| n.id == id) {
            let removed = self.items.remove(pos);
            if !removed.read {
                self.unread -= 1;
            }
        }
    }

    pub fn clear_all(&mut self) {
        self.items.clear();
        self.unread = 0;
    }

    /// Merge a partial settings update. Applies to subsequent admissions
    /// only; existing records are untouched.
    pub fn apply_settings(&mut self, patch: SettingsPatch) {
        let s = &mut self.settings;
        if let Some(v) = patch.sound_enabled {
            s.sound_enabled = v;
        }
        if let Some(v) = patch.desktop_enabled {
            s.desktop_enabled = v;
        }
        if let Some(v) = patch.show_new_sessions {
            s.show_new_sessions = v;
        }
        if let Some(v) = patch.show_new_beacons {
            s.show_new_beacons = v;
        }
        if let Some(v) = patch.show_listener_events {
            s.show_listener_events = v;
        }
    }
}

/// Time-based id with a random suffix.
fn fresh_id() -> String {
    format!(
        "{}-{:08x}",
        Utc::now().timestamp_millis(),
        rand::thread_rng().gen::<u32>()
    )
}

// =========================================
// Global store + side effects
// =========================================

/// Process-wide inbox, read reactively by any number of UI surfaces.
pub static NOTIFICATIONS: GlobalSignal<NotificationStore> =
    Signal::global(NotificationStore::restore);

/// Admit a candidate into the global inbox and fire the enabled alert
/// effects. Sound and desktop failures never propagate to the caller.
pub fn push_notification(candidate: NotificationCandidate) {
    let delivered = {
        let mut store = NOTIFICATIONS.write();
        let settings = store.settings();
        store
            .add(candidate)
            .map(|n| (settings, n.title.clone(), n.message.clone()))
    };

    let Some((settings, title, message)) = delivered else {
        return;
    };
    if settings.sound_enabled {
        audio::play_alert();
    }
    if settings.desktop_enabled {
        desktop::show(&title, &message);
    }
}

pub fn mark_notification_read(id: &str) {
    NOTIFICATIONS.write().mark_as_read(id);
}

pub fn mark_all_notifications_read() {
    NOTIFICATIONS.write().mark_all_read();
}

pub fn clear_notification(id: &str) {
    NOTIFICATIONS.write().clear(id);
}

pub fn clear_all_notifications() {
    NOTIFICATIONS.write().clear_all();
}

/// Merge a partial settings update and persist the result.
pub fn update_notification_settings(patch: SettingsPatch) {
    let settings = {
        let mut store = NOTIFICATIONS.write();
        store.apply_settings(patch);
        store.settings()
    };
    storage::save(SETTINGS_KEY, &settings);
}

/// Ask for browser notification permission, enabling the desktop setting
/// only once it is confirmed granted. Must be called from a user gesture.
pub async fn enable_desktop_notifications() -> bool {
    if desktop::request_permission().await {
        update_notification_settings(SettingsPatch {
            desktop_enabled: Some(true),
            ..Default::default()
        });
        true
    } else {
        false
    }
}

/// Inbox-ingestion seam consumed by the message router.
pub trait NotificationSink {
    fn notify(&self, candidate: NotificationCandidate);
}

/// Live [`NotificationSink`] writing to the global inbox.
#[derive(Clone, Copy, Default)]
pub struct InboxSink;

impl NotificationSink for InboxSink {
    fn notify(&self, candidate: NotificationCandidate) {
        push_notification(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> NotificationStore {
        NotificationStore::new(NotificationSettings::default())
    }

    fn candidate(category: NotificationCategory, title: &str) -> NotificationCandidate {
        NotificationCandidate::new(category, title, "details")
    }

    fn unread_in_list(store: &NotificationStore) -> usize {
        store.items().iter().filter(|n| !n.read).count()
    }

    #[test]
    fn unread_counter_tracks_list_after_every_mutation() {
        let mut store = store();
        for i in 0..10 {
            store.add(candidate(NotificationCategory::Info, &format!("n{}", i)));
            assert_eq!(store.unread_count(), unread_in_list(&store));
        }

        let id = store.items()[3].id.clone();
        store.mark_as_read(&id);
        assert_eq!(store.unread_count(), unread_in_list(&store));

        store.clear(&id);
        assert_eq!(store.unread_count(), unread_in_list(&store));

        let unread_id = store.items()[0].id.clone();
        store.clear(&unread_id);
        assert_eq!(store.unread_count(), unread_in_list(&store));

        store.mark_all_read();
        assert_eq!(store.unread_count(), 0);
        assert_eq!(unread_in_list(&store), 0);

        store.clear_all();
        assert_eq!(store.unread_count(), 0);
        assert!(store.items().is_empty());
    }

    #[test]
    fn mark_as_read_is_idempotent() {
        let mut store = store();
        store.add(candidate(NotificationCategory::Session, "new session"));
        store.add(candidate(NotificationCategory::Session, "another"));
        let id = store.items()[0].id.clone();

        assert!(store.mark_as_read(&id));
        assert_eq!(store.unread_count(), 1);
        assert!(!store.mark_as_read(&id));
        assert_eq!(store.unread_count(), 1);

        assert!(!store.mark_as_read("no-such-id"));
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn list_is_capacity_bounded_most_recent_first() {
        let mut store = store();
        for i in 0..(MAX_NOTIFICATIONS + 7) {
            store.add(candidate(NotificationCategory::Info, &format!("n{}", i)));
        }

        assert_eq!(store.items().len(), MAX_NOTIFICATIONS);
        // Newest at the front, the 7 oldest gone
        assert_eq!(store.items()[0].title, format!("n{}", MAX_NOTIFICATIONS + 6));
        assert_eq!(store.items().last().unwrap().title, "n7");
        assert_eq!(store.unread_count(), MAX_NOTIFICATIONS);
    }

    #[test]
    fn unread_records_falling_off_the_tail_leave_the_counter() {
        let mut store = store();
        for i in 0..MAX_NOTIFICATIONS {
            store.add(candidate(NotificationCategory::Info, &format!("n{}", i)));
        }
        store.mark_all_read();
        assert_eq!(store.unread_count(), 0);

        // Each new record evicts a read one; the counter only counts the new
        // unread records still present.
        store.add(candidate(NotificationCategory::Info, "fresh"));
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.items().len(), MAX_NOTIFICATIONS);
        assert_eq!(store.unread_count(), unread_in_list(&store));
    }

    #[test]
    fn disabled_category_is_a_no_op() {
        let mut store = store();
        store.apply_settings(SettingsPatch {
            show_new_sessions: Some(false),
            ..Default::default()
        });

        assert!(store
            .add(candidate(NotificationCategory::Session, "hidden"))
            .is_none());
        assert!(store.items().is_empty());
        assert_eq!(store.unread_count(), 0);

        // Warnings are not gated by the session toggle
        assert!(store
            .add(candidate(NotificationCategory::Warning, "session lost"))
            .is_some());
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn settings_patch_merges_only_given_fields() {
        let mut store = store();
        store.apply_settings(SettingsPatch {
            sound_enabled: Some(false),
            show_new_beacons: Some(false),
            ..Default::default()
        });

        let settings = store.settings();
        assert!(!settings.sound_enabled);
        assert!(!settings.show_new_beacons);
        assert!(settings.show_new_sessions);
        assert!(settings.show_listener_events);
        assert!(!settings.desktop_enabled);
    }

    #[test]
    fn ids_are_unique_across_a_burst() {
        let mut store = store();
        for _ in 0..20 {
            store.add(candidate(NotificationCategory::Info, "n"));
        }
        let mut ids: Vec<_> = store.items().iter().map(|n| n.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }
}
