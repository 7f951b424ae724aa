//! Inbound frame router.
//!
//! Classifies each decoded frame by its discriminant and fans it out to the
//! three consumer seams: query-cache invalidation, the notification inbox,
//! and transient toasts. Collaborators are constructor-injected so the
//! dispatch table runs identically under test and in the live app. Nothing
//! here may panic on server input; bad frames are logged and dropped.

use std::rc::Rc;

use serde_json::json;

use crate::events::{
    BeaconCheckin, BeaconEvent, RawFrame, ServerEvent, ServerNotice, SessionEvent, TaskCompleted,
};
use crate::query::{keys, QueryInvalidator};
use crate::stores::notifications::{NotificationCandidate, NotificationCategory, NotificationSink};
use crate::toast::{ToastSink, ToastVariant};

pub struct MessageRouter {
    queries: Rc<dyn QueryInvalidator>,
    inbox: Rc<dyn NotificationSink>,
    toasts: Rc<dyn ToastSink>,
}

impl MessageRouter {
    pub fn new(
        queries: Rc<dyn QueryInvalidator>,
        inbox: Rc<dyn NotificationSink>,
        toasts: Rc<dyn ToastSink>,
    ) -> Self {
        Self {
            queries,
            inbox,
            toasts,
        }
    }

    /// Decode and dispatch one text frame.
    ///
    /// Returns the decoded frame shell for the `last_event` observable, or
    /// `None` when the text was not valid JSON. Decode problems never
    /// propagate: a malformed frame must not tear down the connection.
    pub fn route(&self, raw: &str) -> Option<RawFrame> {
        let frame: RawFrame = match serde_json::from_str(raw) {
            Ok(frame) => frame,
            Err(e) => {
                crate::log_warn!("Discarding malformed frame: {}", e);
                return None;
            }
        };

        match ServerEvent::from_frame(&frame) {
            Ok(Some(event)) => self.dispatch(event),
            Ok(None) => {
                crate::log_debug!("Ignoring unknown event type: {}", frame.kind);
            }
            Err(e) => {
                crate::log_warn!("Discarding '{}' frame with bad payload: {}", frame.kind, e);
            }
        }

        Some(frame)
    }

    fn dispatch(&self, event: ServerEvent) {
        match event {
            ServerEvent::SessionConnected(s) => self.on_session_connected(s),
            ServerEvent::SessionDisconnected(s) => self.on_session_disconnected(s),
            ServerEvent::BeaconCheckin(b) => self.on_beacon_checkin(b),
            ServerEvent::BeaconDisconnected(b) => self.on_beacon_disconnected(b),
            ServerEvent::TaskCompleted(t) => self.on_task_completed(t),
            ServerEvent::Notice(n) => self.on_notice(n),
        }
    }

    fn on_session_connected(&self, session: SessionEvent) {
        self.queries.invalidate(keys::SESSIONS);
        self.queries.invalidate(keys::DASHBOARD_STATS);

        let name = display_name(&session.name, &session.id);
        let origin = session.remote_address.as_deref().unwrap_or("unknown address");
        let message = format!("Session {} opened from {}", name, origin);

        self.toasts
            .toast("New session", &message, ToastVariant::Default);
        self.inbox.notify(
            NotificationCandidate::new(NotificationCategory::Session, "New session", message)
                .with_data(json!({ "session_id": session.id })),
        );
    }

    fn on_session_disconnected(&self, session: SessionEvent) {
        self.queries.invalidate(keys::SESSIONS);
        self.queries.invalidate(keys::DASHBOARD_STATS);

        let message = format!(
            "Session {} disconnected",
            display_name(&session.name, &session.id)
        );
        self.toasts
            .toast("Session lost", &message, ToastVariant::Destructive);
        self.inbox.notify(
            NotificationCandidate::new(NotificationCategory::Warning, "Session lost", message)
                .with_data(json!({ "session_id": session.id })),
        );
    }

    fn on_beacon_checkin(&self, beacon: BeaconCheckin) {
        // Caches refresh on every check-in; the user-visible alert fires
        // only for a beacon's first one, or routine check-ins would flood
        // the inbox.
        self.queries.invalidate(keys::BEACONS);
        self.queries.invalidate(keys::DASHBOARD_STATS);

        if !beacon.is_new {
            return;
        }

        let message = format!(
            "Beacon {} checked in for the first time",
            display_name(&beacon.name, &beacon.id)
        );
        self.toasts
            .toast("New beacon", &message, ToastVariant::Default);
        self.inbox.notify(
            NotificationCandidate::new(NotificationCategory::Beacon, "New beacon", message)
                .with_data(json!({ "beacon_id": beacon.id })),
        );
    }

    fn on_beacon_disconnected(&self, beacon: BeaconEvent) {
        self.queries.invalidate(keys::BEACONS);
        self.queries.invalidate(keys::DASHBOARD_STATS);

        let message = format!(
            "Beacon {} missed its check-in window",
            display_name(&beacon.name, &beacon.id)
        );
        self.toasts
            .toast("Beacon lost", &message, ToastVariant::Destructive);
        self.inbox.notify(
            NotificationCandidate::new(NotificationCategory::Warning, "Beacon lost", message)
                .with_data(json!({ "beacon_id": beacon.id })),
        );
    }

    fn on_task_completed(&self, task: TaskCompleted) {
        self.queries.invalidate(&keys::beacon_tasks(&task.beacon_id));

        let message = match (&task.task_type, &task.task_id) {
            (Some(kind), _) => format!("{} task finished on beacon {}", kind, task.beacon_id),
            (None, Some(id)) => format!("Task {} finished on beacon {}", id, task.beacon_id),
            (None, None) => format!("Task finished on beacon {}", task.beacon_id),
        };
        self.toasts
            .toast("Task completed", &message, ToastVariant::Default);
        self.inbox.notify(
            NotificationCandidate::new(NotificationCategory::Info, "Task completed", message)
                .with_data(json!({
                    "beacon_id": task.beacon_id,
                    "task_id": task.task_id,
                })),
        );
    }

    fn on_notice(&self, notice: ServerNotice) {
        let is_error = notice.variant.as_deref() == Some("error");
        let category = if is_error {
            NotificationCategory::Error
        } else {
            NotificationCategory::Info
        };
        let variant = if is_error {
            ToastVariant::Destructive
        } else {
            ToastVariant::Default
        };
        let title = notice.title.as_deref().unwrap_or("Server notification");

        self.toasts.toast(title, &notice.message, variant);
        self.inbox
            .notify(NotificationCandidate::new(category, title, notice.message));
    }
}

fn display_name<'a>(name: &'a str, id: &'a str) -> &'a str {
    if name.is_empty() {
        id
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every side effect the router asks for.
    #[derive(Default)]
    struct Recorder {
        invalidated: RefCell<Vec<String>>,
        notified: RefCell<Vec<NotificationCandidate>>,
        toasted: RefCell<Vec<(String, ToastVariant)>>,
    }

    impl QueryInvalidator for Recorder {
        fn invalidate(&self, key: &str) {
            self.invalidated.borrow_mut().push(key.to_string());
        }
    }

    impl NotificationSink for Recorder {
        fn notify(&self, candidate: NotificationCandidate) {
            self.notified.borrow_mut().push(candidate);
        }
    }

    impl ToastSink for Recorder {
        fn toast(&self, title: &str, _description: &str, variant: ToastVariant) {
            self.toasted.borrow_mut().push((title.to_string(), variant));
        }
    }

    fn router() -> (Rc<Recorder>, MessageRouter) {
        let rec = Rc::new(Recorder::default());
        let router = MessageRouter::new(rec.clone(), rec.clone(), rec.clone());
        (rec, router)
    }

    #[test]
    fn session_connected_end_to_end() {
        let (rec, router) = router();
        let frame = router
            .route(
                r#"{"type":"session_connected","data":{"id":"abc","name":"srv1","remote_address":"10.0.0.5"},"timestamp":"2024-01-01T00:00:00Z"}"#,
            )
            .expect("valid frame");
        assert_eq!(frame.kind, "session_connected");

        assert_eq!(
            *rec.invalidated.borrow(),
            vec!["sessions".to_string(), "dashboard-stats".to_string()]
        );

        let toasted = rec.toasted.borrow();
        assert_eq!(toasted.len(), 1);
        assert_eq!(toasted[0], ("New session".to_string(), ToastVariant::Default));

        let notified = rec.notified.borrow();
        assert_eq!(notified.len(), 1);
        assert_eq!(notified[0].category, NotificationCategory::Session);
        assert_eq!(notified[0].message, "Session srv1 opened from 10.0.0.5");
    }

    #[test]
    fn unknown_type_has_no_side_effects() {
        let (rec, router) = router();
        let frame = router.route(r#"{"type":"operator_joined","data":{"id":"x"}}"#);

        assert!(frame.is_some());
        assert!(rec.invalidated.borrow().is_empty());
        assert!(rec.notified.borrow().is_empty());
        assert!(rec.toasted.borrow().is_empty());
    }

    #[test]
    fn malformed_frame_is_discarded() {
        let (rec, router) = router();
        assert!(router.route("not json at all").is_none());
        assert!(router.route(r#"{"type": 7}"#).is_none());

        assert!(rec.invalidated.borrow().is_empty());
        assert!(rec.notified.borrow().is_empty());
        assert!(rec.toasted.borrow().is_empty());
    }

    #[test]
    fn known_type_with_bad_payload_is_discarded() {
        let (rec, router) = router();
        let frame = router.route(r#"{"type":"task_completed","data":"oops"}"#);

        assert!(frame.is_some());
        assert!(rec.invalidated.borrow().is_empty());
        assert!(rec.notified.borrow().is_empty());
        assert!(rec.toasted.borrow().is_empty());
    }

    #[test]
    fn routine_checkin_refreshes_caches_without_alerting() {
        let (rec, router) = router();
        router.route(r#"{"type":"beacon_checkin","data":{"id":"b1","name":"B","is_new":false}}"#);

        assert_eq!(
            *rec.invalidated.borrow(),
            vec!["beacons".to_string(), "dashboard-stats".to_string()]
        );
        assert!(rec.notified.borrow().is_empty());
        assert!(rec.toasted.borrow().is_empty());
    }

    #[test]
    fn first_checkin_alerts_exactly_once() {
        let (rec, router) = router();
        router.route(r#"{"type":"beacon_checkin","data":{"id":"b1","name":"B","is_new":true}}"#);

        let notified = rec.notified.borrow();
        assert_eq!(notified.len(), 1);
        assert_eq!(notified[0].category, NotificationCategory::Beacon);
        assert_eq!(rec.toasted.borrow().len(), 1);
    }

    #[test]
    fn session_loss_uses_destructive_styling_and_warning_category() {
        let (rec, router) = router();
        router.route(r#"{"type":"session_disconnected","data":{"id":"abc"}}"#);

        assert_eq!(
            rec.toasted.borrow()[0],
            ("Session lost".to_string(), ToastVariant::Destructive)
        );
        assert_eq!(
            rec.notified.borrow()[0].category,
            NotificationCategory::Warning
        );
    }

    #[test]
    fn task_completed_invalidates_the_specific_beacon() {
        let (rec, router) = router();
        router.route(
            r#"{"type":"task_completed","data":{"beacon_id":"b-9","task_id":"t-1","task_type":"shell"}}"#,
        );

        assert_eq!(*rec.invalidated.borrow(), vec!["beacon-tasks:b-9".to_string()]);
        assert_eq!(rec.notified.borrow()[0].category, NotificationCategory::Info);
    }

    #[test]
    fn notice_variant_selects_category_and_styling() {
        let (rec, router) = router();
        router.route(
            r#"{"type":"notification","data":{"title":"Backend","message":"listener died","variant":"error"}}"#,
        );
        router.route(r#"{"type":"notification","data":{"message":"sweep finished"}}"#);

        assert!(rec.invalidated.borrow().is_empty());

        let notified = rec.notified.borrow();
        assert_eq!(notified[0].category, NotificationCategory::Error);
        assert_eq!(notified[1].category, NotificationCategory::Info);

        let toasted = rec.toasted.borrow();
        assert_eq!(toasted[0], ("Backend".to_string(), ToastVariant::Destructive));
        assert_eq!(
            toasted[1],
            ("Server notification".to_string(), ToastVariant::Default)
        );
    }
}
