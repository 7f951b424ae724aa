//! Desktop notification delivery.
//!
//! On web this wraps the browser Notification API. Permission must be
//! requested from a user gesture; until it is granted, [`show`] degrades to a
//! no-op without erroring so the inbox path stays unaffected.

#[cfg(target_arch = "wasm32")]
mod wasm {
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Notification, NotificationOptions, NotificationPermission};

    /// Whether the user has already granted notification permission.
    pub fn permission_granted() -> bool {
        Notification::permission() == NotificationPermission::Granted
    }

    /// Ask the browser for notification permission.
    ///
    /// Idempotent: resolves immediately when permission was already decided.
    /// Call this from a user gesture, then enable the desktop setting only on
    /// a `true` result.
    pub async fn request_permission() -> bool {
        if permission_granted() {
            return true;
        }
        let Ok(promise) = Notification::request_permission() else {
            return false;
        };
        match JsFuture::from(promise).await {
            Ok(outcome) => outcome.as_string().as_deref() == Some("granted"),
            Err(_) => false,
        }
    }

    /// Display a desktop notification, silently doing nothing without
    /// permission.
    pub fn show(title: &str, body: &str) {
        if !permission_granted() {
            return;
        }
        let opts = NotificationOptions::new();
        opts.set_body(body);
        opts.set_icon("/assets/icon.png");
        let _ = Notification::new_with_options(title, &opts);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    /// Desktop stub. OS notification centers would need notify-rust or
    /// similar.
    pub fn permission_granted() -> bool {
        false
    }

    pub async fn request_permission() -> bool {
        false
    }

    pub fn show(_title: &str, _body: &str) {}
}

#[cfg(target_arch = "wasm32")]
pub use wasm::{permission_granted, request_permission, show};

#[cfg(not(target_arch = "wasm32"))]
pub use native::{permission_granted, request_permission, show};
