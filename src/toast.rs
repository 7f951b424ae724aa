//! Transient toast queue.
//!
//! Toasts are short-lived, non-persisted cues rendered by the app shell; the
//! realtime handlers push into the queue through the [`ToastSink`] seam. The
//! queue is bounded so an event burst cannot grow it without limit.

use dioxus::prelude::*;

/// Oldest toasts are dropped past this point.
pub const MAX_TOASTS: usize = 5;

/// Visual styling for a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastVariant {
    #[default]
    Default,
    /// Loss/error styling (session died, beacon lost, server error).
    Destructive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

/// Currently visible toasts, oldest first.
pub static TOASTS: GlobalSignal<Vec<Toast>> = Signal::global(Vec::new);

static NEXT_TOAST_ID: GlobalSignal<u64> = Signal::global(|| 0);

/// Push a toast onto the queue.
pub fn show_toast(
    title: impl Into<String>,
    description: impl Into<String>,
    variant: ToastVariant,
) {
    let id = {
        let mut next = NEXT_TOAST_ID.write();
        *next += 1;
        *next
    };
    let mut toasts = TOASTS.write();
    toasts.push(Toast {
        id,
        title: title.into(),
        description: description.into(),
        variant,
    });
    let overflow = toasts.len().saturating_sub(MAX_TOASTS);
    if overflow > 0 {
        toasts.drain(..overflow);
    }
}

/// Remove a toast (close button or display timeout).
pub fn dismiss_toast(id: u64) {
    TOASTS.write().retain(|t| t.id != id);
}

/// Toast-display seam consumed by the message router.
pub trait ToastSink {
    fn toast(&self, title: &str, description: &str, variant: ToastVariant);
}

/// Live [`ToastSink`] writing to the global queue.
#[derive(Clone, Copy, Default)]
pub struct GlobalToasts;

impl ToastSink for GlobalToasts {
    fn toast(&self, title: &str, description: &str, variant: ToastVariant) {
        show_toast(title, description, variant);
    }
}
