//! Web WebSocket driver built on `web_sys::WebSocket`.
//!
//! The socket's event handlers hold only a `Weak` back-reference and are
//! stored on the owning struct rather than leaked, so tearing the link down
//! actually releases the socket and its closures. The pending reconnect
//! timer is likewise owned here and cancelled on `disconnect()`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use dioxus::prelude::*;
use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;
use web_sys::js_sys;
use web_sys::{CloseEvent, ErrorEvent, Event, MessageEvent, WebSocket};

use crate::auth::TokenProvider;
use crate::events::{ClientMessage, RawFrame};
use crate::ws::retry::{
    CloseOutcome, ConnectionState, LinkLifecycle, ReconnectPolicy, NORMAL_CLOSURE,
};
use crate::ws::router::MessageRouter;

const WS_PATH: &str = "/api/v1/ws";

/// Handle to the realtime link. Cheap to clone; all clones drive the same
/// underlying socket.
#[derive(Clone)]
pub struct RealtimeLink {
    inner: Rc<Inner>,
}

struct Inner {
    tokens: Rc<dyn TokenProvider>,
    router: MessageRouter,
    lifecycle: RefCell<LinkLifecycle>,
    socket: RefCell<Option<Socket>>,
    retry_timer: RefCell<Option<Timeout>>,
    is_connected: Signal<bool>,
    last_event: Signal<Option<RawFrame>>,
}

/// The live socket together with its attached handlers. Dropping this
/// detaches and releases the closures.
struct Socket {
    ws: WebSocket,
    _onopen: Closure<dyn FnMut(Event)>,
    _onmessage: Closure<dyn FnMut(MessageEvent)>,
    _onerror: Closure<dyn FnMut(ErrorEvent)>,
    _onclose: Closure<dyn FnMut(CloseEvent)>,
}

impl Socket {
    fn detach(&self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onerror(None);
        self.ws.set_onclose(None);
    }
}

impl RealtimeLink {
    pub fn new(
        tokens: Rc<dyn TokenProvider>,
        router: MessageRouter,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                tokens,
                router,
                lifecycle: RefCell::new(LinkLifecycle::new(policy)),
                socket: RefCell::new(None),
                retry_timer: RefCell::new(None),
                is_connected: Signal::new(false),
                last_event: Signal::new(None),
            }),
        }
    }

    /// Open the socket. No-op while a live or in-flight connection exists,
    /// and while no access token is available (the expected state before
    /// login, not an error).
    pub fn connect(&self) {
        Inner::connect(&self.inner);
    }

    /// Close cleanly and cancel any pending reconnect. The only path that
    /// prevents auto-reconnect.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Serialize and write, only while the socket is open; otherwise the
    /// payload is logged and dropped.
    pub fn send(&self, msg: &ClientMessage) {
        self.inner.send(msg);
    }

    /// Keepalive convenience.
    pub fn ping(&self) {
        self.send(&ClientMessage::Ping);
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lifecycle.borrow().state().clone()
    }

    /// Reactive connection flag.
    pub fn is_connected(&self) -> Signal<bool> {
        self.inner.is_connected
    }

    /// Most recently decoded frame, a diagnostic and testing hook.
    pub fn last_event(&self) -> Signal<Option<RawFrame>> {
        self.inner.last_event
    }
}

impl Inner {
    fn connect(inner: &Rc<Inner>) {
        let Some(token) = inner.tokens.access_token() else {
            crate::log_info!("Realtime connect skipped: no access token yet");
            return;
        };

        if !inner.lifecycle.borrow_mut().begin_connect() {
            return;
        }

        // A manual connect supersedes whatever timer was pending
        inner.retry_timer.borrow_mut().take();

        let Some(url) = endpoint_url(&token) else {
            crate::log_error!("Realtime connect failed: no window location");
            inner.lifecycle.borrow_mut().shutdown();
            return;
        };

        let ws = match WebSocket::new(&url) {
            Ok(ws) => ws,
            Err(e) => {
                crate::log_error!("Failed to create WebSocket: {:?}", e);
                inner.lifecycle.borrow_mut().shutdown();
                return;
            }
        };

        let weak = Rc::downgrade(inner);
        let onopen = Closure::wrap(Box::new(move |_: Event| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_open();
            }
        }) as Box<dyn FnMut(Event)>);
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));

        let weak = Rc::downgrade(inner);
        let onmessage = Closure::wrap(Box::new(move |e: MessageEvent| {
            if let Ok(text) = e.data().dyn_into::<js_sys::JsString>() {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_frame(&String::from(text));
                }
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

        // Errors log only; the close event that follows drives the state
        // transition, so one failure can't schedule two timers.
        let onerror = Closure::wrap(Box::new(move |_: ErrorEvent| {
            crate::log_error!("Realtime socket error");
        }) as Box<dyn FnMut(ErrorEvent)>);
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        let weak = Rc::downgrade(inner);
        let onclose = Closure::wrap(Box::new(move |e: CloseEvent| {
            if let Some(inner) = weak.upgrade() {
                Inner::handle_close(&inner, e.code(), &e.reason());
            }
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

        // Replacing the slot supersedes the previous socket, if any. It must
        // be closed as well as detached: a handshake still in flight would
        // otherwise complete server-side into an open socket nobody owns.
        if let Some(old) = inner.socket.borrow_mut().replace(Socket {
            ws,
            _onopen: onopen,
            _onmessage: onmessage,
            _onerror: onerror,
            _onclose: onclose,
        }) {
            old.detach();
            let _ = old
                .ws
                .close_with_code_and_reason(NORMAL_CLOSURE, "superseded");
        }
    }

    fn handle_open(&self) {
        crate::log_info!("Realtime socket connected");
        self.lifecycle.borrow_mut().opened();
        self.retry_timer.borrow_mut().take();
        let mut connected = self.is_connected;
        connected.set(true);
    }

    fn handle_frame(&self, text: &str) {
        if let Some(frame) = self.router.route(text) {
            let mut last = self.last_event;
            last.set(Some(frame));
        }
    }

    fn handle_close(inner: &Rc<Inner>, code: u16, reason: &str) {
        crate::log_info!("Realtime socket closed (code {}): {}", code, reason);

        // Only the socket in the slot can deliver this event; superseded
        // sockets are detached first. Release it now instead of holding a
        // dead handle until the next connect.
        if let Some(socket) = inner.socket.borrow_mut().take() {
            socket.detach();
        }

        let mut connected = inner.is_connected;
        connected.set(false);

        let outcome = inner.lifecycle.borrow_mut().closed(code);
        match outcome {
            CloseOutcome::Settle => {}
            CloseOutcome::Retry { attempt, delay_ms } => {
                crate::log_info!("Reconnecting in {}ms (attempt {})", delay_ms, attempt);
                Inner::schedule_retry(inner, delay_ms);
            }
            CloseOutcome::GiveUp => {
                crate::log_error!("Realtime reconnect budget exhausted; staying offline");
            }
        }
    }

    fn schedule_retry(inner: &Rc<Inner>, delay_ms: u32) {
        let weak: Weak<Inner> = Rc::downgrade(inner);
        let timer = Timeout::new(delay_ms, move || {
            if let Some(inner) = weak.upgrade() {
                Inner::connect(&inner);
            }
        });
        *inner.retry_timer.borrow_mut() = Some(timer);
    }

    fn disconnect(&self) {
        // Dropping the pending timer cancels it
        self.retry_timer.borrow_mut().take();
        self.lifecycle.borrow_mut().shutdown();

        if let Some(socket) = self.socket.borrow_mut().take() {
            socket.detach();
            let _ = socket
                .ws
                .close_with_code_and_reason(NORMAL_CLOSURE, "client disconnect");
        }

        let mut connected = self.is_connected;
        connected.set(false);
    }

    fn send(&self, msg: &ClientMessage) {
        let socket = self.socket.borrow();
        let Some(socket) = socket
            .as_ref()
            .filter(|s| s.ws.ready_state() == WebSocket::OPEN)
        else {
            crate::log_warn!("Dropping outbound message: socket not open");
            return;
        };

        match serde_json::to_string(msg) {
            Ok(json) => {
                if let Err(e) = socket.ws.send_with_str(&json) {
                    crate::log_warn!("Send failed: {:?}", e);
                }
            }
            Err(e) => {
                crate::log_error!("Serialize failed: {}", e);
            }
        }
    }
}

/// Endpoint mirrors the page's own transport security, with the token as a
/// query parameter.
fn endpoint_url(token: &str) -> Option<String> {
    let window = web_sys::window()?;
    let location = window.location();
    let scheme = match location.protocol().ok()?.as_str() {
        "https:" => "wss",
        _ => "ws",
    };
    let host = location.host().ok()?;
    Some(format!(
        "{}://{}{}?token={}",
        scheme,
        host,
        WS_PATH,
        urlencoding::encode(token)
    ))
}
