//! Native WebSocket driver built on tokio-tungstenite (desktop builds).
//!
//! Transport I/O runs in a spawned task on the app's local executor; the
//! lifecycle rules are the same [`LinkLifecycle`] the web driver uses, with
//! the retry timer expressed as a sleep inside the loop. Cancelling the task
//! on `disconnect()` drops the socket and stops any pending retry.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use dioxus::dioxus_core::Task;
use dioxus::prelude::*;
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::auth::TokenProvider;
use crate::events::{ClientMessage, RawFrame};
use crate::ws::connection::sleep_ms;
use crate::ws::retry::{CloseOutcome, ConnectionState, LinkLifecycle, ReconnectPolicy};
use crate::ws::router::MessageRouter;

const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8000/api/v1/ws";

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
    outbound: RefCell<Option<UnboundedSender<String>>>,
    task: RefCell<Option<Task>>,
    is_connected: Signal<bool>,
    last_event: Signal<Option<RawFrame>>,
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
                outbound: RefCell::new(None),
                task: RefCell::new(None),
                is_connected: Signal::new(false),
                last_event: Signal::new(None),
            }),
        }
    }

    /// Start the connection loop. No-op while one is live or in flight, and
    /// while no access token is available.
    pub fn connect(&self) {
        let inner = &self.inner;
        if inner.tokens.access_token().is_none() {
            crate::log_info!("Realtime connect skipped: no access token yet");
            return;
        }
        if !inner.lifecycle.borrow_mut().begin_connect() {
            return;
        }

        let (tx, rx) = unbounded();
        *inner.outbound.borrow_mut() = Some(tx);

        let weak = Rc::downgrade(inner);
        let task = spawn(run_loop(weak, rx));
        if let Some(old) = inner.task.borrow_mut().replace(task) {
            old.cancel();
        }
    }

    /// Stop the loop and drop the socket. The only path that prevents
    /// auto-reconnect.
    pub fn disconnect(&self) {
        let inner = &self.inner;
        let was_connected = inner.lifecycle.borrow().state().is_connected();
        inner.lifecycle.borrow_mut().shutdown();
        inner.outbound.borrow_mut().take();
        if let Some(task) = inner.task.borrow_mut().take() {
            // While a socket is open the loop owns the teardown: the
            // dropped sender wakes it, it sends the close handshake, and it
            // exits through the settled state. Cancelling here would drop
            // the stream without a Close frame. Outside that window the
            // loop is mid-dial or in a retry wait and holds no open socket.
            if !was_connected {
                task.cancel();
            }
        }
        let mut connected = inner.is_connected;
        connected.set(false);
    }

    /// Serialize and write, only while connected; otherwise the payload is
    /// logged and dropped.
    pub fn send(&self, msg: &ClientMessage) {
        let inner = &self.inner;
        if !inner.lifecycle.borrow().state().is_connected() {
            crate::log_warn!("Dropping outbound message: socket not open");
            return;
        }
        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                crate::log_error!("Serialize failed: {}", e);
                return;
            }
        };
        if let Some(tx) = inner.outbound.borrow().as_ref() {
            let _ = tx.unbounded_send(json);
        }
    }

    /// Keepalive convenience.
    pub fn ping(&self) {
        self.send(&ClientMessage::Ping);
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lifecycle.borrow().state().clone()
    }

    pub fn is_connected(&self) -> Signal<bool> {
        self.inner.is_connected
    }

    pub fn last_event(&self) -> Signal<Option<RawFrame>> {
        self.inner.last_event
    }
}

async fn run_loop(weak: Weak<Inner>, mut outbound: UnboundedReceiver<String>) {
    loop {
        let url = {
            let Some(inner) = weak.upgrade() else { return };
            let Some(token) = inner.tokens.access_token() else {
                crate::log_info!("Realtime loop stopping: access token gone");
                inner.lifecycle.borrow_mut().shutdown();
                return;
            };
            endpoint_url(&token)
        };

        let outcome = match connect_async(&url).await {
            Ok((stream, _response)) => {
                let Some(inner) = weak.upgrade() else { return };
                crate::log_info!("Realtime socket connected");
                inner.lifecycle.borrow_mut().opened();
                let mut connected = inner.is_connected;
                connected.set(true);
                drop(inner);

                let (mut write, mut read) = stream.split();

                let close_code: u16 = loop {
                    tokio::select! {
                        msg = read.next() => match msg {
                            Some(Ok(Message::Text(text))) => {
                                let Some(inner) = weak.upgrade() else { return };
                                if let Some(frame) = inner.router.route(text.as_str()) {
                                    let mut last = inner.last_event;
                                    last.set(Some(frame));
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                break frame.map(|f| u16::from(f.code)).unwrap_or(1006);
                            }
                            Some(Ok(_)) => {
                                // Binary and ping/pong control frames are
                                // not part of this protocol
                            }
                            Some(Err(e)) => {
                                crate::log_error!("Realtime read error: {}", e);
                                break 1006;
                            }
                            None => break 1006,
                        },
                        out = outbound.next() => match out {
                            Some(json) => {
                                if let Err(e) = write.send(Message::text(json)).await {
                                    crate::log_error!("Send failed: {}", e);
                                    break 1006;
                                }
                            }
                            // Sender dropped: the link was torn down. Send
                            // the close handshake before dropping the stream.
                            None => {
                                if let Err(e) = write.close().await {
                                    crate::log_warn!("Close handshake failed: {}", e);
                                }
                                break crate::ws::retry::NORMAL_CLOSURE;
                            }
                        },
                    }
                };

                let Some(inner) = weak.upgrade() else { return };
                crate::log_info!("Realtime socket closed (code {})", close_code);
                let mut connected = inner.is_connected;
                connected.set(false);
                let outcome = inner.lifecycle.borrow_mut().closed(close_code);
                outcome
            }
            Err(e) => {
                crate::log_error!("Realtime connect failed: {}", e);
                let Some(inner) = weak.upgrade() else { return };
                let outcome = inner.lifecycle.borrow_mut().closed(1006);
                outcome
            }
        };

        match outcome {
            CloseOutcome::Retry { attempt, delay_ms } => {
                crate::log_info!("Reconnecting in {}ms (attempt {})", delay_ms, attempt);
                sleep_ms(delay_ms).await;

                let Some(inner) = weak.upgrade() else { return };
                // A disconnect during the wait settles the state; respect it
                let waiting = matches!(
                    inner.lifecycle.borrow().state(),
                    ConnectionState::Reconnecting { .. }
                );
                let resumed = waiting && inner.lifecycle.borrow_mut().begin_connect();
                if !resumed {
                    return;
                }
            }
            CloseOutcome::Settle => return,
            CloseOutcome::GiveUp => {
                crate::log_error!("Realtime reconnect budget exhausted; staying offline");
                return;
            }
        }
    }
}

/// Desktop builds point at the dashboard backend via `VIGIL_WS_URL`.
fn endpoint_url(token: &str) -> String {
    let base = std::env::var("VIGIL_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());
    format!("{}?token={}", base, urlencoding::encode(token))
}
