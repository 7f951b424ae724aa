//! Realtime subsystem wiring.
//!
//! [`RealtimeProvider`] owns the link for the whole app: it builds the live
//! collaborators (query invalidation, inbox, toasts), connects once a token
//! exists, reconnects with the fresh credential whenever the token signal
//! changes, and tears the link down on unmount.

use std::rc::Rc;

use dioxus::prelude::*;

use crate::auth::{SessionTokens, ACCESS_TOKEN};
use crate::query::SignalQueries;
use crate::stores::notifications::InboxSink;
use crate::toast::GlobalToasts;
use crate::ws::connection::{sleep_ms, RealtimeLink};
use crate::ws::retry::ReconnectPolicy;
use crate::ws::router::MessageRouter;

/// Gap between a credential change and the follow-up connect, so the new
/// token is the one embedded in the endpoint URL.
const REAUTH_CONNECT_DELAY_MS: u32 = 250;

/// Assemble a link wired to the live global stores.
pub fn build_link() -> RealtimeLink {
    let router = MessageRouter::new(
        Rc::new(SignalQueries),
        Rc::new(InboxSink),
        Rc::new(GlobalToasts),
    );
    RealtimeLink::new(Rc::new(SessionTokens), router, ReconnectPolicy::default())
}

/// Component that manages the realtime connection for its subtree.
///
/// Children reach the link through context (see [`crate::ws::hooks`]).
#[component]
pub fn RealtimeProvider(children: Element) -> Element {
    let link = use_hook(build_link);
    use_context_provider(|| link.clone());

    // Reconnect whenever the credential changes; the first run performs the
    // initial connect.
    use_effect({
        let link = link.clone();
        move || {
            let token = ACCESS_TOKEN.read().clone();
            link.disconnect();
            if token.is_some() {
                let link = link.clone();
                spawn(async move {
                    sleep_ms(REAUTH_CONNECT_DELAY_MS).await;
                    link.connect();
                });
            }
        }
    });

    // Unmount must cancel any pending retry timer and release the socket
    use_drop({
        let link = link.clone();
        move || link.disconnect()
    });

    children
}
