//! Connection lifecycle state machine.
//!
//! The platform drivers (web_sys callbacks on wasm, a tokio loop on native)
//! feed socket events into [`LinkLifecycle`] and act on the returned
//! [`CloseOutcome`]. Keeping the transitions here, free of any I/O, is what
//! makes the reconnect rules testable: one retry timer per non-clean close,
//! none after an explicit disconnect, none past the attempt budget.

/// WebSocket close code for a deliberate, clean closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Observable state of the realtime link.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// Retry budget exhausted; stays here until an external `connect()`.
    Failed { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. }
        )
    }
}

/// Reconnect behavior: a fixed interval bounded by an attempt cap.
///
/// The interval is deliberately constant rather than exponential; dashboard
/// tabs are short-lived and the cap keeps a dead server from being hammered
/// for long.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay_ms: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 3000,
        }
    }
}

/// What the driver must do after a close event.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    /// Clean closure, or one we initiated: stay down, schedule nothing.
    Settle,
    /// Schedule exactly one reconnect timer for `delay_ms`.
    Retry { attempt: u32, delay_ms: u32 },
    /// Budget exhausted; the link reports disconnected until told otherwise.
    GiveUp,
}

/// Tracks one link's state and retry budget.
#[derive(Debug, Clone)]
pub struct LinkLifecycle {
    state: ConnectionState,
    attempts: u32,
    policy: ReconnectPolicy,
}

impl LinkLifecycle {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            policy,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Enter a connect attempt. Returns `false` when a live or in-flight
    /// link already exists (`connect()` is then a no-op). An external call
    /// from `Disconnected` or `Failed` starts with a fresh retry budget; a
    /// timer-fired call keeps its `Reconnecting` bookkeeping.
    pub fn begin_connect(&mut self) -> bool {
        match &self.state {
            ConnectionState::Connected | ConnectionState::Connecting => false,
            ConnectionState::Reconnecting { .. } => true,
            ConnectionState::Disconnected | ConnectionState::Failed { .. } => {
                self.attempts = 0;
                self.state = ConnectionState::Connecting;
                true
            }
        }
    }

    /// The socket opened; the retry budget refills.
    pub fn opened(&mut self) {
        self.attempts = 0;
        self.state = ConnectionState::Connected;
    }

    /// The socket closed with `code`. Errors never reach here directly; the
    /// close event that follows them drives the transition, so a single
    /// failure can't schedule two timers.
    pub fn closed(&mut self, code: u16) -> CloseOutcome {
        // A close we initiated (or one arriving after giving up) has already
        // settled the state.
        if matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Failed { .. }
        ) {
            return CloseOutcome::Settle;
        }

        if code == NORMAL_CLOSURE {
            self.attempts = 0;
            self.state = ConnectionState::Disconnected;
            return CloseOutcome::Settle;
        }

        if self.attempts >= self.policy.max_attempts {
            self.state = ConnectionState::Failed {
                reason: format!("gave up after {} reconnect attempts", self.attempts),
            };
            return CloseOutcome::GiveUp;
        }

        self.attempts += 1;
        self.state = ConnectionState::Reconnecting {
            attempt: self.attempts,
        };
        CloseOutcome::Retry {
            attempt: self.attempts,
            delay_ms: self.policy.delay_ms,
        }
    }

    /// Explicit disconnect. The only transition that guarantees no further
    /// reconnect: the driver cancels its pending timer alongside this.
    pub fn shutdown(&mut self) {
        self.attempts = 0;
        self.state = ConnectionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle() -> LinkLifecycle {
        LinkLifecycle::new(ReconnectPolicy::default())
    }

    #[test]
    fn connect_is_noop_while_live() {
        let mut link = lifecycle();
        assert!(link.begin_connect());
        assert!(!link.begin_connect());
        link.opened();
        assert!(!link.begin_connect());
        assert!(link.state().is_connected());
    }

    #[test]
    fn non_normal_close_schedules_one_retry_and_increments() {
        let mut link = lifecycle();
        link.begin_connect();
        link.opened();

        let outcome = link.closed(1006);
        assert_eq!(
            outcome,
            CloseOutcome::Retry {
                attempt: 1,
                delay_ms: 3000
            }
        );
        assert_eq!(link.attempts(), 1);
        assert_eq!(*link.state(), ConnectionState::Reconnecting { attempt: 1 });
    }

    #[test]
    fn normal_close_never_retries() {
        let mut link = lifecycle();
        link.begin_connect();
        link.opened();

        assert_eq!(link.closed(NORMAL_CLOSURE), CloseOutcome::Settle);
        assert_eq!(*link.state(), ConnectionState::Disconnected);
        assert_eq!(link.attempts(), 0);
    }

    #[test]
    fn budget_exhaustion_gives_up_then_settles() {
        let mut link = lifecycle();
        link.begin_connect();

        for attempt in 1..=5 {
            match link.closed(1006) {
                CloseOutcome::Retry { attempt: a, .. } => assert_eq!(a, attempt),
                other => panic!("expected retry #{}, got {:?}", attempt, other),
            }
            link.begin_connect();
        }

        assert_eq!(link.closed(1006), CloseOutcome::GiveUp);
        assert!(matches!(link.state(), ConnectionState::Failed { .. }));

        // A straggling close event after giving up schedules nothing
        assert_eq!(link.closed(1006), CloseOutcome::Settle);
    }

    #[test]
    fn successful_open_refills_the_budget() {
        let mut link = lifecycle();
        link.begin_connect();
        link.closed(1006);
        link.begin_connect();
        link.closed(1006);
        assert_eq!(link.attempts(), 2);

        link.begin_connect();
        link.opened();
        assert_eq!(link.attempts(), 0);

        assert_eq!(
            link.closed(1006),
            CloseOutcome::Retry {
                attempt: 1,
                delay_ms: 3000
            }
        );
    }

    #[test]
    fn close_after_shutdown_schedules_nothing() {
        let mut link = lifecycle();
        link.begin_connect();
        link.opened();

        link.shutdown();
        // The socket's own close event trails the explicit disconnect
        assert_eq!(link.closed(1006), CloseOutcome::Settle);
        assert_eq!(*link.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn manual_connect_during_backoff_supersedes_pending_attempt() {
        let mut link = lifecycle();
        link.begin_connect();
        link.opened();
        link.closed(1006);
        assert_eq!(*link.state(), ConnectionState::Reconnecting { attempt: 1 });

        // A manual connect during the backoff window proceeds, so the driver
        // replaces (and must close) whatever socket was already in flight
        assert!(link.begin_connect());
        assert_eq!(link.attempts(), 1);

        link.opened();
        assert_eq!(link.attempts(), 0);
    }

    #[test]
    fn teardown_close_handshake_settles() {
        let mut link = lifecycle();
        link.begin_connect();
        link.opened();

        link.shutdown();
        // After an explicit disconnect the transport reports its own clean
        // closure once the close handshake completes; nothing reschedules
        assert_eq!(link.closed(NORMAL_CLOSURE), CloseOutcome::Settle);
        assert_eq!(*link.state(), ConnectionState::Disconnected);
        assert_eq!(link.attempts(), 0);
    }

    #[test]
    fn manual_connect_after_failure_starts_fresh() {
        let mut link = lifecycle();
        link.begin_connect();
        for _ in 0..5 {
            link.closed(1006);
            link.begin_connect();
        }
        link.closed(1006);
        assert!(matches!(link.state(), ConnectionState::Failed { .. }));

        assert!(link.begin_connect());
        assert_eq!(link.attempts(), 0);
        assert_eq!(*link.state(), ConnectionState::Connecting);
    }
}
