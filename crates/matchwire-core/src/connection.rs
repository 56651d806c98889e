//! Connection lifecycle state machine.
//!
//! Manages the single transport connection: connect/disconnect, heartbeat
//! liveness, reconnection with backoff, and network-state awareness. Uses
//! the action pattern: methods take time as input and return actions for
//! the driver to execute. This keeps the state machine pure (no I/O) and
//! makes testing straightforward.
//!
//! # State Machine
//!
//! ```text
//!                connect()              transport opened
//! ┌──────────────┐      ┌────────────┐      ┌───────────┐
//! │ Disconnected │─────>│ Connecting │─────>│ Connected │
//! └──────────────┘      └────────────┘      └───────────┘
//!        ▲                    │                  │  ▲
//!        │   first attempt    │        drop /    │  │ transport
//!        │   failed           ▼        dead      ▼  │ opened
//!        │              ┌──────────────────────────────┐
//!        └──────────────│         Reconnecting         │<─┐
//!          disconnect() └──────────────────────────────┘  │ retry
//!          auth reject               │                    │ failed
//!                                    └────────────────────┘
//! ```
//!
//! Three paths can trigger a reconnection attempt — heartbeat timeout,
//! network-restored notification, and the scheduled retry timer — and all
//! of them funnel through a single in-flight guard, so concurrent triggers
//! never open two transports.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use matchwire_proto::{ClientEvent, ErrorKind, OutboundMessage, ServerEvent, UserId};

use crate::error::ConnectionError;

/// Interval between heartbeat probes while connected.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum time without a heartbeat ack before the connection is declared
/// dead.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Delay before the first automatic reconnection attempt.
pub const DEFAULT_INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Number of short-interval retries before backing off to the long delay.
pub const DEFAULT_SHORT_RETRY_LIMIT: u32 = 5;

/// Retry delay once the short-interval budget is exhausted. Retries never
/// stop — the user may be offline for an extended period.
pub const DEFAULT_LONG_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Credentials supplied to the transport handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User the session belongs to.
    pub user_id: UserId,
    /// Bearer auth token.
    pub token: String,
}

/// Connection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// No transport, no pending attempt.
    Disconnected,
    /// Caller-initiated first attempt in flight.
    Connecting,
    /// Transport live, heartbeat running.
    Connected,
    /// Transport lost; automatic attempts scheduled or in flight.
    Reconnecting,
}

/// Actions returned by the connection state machine.
///
/// The driver (session layer, test harness) executes these:
/// - `OpenTransport` / `CloseTransport`: transport lifecycle
/// - `Send`: serialize and send the event over the live transport
/// - `QueueOutbound`: hand a durable message to the offline queue
/// - `FlushOutbound`: drain the offline queue over the fresh connection
/// - `PhaseChanged`: notify listeners (drives the "reconnecting…" UI)
/// - `ConnectFailed`: reject the caller's pending first `connect()`
/// - `AuthRejected`: credentials were refused; refresh and reconnect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open the transport with these credentials.
    OpenTransport(Credentials),

    /// Close the transport if one is open.
    CloseTransport,

    /// Send this event on the live transport.
    Send(ClientEvent),

    /// Queue this durable message for later delivery.
    QueueOutbound(OutboundMessage),

    /// Drain the offline queue over the newly live transport.
    FlushOutbound,

    /// The connection phase changed.
    PhaseChanged(ConnectionPhase),

    /// The caller-initiated first attempt failed.
    ConnectFailed {
        /// Transport-level failure description.
        reason: String,
    },

    /// The gateway rejected our auth token.
    AuthRejected {
        /// Gateway error message.
        message: String,
    },
}

/// Connection configuration.
///
/// The defaults mirror the deployed gateway (30s probe, 60s ack window,
/// 1s→30s backoff) but every constant is a field, not a literal.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Interval between heartbeat probes.
    pub heartbeat_interval: Duration,
    /// Ack window before the connection is declared dead. Should be a
    /// multiple of `heartbeat_interval`.
    pub heartbeat_timeout: Duration,
    /// Delay before the first automatic retry; doubles per failure.
    pub initial_retry_delay: Duration,
    /// Failures before backing off to `long_retry_delay`.
    pub short_retry_limit: u32,
    /// Steady retry interval after the short budget is exhausted.
    pub long_retry_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            initial_retry_delay: DEFAULT_INITIAL_RETRY_DELAY,
            short_retry_limit: DEFAULT_SHORT_RETRY_LIMIT,
            long_retry_delay: DEFAULT_LONG_RETRY_DELAY,
        }
    }
}

impl ConnectionConfig {
    /// Delay before retry number `attempt` (0-based).
    ///
    /// Doubles from `initial_retry_delay`, capped at `long_retry_delay`;
    /// pinned to the long delay once the short budget is spent.
    fn retry_delay(&self, attempt: u32) -> Duration {
        if attempt >= self.short_retry_limit {
            return self.long_retry_delay;
        }

        let factor = 1u32 << attempt.min(31);
        self.initial_retry_delay.saturating_mul(factor).min(self.long_retry_delay)
    }
}

/// Connection state machine.
///
/// One value per session, owned by the composition root and passed by
/// reference to whatever needs it — there is no process-wide singleton.
/// At most one transport is open per value; every transition goes through
/// these methods.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug)]
pub struct Connection<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    phase: ConnectionPhase,
    config: ConnectionConfig,
    /// Handshake credentials. Cleared on manual disconnect and auth
    /// rejection — their absence is what suppresses auto-reconnect.
    credentials: Option<Credentials>,
    /// Last heartbeat acknowledgment.
    last_ack: Option<I>,
    /// Last heartbeat probe sent.
    last_probe: Option<I>,
    /// Scheduled retry: when it was armed and how long to wait.
    retry_anchor: Option<(I, Duration)>,
    /// Automatic attempts since the last successful connect.
    reconnect_attempts: u32,
    /// Single in-flight guard shared by every reconnect trigger.
    attempt_in_flight: bool,
    /// Whether the in-flight attempt is the caller-initiated first one.
    initial_attempt: bool,
    /// Last reported device connectivity.
    network_online: bool,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a new disconnected connection.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            config,
            credentials: None,
            last_ack: None,
            last_probe: None,
            retry_anchor: None,
            reconnect_attempts: 0,
            attempt_in_flight: false,
            initial_attempt: false,
            network_online: true,
        }
    }

    /// Current connection phase.
    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Automatic attempts since the last successful connect.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Whether the transport is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    /// Initiate a connection with the given credentials.
    ///
    /// No-op unless `Disconnected` — a live or in-progress connection is
    /// left alone. The first attempt is special: its failure is reported
    /// back through [`ConnectionAction::ConnectFailed`] so the caller can
    /// surface an error, while later automatic retries fail silently into
    /// backoff.
    pub fn connect(&mut self, credentials: Credentials, _now: I) -> Vec<ConnectionAction> {
        if self.phase != ConnectionPhase::Disconnected {
            return Vec::new();
        }

        self.credentials = Some(credentials.clone());
        self.phase = ConnectionPhase::Connecting;
        self.reconnect_attempts = 0;
        self.attempt_in_flight = true;
        self.initial_attempt = true;
        self.retry_anchor = None;

        vec![
            ConnectionAction::OpenTransport(credentials),
            ConnectionAction::PhaseChanged(ConnectionPhase::Connecting),
        ]
    }

    /// User-initiated disconnect.
    ///
    /// Cancels the heartbeat and any scheduled retry atomically with the
    /// phase transition, and clears credentials so that no network-state
    /// change or stale timer can revive the connection. Idempotent.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        if self.phase == ConnectionPhase::Disconnected && self.credentials.is_none() {
            return Vec::new();
        }

        self.phase = ConnectionPhase::Disconnected;
        self.credentials = None;
        self.last_ack = None;
        self.last_probe = None;
        self.retry_anchor = None;
        self.attempt_in_flight = false;
        self.initial_attempt = false;

        vec![
            ConnectionAction::CloseTransport,
            ConnectionAction::PhaseChanged(ConnectionPhase::Disconnected),
        ]
    }

    /// The transport reported a successful connection.
    pub fn transport_opened(&mut self, now: I) -> Vec<ConnectionAction> {
        if self.credentials.is_none() {
            // Manual disconnect raced the attempt; shut the socket down.
            return vec![ConnectionAction::CloseTransport];
        }

        self.phase = ConnectionPhase::Connected;
        self.attempt_in_flight = false;
        self.initial_attempt = false;
        self.reconnect_attempts = 0;
        self.retry_anchor = None;
        self.last_ack = Some(now);
        self.last_probe = Some(now);

        vec![
            ConnectionAction::PhaseChanged(ConnectionPhase::Connected),
            ConnectionAction::FlushOutbound,
        ]
    }

    /// The transport reported a failed connection attempt.
    pub fn transport_failed(&mut self, reason: &str, now: I) -> Vec<ConnectionAction> {
        self.attempt_in_flight = false;

        if self.credentials.is_none() {
            return Vec::new();
        }

        if self.initial_attempt {
            // The one failure that propagates to the caller.
            self.initial_attempt = false;
            self.credentials = None;
            self.phase = ConnectionPhase::Disconnected;

            return vec![
                ConnectionAction::ConnectFailed { reason: reason.to_string() },
                ConnectionAction::PhaseChanged(ConnectionPhase::Disconnected),
            ];
        }

        self.reconnect_attempts += 1;
        let delay = self.config.retry_delay(self.reconnect_attempts);
        self.retry_anchor = Some((now, delay));

        tracing::warn!(
            attempt = self.reconnect_attempts,
            retry_in = ?delay,
            %reason,
            "reconnect attempt failed"
        );

        let mut actions = Vec::new();
        if self.phase != ConnectionPhase::Reconnecting {
            self.phase = ConnectionPhase::Reconnecting;
            actions.push(ConnectionAction::PhaseChanged(ConnectionPhase::Reconnecting));
        }
        actions
    }

    /// The transport dropped mid-session.
    ///
    /// Only unexpected drops trigger reconnection; after a manual
    /// [`Connection::disconnect`] this is a no-op.
    pub fn transport_closed(&mut self, reason: &str, now: I) -> Vec<ConnectionAction> {
        if self.phase == ConnectionPhase::Disconnected || self.credentials.is_none() {
            return Vec::new();
        }

        if self.attempt_in_flight {
            // Some transports report a failed dial as a close.
            return self.transport_failed(reason, now);
        }

        tracing::info!(%reason, "transport dropped, reconnecting");
        self.begin_reconnect(now)
    }

    /// Device connectivity changed.
    ///
    /// A transition from absent to present while holding credentials and
    /// not connected attempts immediately instead of waiting for the
    /// scheduled retry. Ignored while an attempt is already in flight.
    pub fn network_changed(&mut self, online: bool, _now: I) -> Vec<ConnectionAction> {
        let was_online = self.network_online;
        self.network_online = online;

        if !online || was_online || self.credentials.is_none() {
            return Vec::new();
        }

        if self.phase == ConnectionPhase::Connected || self.attempt_in_flight {
            return Vec::new();
        }

        let Some(credentials) = self.credentials.clone() else {
            return Vec::new();
        };

        self.retry_anchor = None;
        self.attempt_in_flight = true;

        let mut actions = Vec::new();
        if self.phase != ConnectionPhase::Reconnecting {
            self.phase = ConnectionPhase::Reconnecting;
            actions.push(ConnectionAction::PhaseChanged(ConnectionPhase::Reconnecting));
        }
        actions.push(ConnectionAction::OpenTransport(credentials));
        actions
    }

    /// Send an event, or queue it if the transport is down.
    ///
    /// Only chat messages are durable; every other event kind is dropped
    /// with a warning when disconnected (a typing indicator from an hour
    /// ago is worse than none).
    ///
    /// # Errors
    ///
    /// `ConnectionError::InvalidState` when no credentials were ever
    /// supplied — sending before `connect()` is caller misuse, reported
    /// synchronously.
    pub fn emit(&mut self, event: ClientEvent) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.credentials.is_none() {
            return Err(ConnectionError::InvalidState { phase: self.phase, operation: "emit" });
        }

        if self.phase == ConnectionPhase::Connected {
            return Ok(vec![ConnectionAction::Send(event)]);
        }

        match event {
            ClientEvent::SendMessage(message) => {
                Ok(vec![ConnectionAction::QueueOutbound(message)])
            },
            other => {
                tracing::warn!(event = ?other, phase = ?self.phase, "dropping non-durable event");
                Ok(Vec::new())
            },
        }
    }

    /// Process an inbound event for liveness and auth handling.
    ///
    /// Delivery of chat payloads happens a layer up; the state machine
    /// only cares about heartbeat acks and auth rejections.
    pub fn handle_inbound(&mut self, event: &ServerEvent, now: I) -> Vec<ConnectionAction> {
        match event {
            ServerEvent::HeartbeatAck => {
                if self.phase == ConnectionPhase::Connected {
                    self.last_ack = Some(now);
                }
                Vec::new()
            },
            ServerEvent::Error(notice) if notice.kind == ErrorKind::Auth => {
                // Rejected credentials are not retried blindly; the
                // application refreshes its token and reconnects.
                self.credentials = None;
                self.retry_anchor = None;
                self.attempt_in_flight = false;
                self.initial_attempt = false;
                self.last_ack = None;
                self.last_probe = None;

                let was_disconnected = self.phase == ConnectionPhase::Disconnected;
                self.phase = ConnectionPhase::Disconnected;

                let mut actions = vec![
                    ConnectionAction::CloseTransport,
                    ConnectionAction::AuthRejected { message: notice.message.clone() },
                ];
                if !was_disconnected {
                    actions.push(ConnectionAction::PhaseChanged(ConnectionPhase::Disconnected));
                }
                actions
            },
            _ => Vec::new(),
        }
    }

    /// Process periodic maintenance (heartbeats and retry timers).
    ///
    /// Call this on every driver tick.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        match self.phase {
            ConnectionPhase::Connected => self.tick_connected(now),
            ConnectionPhase::Reconnecting => self.tick_reconnecting(now),
            _ => Vec::new(),
        }
    }

    fn tick_connected(&mut self, now: I) -> Vec<ConnectionAction> {
        // A silently-stalled socket reports nothing; the missing ack is
        // the only signal.
        if let Some(last) = self.last_ack
            && now - last > self.config.heartbeat_timeout
        {
            tracing::warn!(elapsed = ?(now - last), "no heartbeat ack, declaring connection dead");

            let mut actions = vec![ConnectionAction::CloseTransport];
            actions.extend(self.begin_reconnect(now));
            return actions;
        }

        let probe_due = match self.last_probe {
            None => true,
            Some(last) => now - last >= self.config.heartbeat_interval,
        };

        if probe_due {
            self.last_probe = Some(now);
            return vec![ConnectionAction::Send(ClientEvent::Heartbeat)];
        }

        Vec::new()
    }

    fn tick_reconnecting(&mut self, now: I) -> Vec<ConnectionAction> {
        if self.attempt_in_flight {
            return Vec::new();
        }

        let Some((anchor, delay)) = self.retry_anchor else {
            return Vec::new();
        };

        if now - anchor < delay {
            return Vec::new();
        }

        let Some(credentials) = self.credentials.clone() else {
            return Vec::new();
        };

        self.retry_anchor = None;
        self.attempt_in_flight = true;

        vec![ConnectionAction::OpenTransport(credentials)]
    }

    /// Enter `Reconnecting` and schedule the next attempt.
    ///
    /// Triggers that arrive while an attempt is in flight or a retry is
    /// already scheduled are ignored, not queued.
    fn begin_reconnect(&mut self, now: I) -> Vec<ConnectionAction> {
        if self.attempt_in_flight || self.retry_anchor.is_some() {
            return Vec::new();
        }

        let was_reconnecting = self.phase == ConnectionPhase::Reconnecting;
        self.phase = ConnectionPhase::Reconnecting;
        self.last_ack = None;
        self.last_probe = None;

        let delay = self.config.retry_delay(self.reconnect_attempts);
        self.retry_anchor = Some((now, delay));

        if was_reconnecting {
            Vec::new()
        } else {
            vec![ConnectionAction::PhaseChanged(ConnectionPhase::Reconnecting)]
        }
    }
}
