//! Transport abstraction.
//!
//! The engine assumes an existing bidirectional event-based channel; this
//! trait is that assumption made explicit. Production implementations
//! wrap whatever socket library the platform uses. [`ChannelTransport`]
//! is the in-process implementation used by tests and simulation.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use async_trait::async_trait;
use matchwire_core::Credentials;
use matchwire_proto::{ClientEvent, ServerEvent};
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection attempt failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A send on the live connection failed.
    #[error("send failed: {0}")]
    Send(String),
}

/// Something the transport reports upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// A decoded inbound event.
    Event(ServerEvent),

    /// The connection dropped.
    Closed {
        /// Transport-level description of the drop.
        reason: String,
    },
}

/// Bidirectional event-based transport.
///
/// `open` resolves once the gateway acknowledged the connection (or the
/// dial definitively failed). `recv` yields inbound signals until the
/// transport is torn down.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Open the connection with handshake credentials.
    async fn open(&mut self, credentials: &Credentials) -> Result<(), TransportError>;

    /// Send an event on the live connection.
    async fn send(&mut self, event: &ClientEvent) -> Result<(), TransportError>;

    /// Receive the next inbound signal. `None` when the peer side of the
    /// harness is gone for good.
    async fn recv(&mut self) -> Option<TransportSignal>;

    /// Tear the connection down.
    async fn close(&mut self);
}

/// In-process transport over tokio channels.
///
/// The paired [`TransportHarness`] plays the gateway: it observes every
/// open and send, and injects inbound signals.
pub struct ChannelTransport {
    opens: mpsc::UnboundedSender<Credentials>,
    outbound: mpsc::UnboundedSender<ClientEvent>,
    inbound: mpsc::UnboundedReceiver<TransportSignal>,
    open_failures: Arc<AtomicU32>,
    connected: bool,
}

/// Gateway side of a [`ChannelTransport`] pair.
pub struct TransportHarness {
    /// Credentials from every `open` call, in order.
    pub opens: mpsc::UnboundedReceiver<Credentials>,

    /// Every event the client sent, in order.
    pub outbound: mpsc::UnboundedReceiver<ClientEvent>,

    inbound: mpsc::UnboundedSender<TransportSignal>,
    open_failures: Arc<AtomicU32>,
}

impl ChannelTransport {
    /// Create a connected transport/harness pair.
    pub fn pair() -> (Self, TransportHarness) {
        let (opens_tx, opens_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let open_failures = Arc::new(AtomicU32::new(0));

        let transport = Self {
            opens: opens_tx,
            outbound: outbound_tx,
            inbound: inbound_rx,
            open_failures: Arc::clone(&open_failures),
            connected: false,
        };

        let harness = TransportHarness {
            opens: opens_rx,
            outbound: outbound_rx,
            inbound: inbound_tx,
            open_failures,
        };

        (transport, harness)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn open(&mut self, credentials: &Credentials) -> Result<(), TransportError> {
        if self.open_failures.load(Ordering::SeqCst) > 0 {
            self.open_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(TransportError::Connection("injected dial failure".to_string()));
        }

        self.opens
            .send(credentials.clone())
            .map_err(|_| TransportError::Connection("harness gone".to_string()))?;

        self.connected = true;
        Ok(())
    }

    async fn send(&mut self, event: &ClientEvent) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Send("not connected".to_string()));
        }

        self.outbound
            .send(event.clone())
            .map_err(|_| TransportError::Send("harness gone".to_string()))
    }

    async fn recv(&mut self) -> Option<TransportSignal> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.connected = false;
    }
}

impl TransportHarness {
    /// Inject an inbound event as if the gateway sent it.
    pub fn push_event(&self, event: ServerEvent) {
        let _ = self.inbound.send(TransportSignal::Event(event));
    }

    /// Report a connection drop to the client.
    pub fn push_closed(&self, reason: &str) {
        let _ = self.inbound.send(TransportSignal::Closed { reason: reason.to_string() });
    }

    /// Make the next `count` open attempts fail.
    pub fn fail_next_opens(&self, count: u32) {
        self.open_failures.store(count, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials { user_id: "u1".into(), token: "t1".into() }
    }

    #[tokio::test]
    async fn open_records_credentials() {
        let (mut transport, mut harness) = ChannelTransport::pair();

        transport.open(&creds()).await.unwrap();

        assert_eq!(harness.opens.recv().await.unwrap(), creds());
    }

    #[tokio::test]
    async fn send_reaches_the_harness() {
        let (mut transport, mut harness) = ChannelTransport::pair();
        transport.open(&creds()).await.unwrap();

        transport.send(&ClientEvent::Heartbeat).await.unwrap();

        assert_eq!(harness.outbound.recv().await.unwrap(), ClientEvent::Heartbeat);
    }

    #[tokio::test]
    async fn send_before_open_fails() {
        let (mut transport, _harness) = ChannelTransport::pair();

        let result = transport.send(&ClientEvent::Heartbeat).await;
        assert!(matches!(result, Err(TransportError::Send(_))));
    }

    #[tokio::test]
    async fn injected_failures_reject_opens() {
        let (mut transport, harness) = ChannelTransport::pair();
        harness.fail_next_opens(2);

        assert!(transport.open(&creds()).await.is_err());
        assert!(transport.open(&creds()).await.is_err());
        assert!(transport.open(&creds()).await.is_ok());
    }

    #[tokio::test]
    async fn harness_events_arrive_in_order() {
        let (mut transport, harness) = ChannelTransport::pair();

        harness.push_event(ServerEvent::HeartbeatAck);
        harness.push_closed("bye");

        assert_eq!(transport.recv().await.unwrap(), TransportSignal::Event(ServerEvent::HeartbeatAck));
        assert_eq!(
            transport.recv().await.unwrap(),
            TransportSignal::Closed { reason: "bye".to_string() }
        );
    }
}
