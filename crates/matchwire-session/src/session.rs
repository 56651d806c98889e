//! Chat session orchestration.
//!
//! [`ChatSession`] is the composition root for one signed-in user: it owns
//! the connection state machine, the offline queue, the message cipher,
//! and the listener registry, and wires them together. Like the engine
//! underneath, it is Sans-IO — methods return [`SessionAction`]s for the
//! driver to execute; queue traffic and listener dispatch are absorbed
//! internally.
//!
//! # Decrypt failure policy
//!
//! One undecryptable message must never block the rest of a history page
//! or the live stream. Wherever decryption fails the content becomes
//! [`UNDECRYPTABLE_PLACEHOLDER`], the failure is logged, and processing
//! continues.

use matchwire_core::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionPhase, Credentials, EventDispatcher,
    OfflineMessage, OfflineQueue, SubscriptionId, env::Environment, storage::QueueStore,
};
use matchwire_crypto::{MessageCipher, NONCE_SIZE, SessionSecret};
use matchwire_proto::{
    ClientEvent, EventKind, MatchId, Message, MessageId, MessageKind, OutboundMessage,
    ServerEvent, UserId,
};

use crate::{api::CollaboratorApi, error::SessionError};

/// Sentinel content for messages that failed to decrypt.
pub const UNDECRYPTABLE_PLACEHOLDER: &str = "[Unable to decrypt message]";

/// Actions the session produces for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open the transport with these credentials.
    OpenTransport(Credentials),

    /// Close the transport if one is open.
    CloseTransport,

    /// Send this event on the live transport.
    Send(ClientEvent),

    /// The connection phase changed (also delivered to state listeners).
    PhaseChanged(ConnectionPhase),

    /// The caller-initiated first attempt failed.
    ConnectFailed {
        /// Transport-level failure description.
        reason: String,
    },

    /// The gateway rejected the auth token.
    AuthRejected {
        /// Gateway error message.
        message: String,
    },
}

/// Callback invoked on every connection phase change.
pub type StateCallback = Box<dyn FnMut(ConnectionPhase) + Send>;

struct StateListener {
    id: SubscriptionId,
    callback: StateCallback,
}

/// One signed-in user's chat session.
///
/// Owns one [`Connection`] value — there is no process-wide singleton; the
/// application's composition root owns this and passes it by reference.
pub struct ChatSession<E, S, A>
where
    E: Environment,
    S: QueueStore,
    A: CollaboratorApi,
{
    env: E,
    connection: Connection<E::Instant>,
    queue: OfflineQueue<S>,
    cipher: MessageCipher,
    dispatcher: EventDispatcher,
    state_listeners: Vec<StateListener>,
    next_state_sub: SubscriptionId,
    api: A,
}

impl<E, S, A> ChatSession<E, S, A>
where
    E: Environment,
    S: QueueStore,
    A: CollaboratorApi,
{
    /// Create a session with the default connection configuration.
    pub fn new(env: E, secret: &SessionSecret, store: S, api: A) -> Self {
        Self::with_config(env, secret, store, api, ConnectionConfig::default())
    }

    /// Create a session with explicit heartbeat/backoff configuration.
    pub fn with_config(
        env: E,
        secret: &SessionSecret,
        store: S,
        api: A,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            env,
            connection: Connection::new(config),
            queue: OfflineQueue::new(store),
            cipher: MessageCipher::new(secret),
            dispatcher: EventDispatcher::new(),
            state_listeners: Vec::new(),
            next_state_sub: 0,
            api,
        }
    }

    /// Current connection phase.
    pub fn phase(&self) -> ConnectionPhase {
        self.connection.phase()
    }

    /// Number of messages awaiting a live connection.
    pub fn pending_outbound(&self) -> usize {
        self.queue.len()
    }

    /// The session's environment (time and randomness source).
    pub fn env(&self) -> &E {
        &self.env
    }

    // ---- connection lifecycle -------------------------------------------

    /// Initiate a connection.
    ///
    /// The driver resolves the caller's pending future on the resulting
    /// [`SessionAction::PhaseChanged`] (connected) or
    /// [`SessionAction::ConnectFailed`].
    pub fn connect(
        &mut self,
        user_id: UserId,
        token: String,
        now: E::Instant,
    ) -> Vec<SessionAction> {
        let actions = self.connection.connect(Credentials { user_id, token }, now);
        self.process(actions)
    }

    /// User-initiated disconnect. Safe to call repeatedly; leaves no armed
    /// timers behind.
    pub fn disconnect(&mut self) -> Vec<SessionAction> {
        let actions = self.connection.disconnect();
        self.process(actions)
    }

    /// Device connectivity changed.
    pub fn network_changed(&mut self, online: bool, now: E::Instant) -> Vec<SessionAction> {
        let actions = self.connection.network_changed(online, now);
        self.process(actions)
    }

    /// The transport reported a successful connection.
    pub fn transport_opened(&mut self, now: E::Instant) -> Vec<SessionAction> {
        let actions = self.connection.transport_opened(now);
        self.process(actions)
    }

    /// The transport reported a failed connection attempt.
    pub fn transport_failed(&mut self, reason: &str, now: E::Instant) -> Vec<SessionAction> {
        let actions = self.connection.transport_failed(reason, now);
        self.process(actions)
    }

    /// The transport dropped mid-session.
    pub fn transport_closed(&mut self, reason: &str, now: E::Instant) -> Vec<SessionAction> {
        let actions = self.connection.transport_closed(reason, now);
        self.process(actions)
    }

    /// Periodic maintenance; call on every driver tick.
    pub fn tick(&mut self, now: E::Instant) -> Vec<SessionAction> {
        let actions = self.connection.tick(now);
        self.process(actions)
    }

    // ---- outbound -------------------------------------------------------

    /// Enter a conversation channel.
    pub fn join_match(&mut self, match_id: MatchId) -> Result<Vec<SessionAction>, SessionError> {
        self.emit(ClientEvent::JoinMatch { match_id })
    }

    /// Leave a conversation channel.
    pub fn leave_match(&mut self, match_id: MatchId) -> Result<Vec<SessionAction>, SessionError> {
        self.emit(ClientEvent::LeaveMatch { match_id })
    }

    /// Seal and send a text message.
    ///
    /// Suspends only for the CPU-bound seal; delivery confidence comes
    /// from the offline queue and flush, not from awaiting a server ack.
    pub fn send_message(
        &mut self,
        match_id: MatchId,
        content: &str,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let mut nonce = [0u8; NONCE_SIZE];
        self.env.random_bytes(&mut nonce);
        let sealed = self.cipher.seal(content, nonce);

        self.emit(ClientEvent::SendMessage(OutboundMessage {
            match_id,
            content: sealed,
            kind: MessageKind::Text,
        }))
    }

    /// Upload an image and send the resulting reference.
    ///
    /// Image bodies are never sealed — the reference points at an asset
    /// the upload endpoint already access-controls.
    pub async fn send_image(
        &mut self,
        match_id: MatchId,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let reference = self.api.upload_chat_image(bytes, content_type).await?;

        self.emit(ClientEvent::SendMessage(OutboundMessage {
            match_id,
            content: reference,
            kind: MessageKind::Image,
        }))
    }

    /// Acknowledge messages as read. Best-effort.
    pub fn mark_as_read(
        &mut self,
        match_id: MatchId,
        message_ids: Vec<MessageId>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        self.emit(ClientEvent::MarkAsRead { match_id, message_ids })
    }

    /// Begin a typing indicator. Best-effort.
    pub fn start_typing(&mut self, match_id: MatchId) -> Result<Vec<SessionAction>, SessionError> {
        self.emit(ClientEvent::TypingStart { match_id })
    }

    /// End a typing indicator. Best-effort.
    pub fn stop_typing(&mut self, match_id: MatchId) -> Result<Vec<SessionAction>, SessionError> {
        self.emit(ClientEvent::TypingStop { match_id })
    }

    /// Request presence for a set of users. Best-effort.
    pub fn get_online_status(
        &mut self,
        user_ids: Vec<UserId>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        self.emit(ClientEvent::GetOnlineStatus { user_ids })
    }

    // ---- inbound --------------------------------------------------------

    /// Process an inbound transport event.
    ///
    /// Liveness and auth handling run first; chat payloads are decrypted
    /// and dispatched to listeners. A redelivery batch is replayed as
    /// individual `new-message` deliveries.
    pub fn handle_inbound(&mut self, event: ServerEvent, now: E::Instant) -> Vec<SessionAction> {
        let actions = self.connection.handle_inbound(&event, now);
        let out = self.process(actions);

        match event {
            ServerEvent::NewMessage { match_id, message } => {
                let message = self.decrypt_message(message);
                self.dispatcher.dispatch(&ServerEvent::NewMessage { match_id, message });
            },
            ServerEvent::OfflineMessages { messages, has_more } => {
                for message in messages {
                    let match_id = message.match_id.clone();
                    let message = self.decrypt_message(message);
                    self.dispatcher.dispatch(&ServerEvent::NewMessage { match_id, message });
                }
                if has_more {
                    tracing::debug!("server holds more redelivered messages");
                }
            },
            other => {
                self.dispatcher.dispatch(&other);
            },
        }

        out
    }

    /// Fetch one page of history, decrypting every sealed text message.
    pub async fn get_history(
        &self,
        match_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>, SessionError> {
        let messages = self.api.fetch_messages(match_id, page, limit).await?;

        Ok(messages.into_iter().map(|message| self.decrypt_message(message)).collect())
    }

    // ---- listeners ------------------------------------------------------

    /// Register a callback for an inbound event kind.
    ///
    /// `new-message` callbacks always observe decrypted content (or the
    /// placeholder).
    pub fn on(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&ServerEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.dispatcher.on(kind, callback)
    }

    /// Register a callback removed after its first delivery.
    pub fn once(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&ServerEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.dispatcher.once(kind, callback)
    }

    /// Remove one event subscription.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.dispatcher.off(id)
    }

    /// Remove every subscription for an event kind. Returns how many.
    pub fn off_event(&mut self, kind: EventKind) -> usize {
        self.dispatcher.off_event(kind)
    }

    /// Register a callback for connection phase changes.
    pub fn on_state_change(
        &mut self,
        callback: impl FnMut(ConnectionPhase) + Send + 'static,
    ) -> SubscriptionId {
        let id = self.next_state_sub;
        self.next_state_sub += 1;
        self.state_listeners.push(StateListener { id, callback: Box::new(callback) });
        id
    }

    /// Remove one state-change subscription.
    pub fn off_state_change(&mut self, id: SubscriptionId) -> bool {
        let before = self.state_listeners.len();
        self.state_listeners.retain(|l| l.id != id);
        self.state_listeners.len() != before
    }

    /// Remove every subscription this session registered. Idempotent.
    pub fn remove_all_listeners(&mut self) {
        self.dispatcher.remove_all();
        self.state_listeners.clear();
    }

    // ---- internals ------------------------------------------------------

    fn emit(&mut self, event: ClientEvent) -> Result<Vec<SessionAction>, SessionError> {
        let actions = self.connection.emit(event)?;
        Ok(self.process(actions))
    }

    /// Absorb queue traffic and notifications; pass transport work out.
    fn process(&mut self, actions: Vec<ConnectionAction>) -> Vec<SessionAction> {
        let mut out = Vec::new();

        for action in actions {
            match action {
                ConnectionAction::OpenTransport(credentials) => {
                    out.push(SessionAction::OpenTransport(credentials));
                },
                ConnectionAction::CloseTransport => {
                    out.push(SessionAction::CloseTransport);
                },
                ConnectionAction::Send(event) => {
                    out.push(SessionAction::Send(event));
                },
                ConnectionAction::QueueOutbound(message) => {
                    let id = self.env.random_u64();
                    let match_id = message.match_id.clone();
                    self.queue.enqueue(OfflineMessage { id, match_id, message });
                },
                ConnectionAction::FlushOutbound => {
                    // Strict FIFO: queued messages go out before anything
                    // composed after the reconnect.
                    for queued in self.queue.flush() {
                        out.push(SessionAction::Send(ClientEvent::SendMessage(queued.message)));
                    }
                },
                ConnectionAction::PhaseChanged(phase) => {
                    for listener in &mut self.state_listeners {
                        (listener.callback)(phase);
                    }
                    out.push(SessionAction::PhaseChanged(phase));
                },
                ConnectionAction::ConnectFailed { reason } => {
                    out.push(SessionAction::ConnectFailed { reason });
                },
                ConnectionAction::AuthRejected { message } => {
                    out.push(SessionAction::AuthRejected { message });
                },
            }
        }

        out
    }

    fn decrypt_message(&self, mut message: Message) -> Message {
        if !message.needs_decryption() {
            return message;
        }

        match self.cipher.open(&message.content) {
            Ok(plaintext) => message.content = plaintext,
            Err(error) => {
                tracing::warn!(message_id = %message.id, %error, "failed to decrypt message");
                message.content = UNDECRYPTABLE_PLACEHOLDER.to_string();
            },
        }

        message
    }
}
