//! Tokio driver for the chat session.
//!
//! The driver owns the transport and the timers and executes the actions
//! the Sans-IO session produces. Applications talk to a running driver
//! through [`SessionHandle`]; only `connect()` suspends the caller, and
//! only its first attempt can reject — every later failure is internal
//! backoff plus state-change notifications.

use std::{collections::VecDeque, time::Duration};

use matchwire_core::{ConnectionPhase, env::Environment, storage::QueueStore};
use matchwire_proto::{MatchId, MessageId, UserId};
use tokio::sync::{mpsc, oneshot};

use crate::{
    api::CollaboratorApi,
    error::SessionError,
    session::{ChatSession, SessionAction},
    transport::{Transport, TransportSignal},
};

/// Interval between maintenance ticks fed to the session.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

type ConnectReply = oneshot::Sender<Result<(), SessionError>>;

/// Commands the handle sends to the driver.
enum SessionCommand {
    Connect { user_id: UserId, token: String, reply: ConnectReply },
    Disconnect,
    JoinMatch { match_id: MatchId },
    LeaveMatch { match_id: MatchId },
    SendText { match_id: MatchId, content: String },
    MarkAsRead { match_id: MatchId, message_ids: Vec<MessageId> },
    Typing { match_id: MatchId, active: bool },
    QueryOnlineStatus { user_ids: Vec<UserId> },
    NetworkChanged { online: bool },
    Shutdown,
}

/// Application-facing handle to a running [`SessionDriver`].
///
/// Cheap to clone; every clone talks to the same driver task.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Connect with the given credentials.
    ///
    /// Suspends until the first attempt resolves. Reconnections after a
    /// later drop are automatic and fire-and-forget.
    pub async fn connect(&self, user_id: UserId, token: String) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();

        self.commands
            .send(SessionCommand::Connect { user_id, token, reply })
            .map_err(|_| SessionError::DriverClosed)?;

        response.await.map_err(|_| SessionError::DriverClosed)?
    }

    /// Disconnect and suppress automatic reconnection.
    pub fn disconnect(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Disconnect)
    }

    /// Enter a conversation channel.
    pub fn join_match(&self, match_id: MatchId) -> Result<(), SessionError> {
        self.send(SessionCommand::JoinMatch { match_id })
    }

    /// Leave a conversation channel.
    pub fn leave_match(&self, match_id: MatchId) -> Result<(), SessionError> {
        self.send(SessionCommand::LeaveMatch { match_id })
    }

    /// Seal and send a text message. Does not wait for delivery — offline
    /// messages are queued and flushed on reconnect.
    pub fn send_text(&self, match_id: MatchId, content: String) -> Result<(), SessionError> {
        self.send(SessionCommand::SendText { match_id, content })
    }

    /// Acknowledge messages as read.
    pub fn mark_as_read(
        &self,
        match_id: MatchId,
        message_ids: Vec<MessageId>,
    ) -> Result<(), SessionError> {
        self.send(SessionCommand::MarkAsRead { match_id, message_ids })
    }

    /// Set the typing indicator.
    pub fn set_typing(&self, match_id: MatchId, active: bool) -> Result<(), SessionError> {
        self.send(SessionCommand::Typing { match_id, active })
    }

    /// Request presence for a set of users.
    pub fn query_online_status(&self, user_ids: Vec<UserId>) -> Result<(), SessionError> {
        self.send(SessionCommand::QueryOnlineStatus { user_ids })
    }

    /// Report a device connectivity change.
    pub fn network_changed(&self, online: bool) -> Result<(), SessionError> {
        self.send(SessionCommand::NetworkChanged { online })
    }

    /// Stop the driver task.
    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown)
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::DriverClosed)
    }
}

/// Event loop binding a [`ChatSession`] to a [`Transport`].
pub struct SessionDriver<E, S, A, T>
where
    E: Environment,
    S: QueueStore,
    A: CollaboratorApi,
    T: Transport,
{
    session: ChatSession<E, S, A>,
    transport: T,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
}

impl<E, S, A, T> SessionDriver<E, S, A, T>
where
    E: Environment,
    S: QueueStore,
    A: CollaboratorApi,
    T: Transport,
{
    /// Create a driver and its handle.
    pub fn new(session: ChatSession<E, S, A>, transport: T) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();

        (Self { session, transport, commands: rx }, SessionHandle { commands: tx })
    }

    /// The session, for registering listeners before [`SessionDriver::run`].
    pub fn session_mut(&mut self) -> &mut ChatSession<E, S, A> {
        &mut self.session
    }

    /// Run the event loop until shutdown.
    pub async fn run(self) {
        let Self { mut session, mut transport, mut commands } = self;
        let env = session.env().clone();
        let mut pending_connect: Option<ConnectReply> = None;

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    let quit = handle_command(
                        command,
                        &mut session,
                        &mut transport,
                        &mut pending_connect,
                        &env,
                    )
                    .await;
                    if quit {
                        break;
                    }
                },
                signal = transport.recv() => {
                    let actions = match signal {
                        Some(TransportSignal::Event(event)) => {
                            session.handle_inbound(event, env.now())
                        },
                        Some(TransportSignal::Closed { reason }) => {
                            session.transport_closed(&reason, env.now())
                        },
                        None => session.transport_closed("transport endpoint gone", env.now()),
                    };
                    execute(actions, &mut session, &mut transport, &mut pending_connect, &env)
                        .await;
                },
                () = env.sleep(TICK_INTERVAL) => {
                    let actions = session.tick(env.now());
                    execute(actions, &mut session, &mut transport, &mut pending_connect, &env)
                        .await;
                },
            }
        }

        transport.close().await;
    }
}

/// Process one command. Returns true on shutdown.
async fn handle_command<E, S, A, T>(
    command: SessionCommand,
    session: &mut ChatSession<E, S, A>,
    transport: &mut T,
    pending_connect: &mut Option<ConnectReply>,
    env: &E,
) -> bool
where
    E: Environment,
    S: QueueStore,
    A: CollaboratorApi,
    T: Transport,
{
    let actions = match command {
        SessionCommand::Connect { user_id, token, reply } => {
            if pending_connect.is_some() {
                let _ = reply.send(Err(SessionError::ConnectInProgress));
                return false;
            }

            let actions = session.connect(user_id, token, env.now());
            if actions.is_empty() {
                // connect() no-ops unless disconnected
                let result = if session.phase() == ConnectionPhase::Connected {
                    Ok(())
                } else {
                    Err(SessionError::ConnectInProgress)
                };
                let _ = reply.send(result);
                return false;
            }

            *pending_connect = Some(reply);
            actions
        },
        SessionCommand::Disconnect => session.disconnect(),
        SessionCommand::JoinMatch { match_id } => report(session.join_match(match_id)),
        SessionCommand::LeaveMatch { match_id } => report(session.leave_match(match_id)),
        SessionCommand::SendText { match_id, content } => {
            report(session.send_message(match_id, &content))
        },
        SessionCommand::MarkAsRead { match_id, message_ids } => {
            report(session.mark_as_read(match_id, message_ids))
        },
        SessionCommand::Typing { match_id, active } => {
            let result = if active {
                session.start_typing(match_id)
            } else {
                session.stop_typing(match_id)
            };
            report(result)
        },
        SessionCommand::QueryOnlineStatus { user_ids } => {
            report(session.get_online_status(user_ids))
        },
        SessionCommand::NetworkChanged { online } => session.network_changed(online, env.now()),
        SessionCommand::Shutdown => return true,
    };

    execute(actions, session, transport, pending_connect, env).await;
    false
}

/// Log misuse from fire-and-forget commands; they have no reply channel.
fn report(result: Result<Vec<SessionAction>, SessionError>) -> Vec<SessionAction> {
    match result {
        Ok(actions) => actions,
        Err(error) => {
            tracing::warn!(%error, "command rejected");
            Vec::new()
        },
    }
}

/// Execute session actions, feeding transport outcomes back in until the
/// worklist drains.
async fn execute<E, S, A, T>(
    actions: Vec<SessionAction>,
    session: &mut ChatSession<E, S, A>,
    transport: &mut T,
    pending_connect: &mut Option<ConnectReply>,
    env: &E,
) where
    E: Environment,
    S: QueueStore,
    A: CollaboratorApi,
    T: Transport,
{
    let mut worklist: VecDeque<SessionAction> = actions.into();

    while let Some(action) = worklist.pop_front() {
        match action {
            SessionAction::OpenTransport(credentials) => match transport.open(&credentials).await {
                Ok(()) => worklist.extend(session.transport_opened(env.now())),
                Err(error) => {
                    worklist.extend(session.transport_failed(&error.to_string(), env.now()));
                },
            },
            SessionAction::CloseTransport => transport.close().await,
            SessionAction::Send(event) => {
                if let Err(error) = transport.send(&event).await {
                    worklist.extend(session.transport_closed(&error.to_string(), env.now()));
                }
            },
            SessionAction::PhaseChanged(phase) => {
                if phase == ConnectionPhase::Connected
                    && let Some(reply) = pending_connect.take()
                {
                    let _ = reply.send(Ok(()));
                }
            },
            SessionAction::ConnectFailed { reason } => {
                if let Some(reply) = pending_connect.take() {
                    let _ = reply.send(Err(SessionError::ConnectFailed { reason }));
                } else {
                    tracing::warn!(%reason, "connect failed with no pending caller");
                }
            },
            SessionAction::AuthRejected { message } => {
                if let Some(reply) = pending_connect.take() {
                    let _ = reply.send(Err(SessionError::AuthRejected { message }));
                } else {
                    tracing::warn!(%message, "auth rejected by gateway");
                }
            },
        }
    }
}
