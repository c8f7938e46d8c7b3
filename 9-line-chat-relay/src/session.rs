//! Per-connection session state.

use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;

/// Opaque identity of one connection, unique for the lifetime of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a session sits in the registration state machine.
///
/// `Unregistered -> Registered -> Terminated`; a failed `NICK` leaves the
/// session where it was and nothing leads back out of `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registered,
    Terminated,
}

/// Item queued for a session's socket writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Text to write verbatim; already newline-terminated.
    Line(String),
    /// Flush everything queued before this marker, then disconnect.
    Close,
}

/// Sending half of a session's outbound queue.
pub type Outbox = mpsc::UnboundedSender<Outbound>;

/// Receiving half, drained only by the session's own worker.
pub type OutboxReceiver = mpsc::UnboundedReceiver<Outbound>;

pub fn outbox() -> (Outbox, OutboxReceiver) {
    mpsc::unbounded_channel()
}

/// Server-side state for one connected client.
///
/// Owned by the connection worker; other tasks only ever see the
/// [`SessionId`] and a clone of the [`Outbox`].
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    nickname: Option<String>,
    state: RegistrationState,
    outbox: Outbox,
}

impl Session {
    pub fn new(id: SessionId, outbox: Outbox) -> Self {
        Self {
            id,
            nickname: None,
            state: RegistrationState::Unregistered,
            outbox,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    pub fn is_registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }

    /// Records a nickname the directory has just bound to this session.
    pub fn mark_registered(&mut self, nickname: String) {
        self.nickname = Some(nickname);
        self.state = RegistrationState::Registered;
    }

    pub fn terminate(&mut self) {
        self.state = RegistrationState::Terminated;
    }

    /// Queues a reply for this session's own client.
    pub fn reply(&self, text: impl Into<String>) {
        if self.outbox.send(Outbound::Line(text.into())).is_err() {
            debug!(session = %self.id, "reply dropped, session writer is gone");
        }
    }
}
