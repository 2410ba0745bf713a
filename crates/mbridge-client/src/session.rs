//! Per-operation session state machine.
//!
//! A session owns exactly one connection for exactly one logical operation:
//!
//! ```text
//! Idle -> Connecting -> Open -> Closed
//!             |          |
//!             +----------+----> Failed
//! ```
//!
//! On the `Open` transition the role acts once: a [`Publisher`] sends its
//! envelope and requests close, a [`Reader`] sends a request and waits for
//! exactly one reply. [`Session::handle`] is the sans-IO core; [`Session::run`]
//! drives it over a [`Transport`] and returns once the session is terminal.
//!
//! There is no built-in deadline for the reply: a bridge that never answers
//! keeps `run` pending. Callers bound it from outside and then call
//! [`Session::abort`]. Only the close handshake is bounded here, by
//! [`DEFAULT_CLOSE_TIMEOUT`] unless configured otherwise.

use std::time::Duration;

use tracing::{debug, warn};

use mbridge_core::error::{BridgeError, Result};
use mbridge_core::protocol::payload::{to_fragment, PayloadRecord};
use mbridge_core::protocol::{Envelope, MessageType};

use crate::transport::{Connection, Endpoint, Transport, TransportEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

/// Transport-level signal fed into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Opened,
    Message(String),
    Failed(String),
    Closed,
}

impl From<TransportEvent> for SessionEvent {
    fn from(ev: TransportEvent) -> Self {
        match ev {
            TransportEvent::Message(s) => SessionEvent::Message(s),
            TransportEvent::Closed => SessionEvent::Closed,
            TransportEvent::Failed(reason) => SessionEvent::Failed(reason),
        }
    }
}

/// Side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Send(String),
    Close,
}

/// Role-specific behaviour of a session.
pub trait Role {
    /// Actions to perform once, when the connection opens.
    fn on_open(&mut self) -> Vec<Action>;

    /// Consume the single inbound message.
    fn on_message(&mut self, text: &str) -> Result<()>;

    /// Whether the operation reached its goal.
    fn completed(&self) -> bool;
}

// --------------------
// Roles
// --------------------

/// Publish one record, then close without waiting for a reply.
#[derive(Debug, Clone)]
pub struct Publisher {
    envelope: Envelope,
    sent: bool,
}

impl Publisher {
    pub fn new<R: PayloadRecord>(channel: &str, dtype: &str, record: &R) -> Self {
        Self {
            envelope: Envelope::publish(channel, dtype, to_fragment(record)),
            sent: false,
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }
}

impl Role for Publisher {
    fn on_open(&mut self) -> Vec<Action> {
        self.sent = true;
        vec![Action::Send(self.envelope.encode()), Action::Close]
    }

    fn on_message(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn completed(&self) -> bool {
        self.sent
    }
}

/// Payload decoder used by a [`Reader`].
pub type Decoder<T> = fn(&str) -> Result<T>;

/// Request the latest value on a channel and decode exactly one reply.
pub struct Reader<T> {
    channel: String,
    decode: Decoder<T>,
    record: T,
    response_type: Option<MessageType>,
    remote_error: Option<String>,
    decoded: bool,
}

impl<T: Default> Reader<T> {
    pub fn new(channel: impl Into<String>, decode: Decoder<T>) -> Self {
        Self {
            channel: channel.into(),
            decode,
            record: T::default(),
            response_type: None,
            remote_error: None,
            decoded: false,
        }
    }
}

impl<T: PayloadRecord> Reader<T> {
    pub fn for_record(channel: impl Into<String>) -> Self {
        Self::new(channel, T::from_wire_fields)
    }
}

impl<T> Reader<T> {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Decoded record. Still the zero value unless the read succeeded.
    pub fn record(&self) -> &T {
        &self.record
    }

    pub fn into_record(self) -> T {
        self.record
    }

    /// Type of the reply, once one arrived and carried a recognizable type.
    pub fn response_type(&self) -> Option<MessageType> {
        self.response_type
    }

    /// Text of an ERROR reply.
    pub fn remote_error(&self) -> Option<&str> {
        self.remote_error.as_deref()
    }
}

impl<T> Role for Reader<T> {
    fn on_open(&mut self) -> Vec<Action> {
        vec![Action::Send(Envelope::request(self.channel.as_str()).encode())]
    }

    fn on_message(&mut self, text: &str) -> Result<()> {
        let env = Envelope::decode(text)?;
        self.response_type = Some(env.msg_type);

        match env.msg_type {
            MessageType::Response => {
                self.record = (self.decode)(&env.data)?;
                self.decoded = true;
                Ok(())
            }
            MessageType::Error => {
                self.remote_error = Some(env.data.clone());
                Err(BridgeError::Remote(env.data))
            }
            other => Err(BridgeError::Protocol(format!(
                "unexpected reply type: {}",
                other.as_str()
            ))),
        }
    }

    fn completed(&self) -> bool {
        self.decoded
    }
}

// --------------------
// Session
// --------------------

/// How long `run` waits for the peer to acknowledge a close it started.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Session<R> {
    uri: String,
    role: R,
    state: SessionState,
    opened: bool,
    closing: bool,
    /// Close frame sent after every queued send went out.
    close_started: bool,
    replied: bool,
    failure: Option<BridgeError>,
    close_timeout: Duration,
}

impl<R: Role> Session<R> {
    pub fn new(uri: impl Into<String>, role: R) -> Self {
        Self {
            uri: uri.into(),
            role,
            state: SessionState::Idle,
            opened: false,
            closing: false,
            close_started: false,
            replied: false,
            failure: None,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    pub fn with_close_timeout(mut self, limit: Duration) -> Self {
        self.close_timeout = limit;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> &R {
        &self.role
    }

    pub fn into_role(self) -> R {
        self.role
    }

    /// First failure recorded (transport, decode, or remote error).
    pub fn failure(&self) -> Option<&BridgeError> {
        self.failure.as_ref()
    }

    /// The operation reached `Open`, the role completed, and nothing failed.
    pub fn success(&self) -> bool {
        self.opened
            && self.state != SessionState::Failed
            && self.failure.is_none()
            && self.role.completed()
    }

    /// `Idle -> Connecting`. A malformed address is fatal and leaves the
    /// session in `Idle`.
    pub fn begin_connect(&mut self) -> Result<Endpoint> {
        if self.state != SessionState::Idle {
            return Err(BridgeError::Internal("session already used".into()));
        }
        let endpoint = Endpoint::parse(&self.uri)?;
        self.state = SessionState::Connecting;
        Ok(endpoint)
    }

    /// Stop the session from outside (e.g. an external timeout). No-op once
    /// terminal. If the close handshake already started, the outcome is kept
    /// and the session ends `Closed`; otherwise it ends `Failed` with `err`.
    pub fn abort(&mut self, err: BridgeError) {
        if self.state == SessionState::Open && self.close_started {
            debug!(uri = %self.uri, reason = %err, "stopped during close handshake");
            self.state = SessionState::Closed;
            return;
        }
        self.fail(err);
    }

    fn fail(&mut self, err: BridgeError) {
        if self.state.is_terminal() {
            return;
        }
        warn!(uri = %self.uri, error = %err, "connection to bridge failed");
        self.state = SessionState::Failed;
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }

    /// Apply one event and return the actions it triggers.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Action> {
        match event {
            SessionEvent::Opened => self.on_open(),
            SessionEvent::Message(text) => self.on_message(&text),
            SessionEvent::Failed(reason) => {
                self.on_fail(reason);
                Vec::new()
            }
            SessionEvent::Closed => {
                self.on_close();
                Vec::new()
            }
        }
    }

    fn on_open(&mut self) -> Vec<Action> {
        if self.state != SessionState::Connecting {
            debug!(state = ?self.state, "ignoring open signal");
            return Vec::new();
        }
        self.state = SessionState::Open;
        self.opened = true;

        let actions = self.role.on_open();
        if actions.contains(&Action::Close) {
            self.closing = true;
        }
        actions
    }

    fn on_message(&mut self, text: &str) -> Vec<Action> {
        if self.state != SessionState::Open || self.closing || self.replied {
            debug!(state = ?self.state, "ignoring inbound message");
            return Vec::new();
        }
        self.replied = true;
        debug!(frame = %text, "reply received");

        if let Err(e) = self.role.on_message(text) {
            warn!(uri = %self.uri, error = %e, "read failed");
            self.failure = Some(e);
        }

        // At most one inbound message per session.
        self.closing = true;
        vec![Action::Close]
    }

    fn on_fail(&mut self, reason: String) {
        match self.state {
            SessionState::Connecting => self.fail(BridgeError::Transport(reason)),
            SessionState::Open if self.closing => {
                // The operation already finished; the peer just skipped the handshake.
                debug!(%reason, "transport error while closing");
                self.state = SessionState::Closed;
            }
            SessionState::Open => self.fail(BridgeError::Transport(reason)),
            _ => debug!(state = ?self.state, %reason, "ignoring failure signal"),
        }
    }

    fn on_close(&mut self) {
        match self.state {
            SessionState::Connecting => {
                self.fail(BridgeError::Transport(
                    "connection closed before it opened".into(),
                ));
            }
            SessionState::Open => {
                if !self.closing && self.failure.is_none() {
                    self.failure = Some(BridgeError::Protocol(
                        "connection closed before a reply arrived".into(),
                    ));
                }
                self.state = SessionState::Closed;
                debug!(uri = %self.uri, "session closed");
            }
            _ => {}
        }
    }

    /// Drive the session to a terminal state over `transport`.
    ///
    /// Only a malformed address is returned as `Err`; every other failure is
    /// recorded and reported through [`Session::success`].
    pub async fn run<T: Transport>(&mut self, transport: &T) -> Result<()> {
        let endpoint = self.begin_connect()?;

        let mut conn = match transport.connect(&endpoint).await {
            Ok(conn) => conn,
            Err(e) => {
                self.fail(e);
                return Ok(());
            }
        };

        let mut actions = self.handle(SessionEvent::Opened);
        loop {
            for action in actions.drain(..) {
                match action {
                    Action::Send(text) => {
                        debug!(uri = %self.uri, frame = %text, "sending");
                        if let Err(e) = conn.send_text(text).await {
                            self.fail(e);
                            break;
                        }
                    }
                    Action::Close => {
                        self.close_started = true;
                        if let Err(e) = conn.close().await {
                            debug!(error = %e, "close handshake failed");
                            self.handle(SessionEvent::Closed);
                        }
                    }
                }
            }

            if self.state.is_terminal() {
                break;
            }

            if !self.close_started {
                let event = conn.recv().await;
                actions = self.handle(event.into());
                continue;
            }

            match tokio::time::timeout(self.close_timeout, conn.recv()).await {
                Ok(event) => actions = self.handle(event.into()),
                Err(_) => {
                    debug!(
                        uri = %self.uri,
                        limit_ms = self.close_timeout.as_millis() as u64,
                        "close handshake timed out"
                    );
                    self.state = SessionState::Closed;
                }
            }
        }

        Ok(())
    }
}
