//! Per-layer error enums, mirroring the error taxonomy of spec.md §7.
//!
//! Each enum belongs to exactly one architectural layer (C2 runtime, C4
//! transport wrapper, C5 client) so a caller can match on the layer that
//! produced the failure without threading a single crate-wide error type
//! through code that cannot produce every variant.

use std::fmt::{self, Display, Formatter};

use crate::contract::message::FrameworkServerMessage;

/// Errors raised by the session runtime (C2).
#[derive(Debug)]
pub enum SessionError {
    /// Admission attempted with both participant slots occupied.
    SessionFull,
    /// The inbound frame could not be parsed by either the framework or
    /// the app-supplied parser.
    InvalidMessage,
    /// `endSession` called while the session was not `playing`.
    NotPlaying,
    /// The connection passed to an operation has no bound participant.
    NoSuchParticipant,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::SessionFull => write!(f, "Session is full"),
            SessionError::InvalidMessage => write!(f, "Invalid message format"),
            SessionError::NotPlaying => write!(f, "session is not in the playing phase"),
            SessionError::NoSuchParticipant => write!(f, "connection has no bound participant"),
        }
    }
}

impl std::error::Error for SessionError {}

impl SessionError {
    /// Renders the framework `error{message}` frame this failure produces
    /// on the wire, where applicable (§4.2.5: not every `SessionError`
    /// variant is wire-visible).
    pub fn as_wire_message(&self) -> FrameworkServerMessage {
        FrameworkServerMessage::Error {
            message: self.to_string(),
        }
    }
}

/// Errors raised by the app-server wrapper (C4).
#[derive(Debug)]
pub enum TransportError {
    /// The configured listen port could not be bound.
    BindFailure(std::io::Error),
    /// Required environment configuration was missing or malformed.
    Configuration(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::BindFailure(e) => write!(f, "failed to bind listener: {e}"),
            TransportError::Configuration(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Errors raised by the session client (C5).
#[derive(Debug)]
pub enum ClientError {
    /// `connect` could not establish the underlying socket.
    ConnectionFailure(String),
    /// A send was attempted while the socket was not `connected`.
    NotConnected,
    /// An inbound frame failed to parse.
    Deserialization,
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::ConnectionFailure(msg) => write!(f, "connection failure: {msg}"),
            ClientError::NotConnected => write!(f, "not connected"),
            ClientError::Deserialization => write!(f, "failed to deserialize inbound message"),
        }
    }
}

impl std::error::Error for ClientError {}
