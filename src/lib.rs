//! A two-participant, real-time WebSocket session framework: a fixed
//! framework message vocabulary (C1) composed with an app-defined payload
//! schema, a session runtime enforcing the `waiting -> playing -> finished
//! -> waiting` lifecycle (C2), an inactivity watchdog (C3), a pluggable
//! server wrapper (C4), and a browser-facing session client (C5).

pub mod clock;
pub mod config;
pub mod contract;
pub mod error;
pub mod inactivity;
pub mod session;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "client")]
pub mod client;

pub use clock::{Clock, SystemClock};
pub use config::ServerConfig;
pub use contract::message::{EndReason, FrameworkClientMessage, FrameworkServerMessage};
pub use contract::schema::{AppSchema, Schema, SchemaType};
pub use error::{ClientError, SessionError, TransportError};
pub use inactivity::InactivityMonitor;
pub use session::{
    AppHooks, Connection, EndOutcome, JoinOutcome, Participant, ParticipantId, ParticipantNumber,
    Response, SessionPhase, SessionRuntime, Target, TickConfig,
};

#[cfg(feature = "client")]
pub use client::{ConnectionState, EventSink, ReconnectPolicy, SessionClient};

#[cfg(feature = "server")]
pub use server::{AxumTransport, SessionServer, Transport};
