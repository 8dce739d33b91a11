//! C2: the session runtime and its data model (spec.md §3, §4.2).

pub mod connection;
pub mod hooks;
pub mod participant;
pub mod runtime;

pub use connection::Connection;
pub use hooks::{AppHooks, EndOutcome, JoinOutcome, Response, Target, TickConfig};
pub use participant::{Participant, ParticipantId, ParticipantNumber, SessionPhase};
pub use runtime::SessionRuntime;

#[cfg(any(test, feature = "test-support"))]
pub use connection::fake::FakeConnection;
