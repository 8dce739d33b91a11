//! The application capability bundle (spec.md §9: "Runtime polymorphism
//! over app hooks ... SHOULD expose this as an interface/trait ... rather
//! than closures, to make app-swapping a compile-time decision").
//!
//! This mirrors the teacher's `server::hooks::GameHooks` trait, generalized
//! from the teacher's N-room rollback-netcode shape (`tick`/`diff`/`merge`
//! over `Delta`) to the two-participant lifecycle shape spec.md §4.2
//! requires (join/leave/message/start/reset/tick/end, no delta/rollback
//! machinery — out of scope per spec.md §1).

use crate::contract::message::EndReason;
use crate::contract::schema::AppSchema;
use crate::session::participant::{Participant, ParticipantId, ParticipantNumber, SessionPhase};

/// Where an app-originated response should be routed (spec.md §4.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Sender,
    Opponent,
    All,
}

/// One response emitted by [`AppHooks::on_message`] or the tick loop.
pub struct Response<M> {
    pub target: Target,
    pub message: M,
}

impl<M> Response<M> {
    pub fn new(target: Target, message: M) -> Self {
        Self { target, message }
    }
}

/// What [`AppHooks::on_participant_join`] hands back to the runtime.
pub struct JoinOutcome<S: AppSchema> {
    pub welcome: S::WelcomeData,
    /// Sent to the *other* connection as `opponent_joined.appData`, only
    /// if the app chooses to supply one (spec.md §4.2: "if the hook
    /// exposes that variant").
    pub opponent_joined: Option<S::OpponentJoinedData>,
}

impl<S: AppSchema> JoinOutcome<S> {
    pub fn new(welcome: S::WelcomeData) -> Self {
        Self {
            welcome,
            opponent_joined: None,
        }
    }

    pub fn with_opponent_joined(mut self, data: S::OpponentJoinedData) -> Self {
        self.opponent_joined = Some(data);
        self
    }
}

/// What [`AppHooks::check_session_end`] hands back when an app-side
/// condition (not a framework vote) ends the session.
pub struct EndOutcome<S: AppSchema> {
    pub winner_id: Option<ParticipantId>,
    pub winner_number: Option<ParticipantNumber>,
    pub app_data: Option<S::EndedData>,
}

/// The capability bundle an application supplies to plug into the
/// session runtime. `generate_participant_id` and `on_message` are the
/// only methods without a sensible no-op default; everything else has one
/// so a minimal app need not implement hooks it doesn't use.
pub trait AppHooks<S: AppSchema>: Send + 'static {
    /// Maps a freshly-allocated participant number to a stable id. The
    /// teacher's analogous knob is `PlayerContext::new`'s externally
    /// supplied `u64`; here the app controls id shape entirely (spec.md
    /// §3: "assigned by the app via a hook").
    fn generate_participant_id(&self, number: ParticipantNumber) -> ParticipantId;

    fn on_participant_join(&mut self, participant: &Participant) -> JoinOutcome<S>;

    fn on_participant_leave(&mut self, participant: &Participant) {
        let _ = participant;
    }

    /// Handles a non-framework inbound message (spec.md §4.2
    /// `handleMessage`, §4.2.3 routing).
    fn on_message(
        &mut self,
        message: S::ClientMessage,
        sender_id: &ParticipantId,
        phase: SessionPhase,
    ) -> Vec<Response<S::ServerMessage>>;

    fn on_session_start(&mut self) {}

    /// Called on the vote that completes a play-again reset (spec.md
    /// §4.2.2 "Reset"), before flags are cleared and `session_reset` is
    /// broadcast.
    fn on_reset(&mut self) -> Option<S::ResetData> {
        None
    }

    /// Per-tick hook, invoked only while `phase = playing` (spec.md
    /// §4.2.4). Default: tick disabled.
    fn on_tick(&mut self, dt_seconds: f64) -> Vec<S::ServerMessage> {
        let _ = dt_seconds;
        Vec::new()
    }

    /// Polled once after every `on_tick` call (spec.md §4.2.4). A `Some`
    /// return ends the session with [`EndReason::AppCondition`].
    fn check_session_end(&mut self) -> Option<EndOutcome<S>> {
        None
    }
}

/// Tick-loop configuration an app opts into (spec.md §4.2.4).
#[derive(Debug, Clone, Copy)]
pub struct TickConfig {
    pub interval_ms: u64,
}
