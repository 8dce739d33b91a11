//! C2: the session runtime (spec.md §4.2).
//!
//! Grounded on the teacher's `server::runtime::GameRuntimeHandle` (a
//! `Arc`-shared, lock-guarded handler keyed by player id) and
//! `server::protocol::SessionManager` (per-player outbound senders plus
//! broadcast helpers), narrowed from the teacher's arbitrary-room/
//! arbitrary-player-count model to exactly one room of exactly two
//! participants, and extended with the phase state machine, ready-gate,
//! and play-again reset spec.md §4.2 requires.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::contract::message::{EndReason, FrameworkClientMessage, FrameworkServerMessage};
use crate::contract::schema::{AppSchema, Serialize as _};
use crate::error::SessionError;
use crate::session::connection::Connection;
use crate::session::hooks::{AppHooks, EndOutcome, JoinOutcome, Target, TickConfig};
use crate::session::participant::{Participant, ParticipantId, ParticipantNumber, SessionPhase};

use crate::contract::json;

const SLOT_COUNT: usize = 2;

struct Slot {
    participant: Participant,
    connection: Arc<dyn Connection>,
}

struct Inner<H, S>
where
    S: AppSchema,
    H: AppHooks<S>,
{
    phase: SessionPhase,
    slots: [Option<Slot>; SLOT_COUNT],
    hooks: H,
    tick_handle: Option<JoinHandle<()>>,
    last_tick: std::time::Instant,
    _schema: std::marker::PhantomData<S>,
}

impl<H, S> Inner<H, S>
where
    S: AppSchema,
    H: AppHooks<S>,
{
    fn index_of(&self, id: &ParticipantId) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .map(|s| &s.participant.id == id)
                .unwrap_or(false)
        })
    }

    fn participant_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn connection(&self, id: &ParticipantId) -> Option<&Arc<dyn Connection>> {
        self.index_of(id).and_then(|i| self.slots[i].as_ref().map(|s| &s.connection))
    }

    fn send_to(&self, id: &ParticipantId, message: &FrameworkServerMessage) {
        if let Some(conn) = self.connection(id)
            && conn.is_open()
        {
            conn.send(&json::encode_server_message(message));
        }
    }

    fn send_raw_to(&self, id: &ParticipantId, raw: &str) {
        if let Some(conn) = self.connection(id)
            && conn.is_open()
        {
            conn.send(raw);
        }
    }

    fn broadcast(&self, message: &FrameworkServerMessage) {
        let raw = json::encode_server_message(message);
        for slot in self.slots.iter().flatten() {
            if slot.connection.is_open() {
                slot.connection.send(&raw);
            }
        }
    }

    fn broadcast_to_others(&self, sender_id: &ParticipantId, message: &FrameworkServerMessage) {
        let raw = json::encode_server_message(message);
        for slot in self.slots.iter().flatten() {
            if &slot.participant.id != sender_id && slot.connection.is_open() {
                slot.connection.send(&raw);
            }
        }
    }

    /// Evaluates the start condition (spec.md §4.2.2). Synchronous and
    /// called after every flag mutation that could satisfy it.
    fn maybe_start(&mut self) {
        if self.phase != SessionPhase::Waiting {
            return;
        }
        let ready = self.slots.iter().all(|s| match s {
            Some(slot) => slot.participant.is_ready,
            None => false,
        });
        if !ready {
            return;
        }
        self.hooks.on_session_start();
        self.phase = SessionPhase::Playing;
        self.broadcast(&FrameworkServerMessage::SessionStarted);
    }

    fn stop_tick_loop(&mut self) {
        if let Some(handle) = self.tick_handle.take() {
            handle.abort();
        }
    }

    /// Shared by the explicit `endSession` call and the tick loop's
    /// app-condition path. Returns `Ok(())` even when a no-op, per
    /// spec.md §4.2's idempotency requirement.
    fn end_session(
        &mut self,
        winner_id: Option<ParticipantId>,
        winner_number: Option<ParticipantNumber>,
        reason: EndReason,
        app_data: Option<S::EndedData>,
    ) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Finished => Ok(()),
            SessionPhase::Playing => {
                // I7: stop the tick loop before session_ended is delivered.
                self.stop_tick_loop();
                self.phase = SessionPhase::Finished;
                let serialized = app_data.map(|d| d.serialize());
                self.broadcast(&FrameworkServerMessage::SessionEnded {
                    reason,
                    winner_id,
                    winner_number,
                    app_data: serialized,
                });
                Ok(())
            }
            SessionPhase::Waiting => Err(SessionError::NotPlaying),
        }
    }

    fn perform_reset(&mut self) {
        let reset_data = self.hooks.on_reset();
        for slot in self.slots.iter_mut().flatten() {
            slot.participant.wants_play_again = false;
            slot.participant.is_ready = slot.participant.is_bot;
        }
        self.phase = SessionPhase::Waiting;
        let serialized = reset_data.map(|d| d.serialize());
        self.broadcast(&FrameworkServerMessage::SessionReset {
            app_data: serialized,
        });
        // A session whose only remaining participants are bots re-readies
        // immediately; humans must re-signal (spec.md §4.2.2 "Reset").
        self.maybe_start();
    }
}

/// C2: server-side state machine for one two-participant session.
pub struct SessionRuntime<H, S>
where
    S: AppSchema,
    H: AppHooks<S>,
{
    inner: Arc<Mutex<Inner<H, S>>>,
    clock: Arc<dyn Clock>,
    tick_config: Option<TickConfig>,
}

impl<H, S> Clone for SessionRuntime<H, S>
where
    S: AppSchema,
    H: AppHooks<S>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
            tick_config: self.tick_config,
        }
    }
}

impl<H, S> SessionRuntime<H, S>
where
    S: AppSchema,
    H: AppHooks<S>,
{
    pub fn new(hooks: H, clock: Arc<dyn Clock>, tick_config: Option<TickConfig>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                phase: SessionPhase::Waiting,
                slots: [None, None],
                hooks,
                tick_handle: None,
                last_tick: clock.now(),
                _schema: std::marker::PhantomData,
            })),
            clock,
            tick_config,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<H, S>> {
        self.inner.lock().expect("session lock is never poisoned")
    }

    /// spec.md §4.2 `handleConnection`.
    pub fn handle_connection(&self, connection: Arc<dyn Connection>) -> Option<Participant> {
        let mut inner = self.lock();
        let Some(index) = inner.slots.iter().position(|s| s.is_none()) else {
            let raw = json::encode_server_message(&FrameworkServerMessage::Error {
                message: SessionError::SessionFull.to_string(),
            });
            connection.send(&raw);
            connection.close();
            return None;
        };

        let number = (index + 1) as ParticipantNumber;
        let id = inner.hooks.generate_participant_id(number);
        let participant = Participant::new(id.clone(), number);

        let JoinOutcome {
            welcome,
            opponent_joined,
        } = inner.hooks.on_participant_join(&participant);

        inner.slots[index] = Some(Slot {
            participant: participant.clone(),
            connection: Arc::clone(&connection),
        });

        inner.send_to(
            &id,
            &FrameworkServerMessage::Welcome {
                participant_id: id.clone(),
                participant_number: number,
                session_phase: inner.phase,
                app_data: Some(welcome.serialize()),
            },
        );

        inner.broadcast_to_others(
            &id,
            &FrameworkServerMessage::OpponentJoined {
                app_data: opponent_joined.map(|d| d.serialize()),
            },
        );

        inner.maybe_start();
        if inner.phase == SessionPhase::Playing {
            self.ensure_tick_loop(&mut inner);
        }

        Some(participant)
    }

    /// spec.md §4.2 `handleDisconnection`.
    pub fn handle_disconnection(&self, participant_id: &ParticipantId) {
        let mut inner = self.lock();
        let Some(index) = inner.index_of(participant_id) else {
            return;
        };
        let participant = inner.slots[index]
            .as_ref()
            .map(|s| s.participant.clone())
            .expect("index_of only returns occupied slots");
        inner.hooks.on_participant_leave(&participant);
        inner.slots[index] = None;
        inner.broadcast_to_others(participant_id, &FrameworkServerMessage::OpponentLeft);
        // Phase is left untouched: the app decides whether a departure
        // during `playing` ends the session (spec.md §4.2).
    }

    /// spec.md §4.2 `handleMessage`.
    pub fn handle_message(&self, participant_id: &ParticipantId, raw: &[u8]) {
        if let Some(framework_message) = json::try_decode_client_message(raw) {
            self.handle_framework_message(participant_id, framework_message);
            return;
        }

        let mut inner = self.lock();
        let Ok(app_message) = <S::ClientMessage as crate::contract::schema::Deserialize<
            S::Wire,
        >>::deserialize(raw) else {
            inner.send_to(
                participant_id,
                &SessionError::InvalidMessage.as_wire_message(),
            );
            return;
        };
        let phase = inner.phase;
        let responses = inner.hooks.on_message(app_message, participant_id, phase);
        for response in responses {
            let raw = response.message.serialize();
            let raw = String::from_utf8(raw).unwrap_or_default();
            match response.target {
                Target::Sender => inner.send_raw_to(participant_id, &raw),
                Target::Opponent => {
                    for slot in inner.slots.iter().flatten() {
                        if &slot.participant.id != participant_id && slot.connection.is_open() {
                            slot.connection.send(&raw);
                        }
                    }
                }
                Target::All => {
                    for slot in inner.slots.iter().flatten() {
                        if slot.connection.is_open() {
                            slot.connection.send(&raw);
                        }
                    }
                }
            }
        }
    }

    fn handle_framework_message(&self, participant_id: &ParticipantId, message: FrameworkClientMessage) {
        let mut inner = self.lock();
        match message {
            FrameworkClientMessage::ParticipantReady => {
                if let Some(index) = inner.index_of(participant_id) {
                    inner.slots[index].as_mut().unwrap().participant.is_ready = true;
                }
                inner.maybe_start();
            }
            FrameworkClientMessage::BotIdentify => {
                if let Some(index) = inner.index_of(participant_id) {
                    let p = &mut inner.slots[index].as_mut().unwrap().participant;
                    p.is_bot = true;
                    p.is_ready = true;
                }
                inner.maybe_start();
            }
            FrameworkClientMessage::PlayAgainVote => {
                if inner.phase != SessionPhase::Finished {
                    return;
                }
                if let Some(index) = inner.index_of(participant_id) {
                    inner.slots[index].as_mut().unwrap().participant.wants_play_again = true;
                }
                let voted_participant_ids: Vec<ParticipantId> = inner
                    .slots
                    .iter()
                    .flatten()
                    .filter(|s| s.participant.wants_play_again)
                    .map(|s| s.participant.id.clone())
                    .collect();
                let total_participants = inner.participant_count();
                inner.broadcast(&FrameworkServerMessage::PlayAgainStatus {
                    voted_participant_ids: voted_participant_ids.clone(),
                    total_participants,
                });
                if voted_participant_ids.len() == total_participants && total_participants > 0 {
                    inner.perform_reset();
                }
            }
        }
        if inner.phase == SessionPhase::Playing {
            self.ensure_tick_loop(&mut inner);
        }
    }

    /// spec.md §4.2 `endSession`.
    pub fn end_session(
        &self,
        winner_id: Option<ParticipantId>,
        winner_number: Option<ParticipantNumber>,
        reason: EndReason,
        app_data: Option<S::EndedData>,
    ) -> Result<(), SessionError> {
        self.lock().end_session(winner_id, winner_number, reason, app_data)
    }

    /// spec.md §4.2 `broadcast`.
    pub fn broadcast(&self, message: S::ServerMessage) {
        let raw = String::from_utf8(message.serialize()).unwrap_or_default();
        let inner = self.lock();
        for slot in inner.slots.iter().flatten() {
            if slot.connection.is_open() {
                slot.connection.send(&raw);
            }
        }
    }

    /// spec.md §4.2 `sendToParticipant`.
    pub fn send_to_participant(&self, id: &ParticipantId, message: S::ServerMessage) {
        let raw = String::from_utf8(message.serialize()).unwrap_or_default();
        self.lock().send_raw_to(id, &raw);
    }

    /// spec.md §4.2 `stop`. Does not close connections.
    pub fn stop(&self) {
        self.lock().stop_tick_loop();
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    fn ensure_tick_loop(&self, inner: &mut Inner<H, S>) {
        let Some(config) = self.tick_config else {
            return;
        };
        if inner.tick_handle.is_some() {
            return;
        }
        inner.last_tick = self.clock.now();

        let runtime = self.clone();
        let interval = Duration::from_millis(config.interval_ms);
        inner.tick_handle = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if !runtime.tick_once() {
                    break;
                }
            }
        }));
    }

    /// Runs one tick iteration; returns `false` if the loop should stop
    /// (phase left `playing`, satisfying spec.md I6/P9).
    fn tick_once(&self) -> bool {
        let mut inner = self.lock();
        if inner.phase != SessionPhase::Playing {
            return false;
        }

        let now = self.clock.now();
        let dt = now.duration_since(inner.last_tick).as_secs_f64();
        inner.last_tick = now;

        let messages = inner.hooks.on_tick(dt);
        for message in messages {
            let raw = String::from_utf8(message.serialize()).unwrap_or_default();
            for slot in inner.slots.iter().flatten() {
                if slot.connection.is_open() {
                    slot.connection.send(&raw);
                }
            }
        }

        if let Some(EndOutcome {
            winner_id,
            winner_number,
            app_data,
        }) = inner.hooks.check_session_end()
        {
            let _ = inner.end_session(winner_id, winner_number, EndReason::AppCondition, app_data);
            return false;
        }

        inner.phase == SessionPhase::Playing
    }
}
