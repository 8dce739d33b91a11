//! Connection-state machine and dispatch (spec.md §4.5), transport-agnostic:
//! a concrete transport ([`super::ws`]) owns the socket and feeds inbound
//! bytes to [`SessionClient::dispatch`].

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::UnboundedSender;

use crate::contract::json;
use crate::contract::message::{EndReason, FrameworkClientMessage, FrameworkServerMessage};
use crate::contract::schema::{AppSchema, Deserialize, Serialize};
use crate::session::{ParticipantId, ParticipantNumber, SessionPhase};

use super::reconnect::ReconnectPolicy;

/// Socket-level state, tracked independently of the session [`SessionPhase`]
/// (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Typed event callbacks a consumer implements to observe a
/// [`SessionClient`] (spec.md §4.5). Every method defaults to a no-op so a
/// consumer only overrides the events it cares about.
pub trait EventSink<S: AppSchema>: Send + Sync {
    fn on_connection_state_change(&self, _state: ConnectionState) {}
    fn on_session_join(&self, _welcome: S::WelcomeData) {}
    fn on_opponent_joined(&self, _app_data: Option<S::OpponentJoinedData>) {}
    fn on_opponent_left(&self) {}
    fn on_session_start(&self) {}
    fn on_session_end(
        &self,
        _winner_id: Option<ParticipantId>,
        _winner_number: Option<ParticipantNumber>,
        _reason: EndReason,
    ) {
    }
    fn on_play_again_status(&self, _voted_count: usize, _total_participants: usize) {}
    fn on_session_reset(&self, _app_data: Option<S::ResetData>) {}
    fn on_error(&self, _message: String) {}
    fn on_app_message(&self, _message: S::ServerMessage) {}
}

pub(super) struct Inner<S: AppSchema> {
    pub(super) state: ConnectionState,
    pub(super) phase: SessionPhase,
    pub(super) participant_id: Option<ParticipantId>,
    pub(super) participant_number: Option<ParticipantNumber>,
    pub(super) outbound: Option<UnboundedSender<Vec<u8>>>,
    pub(super) url: Option<String>,
    pub(super) reconnect_attempts: u32,
    _schema: PhantomData<S>,
}

impl<S: AppSchema> Inner<S> {
    fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            phase: SessionPhase::Waiting,
            participant_id: None,
            participant_number: None,
            outbound: None,
            url: None,
            reconnect_attempts: 0,
            _schema: PhantomData,
        }
    }
}

/// C5: the session client (spec.md §4.5). Generic over the app's
/// [`AppSchema`] and the consumer's [`EventSink`] implementation, mirroring
/// how [`crate::session::SessionRuntime`] is generic over `AppHooks`.
pub struct SessionClient<E, S>
where
    S: AppSchema,
    E: EventSink<S>,
{
    pub(super) inner: Arc<Mutex<Inner<S>>>,
    pub(super) sink: Arc<E>,
    pub(super) reconnect: ReconnectPolicy,
}

impl<E, S> Clone for SessionClient<E, S>
where
    S: AppSchema,
    E: EventSink<S>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            sink: Arc::clone(&self.sink),
            reconnect: self.reconnect,
        }
    }
}

impl<E, S> SessionClient<E, S>
where
    S: AppSchema,
    E: EventSink<S>,
{
    pub fn new(sink: E, reconnect: ReconnectPolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::new())),
            sink: Arc::new(sink),
            reconnect,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        self.inner.lock().expect("client lock is never poisoned")
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.lock().state
    }

    pub fn participant_id(&self) -> Option<ParticipantId> {
        self.lock().participant_id.clone()
    }

    pub fn participant_number(&self) -> Option<ParticipantNumber> {
        self.lock().participant_number
    }

    /// spec.md §4.5 `sendReady`.
    pub fn send_ready(&self) {
        self.send_framework(&FrameworkClientMessage::ParticipantReady);
    }

    pub fn send_bot_identify(&self) {
        self.send_framework(&FrameworkClientMessage::BotIdentify);
    }

    /// spec.md §4.5 `sendPlayAgainVote`.
    pub fn send_play_again_vote(&self) {
        self.send_framework(&FrameworkClientMessage::PlayAgainVote);
    }

    fn send_framework(&self, message: &FrameworkClientMessage) {
        self.send_raw(json::encode_client_message(message).into_bytes());
    }

    /// spec.md §4.5 `sendAppMessage`.
    pub fn send_app_message(&self, message: S::ClientMessage) {
        self.send_raw(message.serialize());
    }

    fn send_raw(&self, raw: Vec<u8>) {
        let inner = self.lock();
        if inner.state != ConnectionState::Connected {
            log::warn!("dropping outbound message: client is not connected");
            return;
        }
        if let Some(tx) = &inner.outbound {
            let _ = tx.send(raw);
        }
    }

    /// spec.md §4.5 `disconnect`. Suppresses any pending reconnect by
    /// pinning the attempt counter past `max_attempts`.
    pub fn disconnect(&self) {
        {
            let mut inner = self.lock();
            inner.outbound = None;
            inner.state = ConnectionState::Disconnected;
            inner.phase = SessionPhase::Waiting;
            inner.participant_id = None;
            inner.participant_number = None;
            inner.reconnect_attempts = u32::MAX;
        }
        self.sink.on_connection_state_change(ConnectionState::Disconnected);
    }

    /// spec.md §4.5 dispatch rule: called by the transport for every
    /// inbound frame.
    pub(super) fn dispatch(&self, raw: &[u8]) {
        if let Some(framework_message) = json::try_decode_server_message(raw) {
            self.dispatch_framework(framework_message);
            return;
        }
        match <S::ServerMessage as Deserialize<S::Wire>>::deserialize(raw) {
            Ok(message) => self.sink.on_app_message(message),
            Err(_) => log::warn!(
                "ignored inbound frame: not a framework message and app deserialization failed"
            ),
        }
    }

    fn dispatch_framework(&self, message: FrameworkServerMessage) {
        match message {
            FrameworkServerMessage::Welcome {
                participant_id,
                participant_number,
                session_phase,
                app_data,
            } => {
                {
                    let mut inner = self.lock();
                    inner.participant_id = Some(participant_id);
                    inner.participant_number = Some(participant_number);
                    inner.phase = session_phase;
                }
                match app_data
                    .and_then(|bytes| <S::WelcomeData as Deserialize<S::Wire>>::deserialize(&bytes).ok())
                {
                    Some(welcome) => self.sink.on_session_join(welcome),
                    None => log::warn!("welcome frame missing or malformed appData"),
                }
            }
            FrameworkServerMessage::OpponentJoined { app_data } => {
                let app_data = app_data.and_then(|bytes| {
                    <S::OpponentJoinedData as Deserialize<S::Wire>>::deserialize(&bytes).ok()
                });
                self.sink.on_opponent_joined(app_data);
            }
            FrameworkServerMessage::OpponentLeft => self.sink.on_opponent_left(),
            FrameworkServerMessage::SessionStarted => {
                self.lock().phase = SessionPhase::Playing;
                self.sink.on_session_start();
            }
            FrameworkServerMessage::SessionEnded {
                reason,
                winner_id,
                winner_number,
                ..
            } => {
                self.lock().phase = SessionPhase::Finished;
                self.sink.on_session_end(winner_id, winner_number, reason);
            }
            FrameworkServerMessage::PlayAgainStatus {
                voted_participant_ids,
                total_participants,
            } => self
                .sink
                .on_play_again_status(voted_participant_ids.len(), total_participants),
            FrameworkServerMessage::SessionReset { app_data } => {
                let app_data = app_data
                    .and_then(|bytes| <S::ResetData as Deserialize<S::Wire>>::deserialize(&bytes).ok());
                self.lock().phase = SessionPhase::Waiting;
                self.sink.on_session_reset(app_data);
            }
            FrameworkServerMessage::Error { message } => self.sink.on_error(message),
        }
    }

    pub(super) fn set_state(&self, state: ConnectionState) {
        self.lock().state = state;
        self.sink.on_connection_state_change(state);
    }

    pub(super) fn set_outbound(&self, tx: Option<UnboundedSender<Vec<u8>>>) {
        self.lock().outbound = tx;
    }

    pub(super) fn url(&self) -> Option<String> {
        self.lock().url.clone()
    }

    pub(super) fn set_url(&self, url: String) {
        self.lock().url = Some(url);
    }

    pub(super) fn reset_reconnect_attempts(&self) {
        self.lock().reconnect_attempts = 0;
    }

    /// Bumps and returns the new attempt count, or `None` if reconnection
    /// was explicitly suppressed by [`SessionClient::disconnect`].
    pub(super) fn bump_reconnect_attempt(&self) -> Option<u32> {
        let mut inner = self.lock();
        if inner.reconnect_attempts == u32::MAX {
            return None;
        }
        inner.reconnect_attempts += 1;
        Some(inner.reconnect_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::json::Json;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct TestSchema;

    impl AppSchema for TestSchema {
        type Wire = Json;
        type ClientMessage = serde_json::Value;
        type WelcomeData = Welcome;
        type OpponentJoinedData = Welcome;
        type ResetData = Welcome;
        type EndedData = Welcome;
        type ServerMessage = serde_json::Value;
    }

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Welcome {
        seat: u8,
    }

    #[derive(Default)]
    struct RecordingSink {
        events: StdMutex<Vec<String>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventSink<TestSchema> for RecordingSink {
        fn on_connection_state_change(&self, state: ConnectionState) {
            self.events.lock().unwrap().push(format!("state:{state:?}"));
        }
        fn on_session_join(&self, welcome: Welcome) {
            self.events.lock().unwrap().push(format!("welcome:{}", welcome.seat));
        }
        fn on_opponent_left(&self) {
            self.events.lock().unwrap().push("opponent_left".to_string());
        }
        fn on_session_start(&self) {
            self.events.lock().unwrap().push("started".to_string());
        }
        fn on_session_end(
            &self,
            _winner_id: Option<ParticipantId>,
            _winner_number: Option<ParticipantNumber>,
            reason: EndReason,
        ) {
            self.events.lock().unwrap().push(format!("ended:{}", reason.as_str()));
        }
        fn on_session_reset(&self, _app_data: Option<Welcome>) {
            self.events.lock().unwrap().push("reset".to_string());
        }
        fn on_error(&self, message: String) {
            self.events.lock().unwrap().push(format!("error:{message}"));
        }
    }

    fn client() -> SessionClient<RecordingSink, TestSchema> {
        SessionClient::new(RecordingSink::default(), ReconnectPolicy::disabled())
    }

    #[test]
    fn welcome_latches_identity_and_phase_then_notifies_the_sink() {
        let client = client();
        let raw = json::encode_server_message(&FrameworkServerMessage::Welcome {
            participant_id: "p1".to_string(),
            participant_number: 1,
            session_phase: SessionPhase::Waiting,
            app_data: Some(serde_json::to_vec(&Welcome { seat: 1 }).unwrap()),
        });
        client.dispatch(raw.as_bytes());

        assert_eq!(client.participant_id(), Some("p1".to_string()));
        assert_eq!(client.participant_number(), Some(1));
        assert_eq!(client.phase(), SessionPhase::Waiting);
        assert!(client.sink.events().contains(&"welcome:1".to_string()));
    }

    #[test]
    fn session_started_and_ended_flip_phase_and_reach_the_sink() {
        let client = client();
        client.dispatch(json::encode_server_message(&FrameworkServerMessage::SessionStarted).as_bytes());
        assert_eq!(client.phase(), SessionPhase::Playing);

        client.dispatch(
            json::encode_server_message(&FrameworkServerMessage::SessionEnded {
                reason: EndReason::Completed,
                winner_id: None,
                winner_number: None,
                app_data: None,
            })
            .as_bytes(),
        );
        assert_eq!(client.phase(), SessionPhase::Finished);
        assert!(client.sink.events().contains(&"ended:completed".to_string()));
    }

    #[test]
    fn session_reset_returns_the_client_to_waiting() {
        let client = client();
        client.dispatch(json::encode_server_message(&FrameworkServerMessage::SessionEnded {
            reason: EndReason::Timeout,
            winner_id: None,
            winner_number: None,
            app_data: None,
        }).as_bytes());
        client.dispatch(json::encode_server_message(&FrameworkServerMessage::SessionReset { app_data: None }).as_bytes());
        assert_eq!(client.phase(), SessionPhase::Waiting);
    }

    #[test]
    fn an_app_message_with_no_framework_tag_reaches_on_app_message_not_an_error() {
        let client = client();
        // `TestSchema::ServerMessage` is a bare `serde_json::Value`, so any
        // object without a framework `type` tag deserializes as an app
        // message rather than falling into the error path.
        client.dispatch(br#"{"custom":true}"#);
        assert!(client.sink.events().is_empty());
    }

    #[test]
    fn sending_while_disconnected_is_dropped_not_panicked() {
        let client = client();
        // No outbound channel has been installed; `send_ready` must not
        // block or panic, it just logs and drops the frame.
        client.send_ready();
    }
}
