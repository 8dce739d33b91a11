//! Shared test fixtures: a minimal `AppSchema`/`AppHooks` pair exercising
//! every extension point, used across the integration test files.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use duet::contract::json::Json;
use duet::{
    AppHooks, AppSchema, EndOutcome, JoinOutcome, Participant, ParticipantId, ParticipantNumber,
    Response, SessionPhase, Target,
};
use serde::{Deserialize, Serialize};

#[derive(Default)]
pub struct PingPongSchema;

impl AppSchema for PingPongSchema {
    type Wire = Json;
    type ClientMessage = ClientMessage;
    type WelcomeData = Welcome;
    type OpponentJoinedData = OpponentJoined;
    type ResetData = Reset;
    type EndedData = Ended;
    type ServerMessage = ServerMessage;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ClientMessage {
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Welcome {
    pub seat: ParticipantNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentJoined {
    pub opponent_number: ParticipantNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reset {
    pub round: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ended {
    pub pongs: HashMap<ParticipantId, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ServerMessage {
    Pong,
    Tick { count: u32 },
}

/// A tiny reference app: every `Ping` from a participant is answered with
/// a broadcast `Pong` and a tally bump; the session ends once any
/// participant's tally reaches `win_at` (`None` disables the app-condition
/// end path, so a test can drive `end_session` manually instead).
pub struct PingPongHooks {
    pub pongs: HashMap<ParticipantId, u32>,
    pub win_at: Option<u32>,
    pub resets: u32,
    pub ticks: u32,
    next_id: AtomicU32,
}

impl PingPongHooks {
    pub fn new(win_at: Option<u32>) -> Self {
        Self {
            pongs: HashMap::new(),
            win_at,
            resets: 0,
            ticks: 0,
            next_id: AtomicU32::new(0),
        }
    }
}

impl AppHooks<PingPongSchema> for PingPongHooks {
    fn generate_participant_id(&self, number: ParticipantNumber) -> ParticipantId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("p{number}-{n}")
    }

    fn on_participant_join(&mut self, participant: &Participant) -> JoinOutcome<PingPongSchema> {
        self.pongs.entry(participant.id.clone()).or_insert(0);
        JoinOutcome::new(Welcome {
            seat: participant.number,
        })
        .with_opponent_joined(OpponentJoined {
            opponent_number: participant.number,
        })
    }

    fn on_participant_leave(&mut self, participant: &Participant) {
        self.pongs.remove(&participant.id);
    }

    fn on_message(
        &mut self,
        message: ClientMessage,
        sender_id: &ParticipantId,
        phase: SessionPhase,
    ) -> Vec<Response<ServerMessage>> {
        if phase != SessionPhase::Playing {
            return Vec::new();
        }
        let ClientMessage::Ping = message;
        *self.pongs.entry(sender_id.clone()).or_insert(0) += 1;
        vec![Response::new(Target::All, ServerMessage::Pong)]
    }

    fn on_session_start(&mut self) {
        for v in self.pongs.values_mut() {
            *v = 0;
        }
    }

    fn on_reset(&mut self) -> Option<Reset> {
        self.resets += 1;
        for v in self.pongs.values_mut() {
            *v = 0;
        }
        Some(Reset { round: self.resets })
    }

    fn on_tick(&mut self, _dt_seconds: f64) -> Vec<ServerMessage> {
        self.ticks += 1;
        vec![ServerMessage::Tick { count: self.ticks }]
    }

    fn check_session_end(&mut self) -> Option<EndOutcome<PingPongSchema>> {
        let win_at = self.win_at?;
        let (winner_id, _) = self.pongs.iter().find(|(_, count)| **count >= win_at)?;
        let winner_id = winner_id.clone();
        Some(EndOutcome {
            winner_id: Some(winner_id),
            winner_number: None,
            app_data: Some(Ended {
                pongs: self.pongs.clone(),
            }),
        })
    }
}
