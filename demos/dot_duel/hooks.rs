//! Dot Duel: a minimal two-player reaction-tap game, used to exercise
//! every [`AppHooks`]/[`AppSchema`] extension point end to end.
//!
//! The server spawns a "dot" at random intervals while `playing`; the
//! first participant to tap it scores a point; the first to reach
//! `target_score` wins.

use std::collections::HashMap;

use duet::{
    AppHooks, AppSchema, EndOutcome, JoinOutcome, Participant, ParticipantId, ParticipantNumber,
    Response, SessionPhase, Target,
};
use serde::{Deserialize, Serialize};

pub const TARGET_SCORE: u32 = 5;
pub const SPAWN_INTERVAL_SECS: f64 = 2.0;

#[derive(Default)]
pub struct DotDuelSchema;

impl AppSchema for DotDuelSchema {
    type Wire = duet::contract::json::Json;
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
    Tap { spawn_id: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Welcome {
    pub target_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentJoined {
    pub opponent_number: ParticipantNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reset {
    pub target_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ended {
    pub scores: HashMap<ParticipantId, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ServerMessage {
    DotSpawned { spawn_id: u64 },
    ScoreUpdate { scores: HashMap<ParticipantId, u32> },
}

pub struct DotDuelHooks {
    numbers: HashMap<ParticipantId, ParticipantNumber>,
    scores: HashMap<ParticipantId, u32>,
    active_spawn: Option<u64>,
    next_spawn_id: u64,
    time_since_spawn: f64,
}

impl Default for DotDuelHooks {
    fn default() -> Self {
        Self {
            numbers: HashMap::new(),
            scores: HashMap::new(),
            active_spawn: None,
            next_spawn_id: 0,
            time_since_spawn: 0.0,
        }
    }
}

impl AppHooks<DotDuelSchema> for DotDuelHooks {
    fn generate_participant_id(&self, number: ParticipantNumber) -> ParticipantId {
        format!("dot-duel-{number}-{}", uuid::Uuid::new_v4())
    }

    fn on_participant_join(&mut self, participant: &Participant) -> JoinOutcome<DotDuelSchema> {
        self.numbers.insert(participant.id.clone(), participant.number);
        self.scores.entry(participant.id.clone()).or_insert(0);
        JoinOutcome::new(Welcome {
            target_score: TARGET_SCORE,
        })
        .with_opponent_joined(OpponentJoined {
            opponent_number: participant.number,
        })
    }

    fn on_participant_leave(&mut self, participant: &Participant) {
        self.numbers.remove(&participant.id);
        self.scores.remove(&participant.id);
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
        let ClientMessage::Tap { spawn_id } = message;
        if self.active_spawn != Some(spawn_id) {
            return Vec::new();
        }
        self.active_spawn = None;
        self.time_since_spawn = 0.0;
        *self.scores.entry(sender_id.clone()).or_insert(0) += 1;
        vec![Response::new(
            Target::All,
            ServerMessage::ScoreUpdate {
                scores: self.scores.clone(),
            },
        )]
    }

    fn on_session_start(&mut self) {
        self.active_spawn = None;
        self.time_since_spawn = 0.0;
        self.next_spawn_id = 0;
        for score in self.scores.values_mut() {
            *score = 0;
        }
    }

    fn on_reset(&mut self) -> Option<Reset> {
        self.active_spawn = None;
        self.time_since_spawn = 0.0;
        for score in self.scores.values_mut() {
            *score = 0;
        }
        Some(Reset {
            target_score: TARGET_SCORE,
        })
    }

    fn on_tick(&mut self, dt_seconds: f64) -> Vec<ServerMessage> {
        if self.active_spawn.is_some() {
            return Vec::new();
        }
        self.time_since_spawn += dt_seconds;
        if self.time_since_spawn < SPAWN_INTERVAL_SECS {
            return Vec::new();
        }
        self.time_since_spawn = 0.0;
        let spawn_id = self.next_spawn_id;
        self.next_spawn_id += 1;
        self.active_spawn = Some(spawn_id);
        vec![ServerMessage::DotSpawned { spawn_id }]
    }

    fn check_session_end(&mut self) -> Option<EndOutcome<DotDuelSchema>> {
        let (winner_id, _) = self
            .scores
            .iter()
            .find(|(_, score)| **score >= TARGET_SCORE)?;
        let winner_id = winner_id.clone();
        let winner_number = self.numbers.get(&winner_id).copied();
        Some(EndOutcome {
            winner_id: Some(winner_id),
            winner_number,
            app_data: Some(Ended {
                scores: self.scores.clone(),
            }),
        })
    }
}
