//! JSON wire format (teacher: `api::schema::json::Json`), plus the single
//! ingress-normalization pass spec.md §9 calls for: legacy field/tag
//! aliases (§4.1 "Backwards-compatible aliases") are resolved here, once,
//! on the way in. Everything downstream of this module only ever sees
//! canonical names; every outgoing frame only ever emits canonical names
//! (spec.md §9 Open Question (b)).

use serde_json::{Value, json};

use crate::contract::message::{EndReason, FrameworkClientMessage, FrameworkServerMessage};
use crate::contract::schema::{Deserialize, Schema, SchemaType, Serialize};
use crate::error::ClientError;
use crate::session::participant::SessionPhase;

#[derive(Default)]
pub struct Json;

impl Schema for Json {
    fn schema_type() -> SchemaType {
        SchemaType::Text
    }
}

impl<T> Serialize<Json> for T
where
    T: serde::Serialize,
{
    fn serialize(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("app payload types are always serializable")
    }
}

impl<T> Deserialize<Json> for T
where
    T: serde::de::DeserializeOwned,
{
    fn deserialize(buf: &[u8]) -> Result<Self, ClientError> {
        serde_json::from_slice(buf).map_err(|_| ClientError::Deserialization)
    }
}

// --- field/tag names -------------------------------------------------

const TYPE: &str = "type";

const PARTICIPANT_READY: &str = "participant_ready";
const PLAYER_READY_ALIAS: &str = "player_ready";
const BOT_IDENTIFY: &str = "bot_identify";
const PLAY_AGAIN_VOTE: &str = "play_again_vote";

const WELCOME: &str = "welcome";
const OPPONENT_JOINED: &str = "opponent_joined";
const OPPONENT_LEFT: &str = "opponent_left";
const SESSION_STARTED: &str = "session_started";
const GAME_STARTED_ALIAS: &str = "game_started";
const SESSION_ENDED: &str = "session_ended";
const GAME_OVER_ALIAS: &str = "game_over";
const PLAY_AGAIN_STATUS: &str = "play_again_status";
const SESSION_RESET: &str = "session_reset";
const GAME_RESET_ALIAS: &str = "game_reset";
const ERROR: &str = "error";

const PARTICIPANT_ID: &str = "participantId";
const PLAYER_ID_ALIAS: &str = "playerId";
const PARTICIPANT_NUMBER: &str = "participantNumber";
const PLAYER_NUMBER_ALIAS: &str = "playerNumber";
const SESSION_PHASE: &str = "sessionPhase";
const GAME_PHASE_ALIAS: &str = "gamePhase";
const VOTED_PARTICIPANT_IDS: &str = "votedParticipantIds";
const VOTED_PLAYER_IDS_ALIAS: &str = "votedPlayerIds";
const TOTAL_PARTICIPANTS: &str = "totalParticipants";
const TOTAL_PLAYERS_ALIAS: &str = "totalPlayers";

const APP_DATA: &str = "appData";
const REASON: &str = "reason";
const WINNER_ID: &str = "winnerId";
const WINNER_NUMBER: &str = "winnerNumber";
const MESSAGE: &str = "message";

/// Reads either the canonical key or its legacy alias.
fn field<'a>(obj: &'a Value, canonical: &str, alias: &str) -> Option<&'a Value> {
    obj.get(canonical).or_else(|| obj.get(alias))
}

fn normalize_type_tag(tag: &str) -> &str {
    match tag {
        PLAYER_READY_ALIAS => PARTICIPANT_READY,
        GAME_STARTED_ALIAS => SESSION_STARTED,
        GAME_OVER_ALIAS => SESSION_ENDED,
        GAME_RESET_ALIAS => SESSION_RESET,
        other => other,
    }
}

// --- client -> server --------------------------------------------------

/// Attempts to parse `raw` as one of the three framework client messages
/// (spec.md §4.1 Composition rule A). Returns `None` both for malformed
/// JSON and for a well-formed message whose (normalized) `type` tag isn't
/// in the framework set — in both cases the caller falls through to the
/// app parser, per spec.md §4.1.
pub fn try_decode_client_message(raw: &[u8]) -> Option<FrameworkClientMessage> {
    let value: Value = serde_json::from_slice(raw).ok()?;
    let tag = value.get(TYPE)?.as_str()?;
    match normalize_type_tag(tag) {
        PARTICIPANT_READY => Some(FrameworkClientMessage::ParticipantReady),
        BOT_IDENTIFY => Some(FrameworkClientMessage::BotIdentify),
        PLAY_AGAIN_VOTE => Some(FrameworkClientMessage::PlayAgainVote),
        _ => None,
    }
}

// --- server -> client ---------------------------------------------------

/// Encodes a framework server message as canonical JSON. `app_data` is
/// spliced in pre-serialized, as raw bytes that must already be valid
/// JSON (spec.md §4.1 Composition rule B).
pub fn encode_server_message(message: &FrameworkServerMessage) -> String {
    let mut node = match message {
        FrameworkServerMessage::Welcome {
            participant_id,
            participant_number,
            session_phase,
            ..
        } => json!({
            TYPE: WELCOME,
            PARTICIPANT_ID: participant_id,
            PARTICIPANT_NUMBER: participant_number,
            SESSION_PHASE: session_phase.as_str(),
        }),
        FrameworkServerMessage::OpponentJoined { .. } => json!({ TYPE: OPPONENT_JOINED }),
        FrameworkServerMessage::OpponentLeft => json!({ TYPE: OPPONENT_LEFT }),
        FrameworkServerMessage::SessionStarted => json!({ TYPE: SESSION_STARTED }),
        FrameworkServerMessage::SessionEnded {
            reason,
            winner_id,
            winner_number,
            ..
        } => {
            let mut node = json!({
                TYPE: SESSION_ENDED,
                REASON: reason.as_str(),
            });
            let obj = node.as_object_mut().expect("object literal");
            if let Some(id) = winner_id {
                obj.insert(WINNER_ID.to_string(), json!(id));
            }
            if let Some(number) = winner_number {
                obj.insert(WINNER_NUMBER.to_string(), json!(number));
            }
            node
        }
        FrameworkServerMessage::PlayAgainStatus {
            voted_participant_ids,
            total_participants,
        } => json!({
            TYPE: PLAY_AGAIN_STATUS,
            VOTED_PARTICIPANT_IDS: voted_participant_ids,
            TOTAL_PARTICIPANTS: total_participants,
        }),
        FrameworkServerMessage::SessionReset { .. } => json!({ TYPE: SESSION_RESET }),
        FrameworkServerMessage::Error { message } => json!({
            TYPE: ERROR,
            MESSAGE: message,
        }),
    };

    if let Some(app_data) = app_data_of(message) {
        let parsed: Value = serde_json::from_slice(app_data).unwrap_or(Value::Null);
        node.as_object_mut()
            .expect("object literal")
            .insert(APP_DATA.to_string(), parsed);
    }

    node.to_string()
}

fn app_data_of(message: &FrameworkServerMessage) -> Option<&[u8]> {
    match message {
        FrameworkServerMessage::Welcome { app_data, .. }
        | FrameworkServerMessage::OpponentJoined { app_data }
        | FrameworkServerMessage::SessionEnded { app_data, .. }
        | FrameworkServerMessage::SessionReset { app_data } => app_data.as_deref(),
        _ => None,
    }
}

/// Decodes a server->client framework message, accepting both the
/// canonical and the legacy alias spelling of every tag and field
/// (spec.md §4.1 "MUST accept both on ingress"). Used by [`crate::client`].
pub fn try_decode_server_message(raw: &[u8]) -> Option<FrameworkServerMessage> {
    let value: Value = serde_json::from_slice(raw).ok()?;
    let tag = value.get(TYPE)?.as_str()?;
    let app_data = field(&value, APP_DATA, APP_DATA)
        .map(|v| serde_json::to_vec(v).unwrap_or_default());

    match normalize_type_tag(tag) {
        WELCOME => {
            let participant_id = field(&value, PARTICIPANT_ID, PLAYER_ID_ALIAS)?
                .as_str()?
                .to_string();
            let participant_number =
                field(&value, PARTICIPANT_NUMBER, PLAYER_NUMBER_ALIAS)?.as_u64()? as u8;
            let session_phase =
                SessionPhase::from_str(field(&value, SESSION_PHASE, GAME_PHASE_ALIAS)?.as_str()?)?;
            Some(FrameworkServerMessage::Welcome {
                participant_id,
                participant_number,
                session_phase,
                app_data,
            })
        }
        OPPONENT_JOINED => Some(FrameworkServerMessage::OpponentJoined { app_data }),
        OPPONENT_LEFT => Some(FrameworkServerMessage::OpponentLeft),
        SESSION_STARTED => Some(FrameworkServerMessage::SessionStarted),
        SESSION_ENDED => {
            let reason = EndReason::from_str(value.get(REASON)?.as_str()?)?;
            let winner_id = value
                .get(WINNER_ID)
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let winner_number = value.get(WINNER_NUMBER).and_then(|v| v.as_u64()).map(|n| n as u8);
            Some(FrameworkServerMessage::SessionEnded {
                reason,
                winner_id,
                winner_number,
                app_data,
            })
        }
        PLAY_AGAIN_STATUS => {
            let voted_participant_ids =
                field(&value, VOTED_PARTICIPANT_IDS, VOTED_PLAYER_IDS_ALIAS)?
                    .as_array()?
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
            let total_participants =
                field(&value, TOTAL_PARTICIPANTS, TOTAL_PLAYERS_ALIAS)?.as_u64()? as usize;
            Some(FrameworkServerMessage::PlayAgainStatus {
                voted_participant_ids,
                total_participants,
            })
        }
        SESSION_RESET => Some(FrameworkServerMessage::SessionReset { app_data }),
        ERROR => Some(FrameworkServerMessage::Error {
            message: value.get(MESSAGE)?.as_str()?.to_string(),
        }),
        _ => None,
    }
}

/// Encodes a client->server framework message. Canonical names only
/// (spec.md §9 Open Question (b)).
pub fn encode_client_message(message: &FrameworkClientMessage) -> String {
    let tag = match message {
        FrameworkClientMessage::ParticipantReady => PARTICIPANT_READY,
        FrameworkClientMessage::BotIdentify => BOT_IDENTIFY,
        FrameworkClientMessage::PlayAgainVote => PLAY_AGAIN_VOTE,
    };
    json!({ TYPE: tag }).to_string()
}
