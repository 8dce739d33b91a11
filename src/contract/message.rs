//! The fixed framework message vocabulary (spec.md §4.1).
//!
//! These are plain enums; wire encoding (including alias normalization)
//! lives in [`crate::contract::json`] so this module stays format-agnostic,
//! matching how the teacher separates `api::message` shapes from their
//! `api::schema::json` (de)serialization.

use crate::session::{ParticipantId, ParticipantNumber, SessionPhase};

/// Client -> server framework messages.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameworkClientMessage {
    ParticipantReady,
    BotIdentify,
    PlayAgainVote,
}

/// Why a session ended, per spec.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Completed,
    ParticipantLeft,
    Timeout,
    AppCondition,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EndReason::Completed => "completed",
            EndReason::ParticipantLeft => "participant_left",
            EndReason::Timeout => "timeout",
            EndReason::AppCondition => "app_condition",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(EndReason::Completed),
            "participant_left" => Some(EndReason::ParticipantLeft),
            "timeout" => Some(EndReason::Timeout),
            "app_condition" => Some(EndReason::AppCondition),
            _ => None,
        }
    }
}

/// Server -> client framework messages. `appData` fields carry an
/// already-serialized app payload (spec.md §4.1 Composition rule B); the
/// framework never inspects their contents.
#[derive(Debug, Clone)]
pub enum FrameworkServerMessage {
    Welcome {
        participant_id: ParticipantId,
        participant_number: ParticipantNumber,
        session_phase: SessionPhase,
        app_data: Option<Vec<u8>>,
    },
    OpponentJoined {
        app_data: Option<Vec<u8>>,
    },
    OpponentLeft,
    SessionStarted,
    SessionEnded {
        reason: EndReason,
        winner_id: Option<ParticipantId>,
        winner_number: Option<ParticipantNumber>,
        app_data: Option<Vec<u8>>,
    },
    PlayAgainStatus {
        voted_participant_ids: Vec<ParticipantId>,
        total_participants: usize,
    },
    SessionReset {
        app_data: Option<Vec<u8>>,
    },
    Error {
        message: String,
    },
}
