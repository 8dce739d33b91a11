//! Dot Duel terminal client: connects, readies up, and taps on Enter
//! whenever a dot is live. Grounded in the teacher's
//! `client/protocol/ws.rs` connect-then-dispatch shape, adapted to a
//! terminal `EventSink` instead of a game-engine render loop.

#[path = "hooks.rs"]
mod hooks;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use duet::{ConnectionState, EndReason, EventSink, ParticipantId, ParticipantNumber, ReconnectPolicy, SessionClient};
use tokio::io::{AsyncBufReadExt, BufReader};

use hooks::{ClientMessage, DotDuelSchema, OpponentJoined, Reset, ServerMessage, Welcome};

struct TerminalSink {
    active_spawn: AtomicU64,
    has_active_spawn: std::sync::atomic::AtomicBool,
}

impl TerminalSink {
    fn new() -> Self {
        Self {
            active_spawn: AtomicU64::new(0),
            has_active_spawn: std::sync::atomic::AtomicBool::new(false),
        }
    }

    fn take_active_spawn(&self) -> Option<u64> {
        if self.has_active_spawn.swap(false, Ordering::SeqCst) {
            Some(self.active_spawn.load(Ordering::SeqCst))
        } else {
            None
        }
    }
}

impl EventSink<DotDuelSchema> for Arc<TerminalSink> {
    fn on_connection_state_change(&self, state: ConnectionState) {
        (**self).on_connection_state_change(state);
    }
    fn on_session_join(&self, welcome: Welcome) {
        (**self).on_session_join(welcome);
    }
    fn on_opponent_joined(&self, app_data: Option<OpponentJoined>) {
        (**self).on_opponent_joined(app_data);
    }
    fn on_opponent_left(&self) {
        (**self).on_opponent_left();
    }
    fn on_session_start(&self) {
        (**self).on_session_start();
    }
    fn on_session_end(
        &self,
        winner_id: Option<ParticipantId>,
        winner_number: Option<ParticipantNumber>,
        reason: EndReason,
    ) {
        (**self).on_session_end(winner_id, winner_number, reason);
    }
    fn on_play_again_status(&self, voted_count: usize, total_participants: usize) {
        (**self).on_play_again_status(voted_count, total_participants);
    }
    fn on_session_reset(&self, app_data: Option<Reset>) {
        (**self).on_session_reset(app_data);
    }
    fn on_error(&self, message: String) {
        (**self).on_error(message);
    }
    fn on_app_message(&self, message: ServerMessage) {
        (**self).on_app_message(message);
    }
}

impl TerminalSink {
    fn on_connection_state_change(&self, state: ConnectionState) {
        println!("[connection] {state:?}");
    }

    fn on_session_join(&self, welcome: Welcome) {
        println!("joined: target score is {}", welcome.target_score);
    }

    fn on_opponent_joined(&self, app_data: Option<OpponentJoined>) {
        if let Some(data) = app_data {
            println!("opponent #{} joined", data.opponent_number);
        }
    }

    fn on_opponent_left(&self) {
        println!("opponent left");
    }

    fn on_session_start(&self) {
        println!("session started -- watch for dots!");
    }

    fn on_session_end(
        &self,
        winner_id: Option<ParticipantId>,
        winner_number: Option<ParticipantNumber>,
        reason: EndReason,
    ) {
        println!("session ended ({}): winner {winner_id:?} (#{winner_number:?})", reason.as_str());
    }

    fn on_play_again_status(&self, voted_count: usize, total_participants: usize) {
        println!("play again votes: {voted_count}/{total_participants}");
    }

    fn on_session_reset(&self, app_data: Option<Reset>) {
        if let Some(data) = app_data {
            println!("session reset -- target score is {}", data.target_score);
        }
    }

    fn on_error(&self, message: String) {
        eprintln!("server error: {message}");
    }

    fn on_app_message(&self, message: ServerMessage) {
        match message {
            ServerMessage::DotSpawned { spawn_id } => {
                self.active_spawn.store(spawn_id, Ordering::SeqCst);
                self.has_active_spawn.store(true, Ordering::SeqCst);
                println!("a dot appeared! press enter to tap it");
            }
            ServerMessage::ScoreUpdate { scores } => {
                println!("scores: {scores:?}");
            }
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let url = std::env::var("DOT_DUEL_URL").unwrap_or_else(|_| "ws://127.0.0.1:3001/ws".to_string());
    let sink = Arc::new(TerminalSink::new());
    let client: SessionClient<_, DotDuelSchema> =
        SessionClient::new(Arc::clone(&sink), ReconnectPolicy::disabled());

    if let Err(err) = client.connect(&url).await {
        eprintln!("failed to connect: {err}");
        std::process::exit(1);
    }
    client.send_ready();

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    while let Ok(Some(_)) = lines.next_line().await {
        if let Some(spawn_id) = sink.take_active_spawn() {
            client.send_app_message(ClientMessage::Tap { spawn_id });
        } else {
            client.send_play_again_vote();
        }
    }
}
