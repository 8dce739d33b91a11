//! C2 integration tests: the two-slot admission, ready-gate, tick loop,
//! play-again/reset protocol and idempotent end-session path (spec.md §4.2,
//! §8 scenarios S2-S5).

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{PingPongHooks, PingPongSchema};
use duet::Connection;
use duet::clock::test_clock::TestClock;
use duet::session::FakeConnection;
use duet::{Clock, EndReason, SessionError, SessionPhase, SessionRuntime, TickConfig};

fn runtime(win_at: Option<u32>, tick: Option<TickConfig>) -> (SessionRuntime<PingPongHooks, PingPongSchema>, Arc<TestClock>) {
    let clock = Arc::new(TestClock::new());
    let runtime = SessionRuntime::new(PingPongHooks::new(win_at), clock.clone() as Arc<dyn Clock>, tick);
    (runtime, clock)
}

#[test]
fn a_third_connection_is_rejected_once_both_slots_are_full() {
    let (runtime, _clock) = runtime(None, None);

    let a = Arc::new(FakeConnection::new());
    let b = Arc::new(FakeConnection::new());
    let c = Arc::new(FakeConnection::new());

    assert!(runtime.handle_connection(a.clone()).is_some());
    assert!(runtime.handle_connection(b.clone()).is_some());
    assert!(runtime.handle_connection(c.clone()).is_none());

    // The rejected connection gets an error frame and is closed, the two
    // seated ones are untouched.
    assert!(c.last_sent().unwrap().contains("Session is full"));
    assert!(!c.is_open());
    assert!(a.is_open());
    assert!(b.is_open());
}

#[test]
fn session_starts_only_once_both_participants_are_ready() {
    let (runtime, _clock) = runtime(None, None);
    let a = Arc::new(FakeConnection::new());
    let b = Arc::new(FakeConnection::new());
    let pa = runtime.handle_connection(a.clone()).unwrap();
    let pb = runtime.handle_connection(b.clone()).unwrap();

    assert_eq!(runtime.phase(), SessionPhase::Waiting);

    runtime.handle_message(&pa.id, br#"{"type":"participant_ready"}"#);
    assert_eq!(runtime.phase(), SessionPhase::Waiting);

    runtime.handle_message(&pb.id, br#"{"type":"participant_ready"}"#);
    assert_eq!(runtime.phase(), SessionPhase::Playing);

    assert!(a.sent().iter().any(|m| m.contains("session_started")));
    assert!(b.sent().iter().any(|m| m.contains("session_started")));
}

#[test]
fn a_bot_identify_counts_as_ready() {
    let (runtime, _clock) = runtime(None, None);
    let a = Arc::new(FakeConnection::new());
    let b = Arc::new(FakeConnection::new());
    let pa = runtime.handle_connection(a.clone()).unwrap();
    let pb = runtime.handle_connection(b.clone()).unwrap();

    runtime.handle_message(&pa.id, br#"{"type":"bot_identify"}"#);
    runtime.handle_message(&pb.id, br#"{"type":"participant_ready"}"#);

    assert_eq!(runtime.phase(), SessionPhase::Playing);
}

#[test]
fn app_messages_are_routed_by_target_and_ignored_outside_playing() {
    let (runtime, _clock) = runtime(None, None);
    let a = Arc::new(FakeConnection::new());
    let b = Arc::new(FakeConnection::new());
    let pa = runtime.handle_connection(a.clone()).unwrap();
    let _pb = runtime.handle_connection(b.clone()).unwrap();

    a.clear();
    b.clear();
    // Still `waiting`: the app hook sees the phase and declines to respond.
    runtime.handle_message(&pa.id, br#"{"kind":"Ping"}"#);
    assert!(a.sent().is_empty());
    assert!(b.sent().is_empty());

    runtime.handle_message(&pa.id, br#"{"type":"participant_ready"}"#);
    runtime.handle_message(&_pb.id, br#"{"type":"participant_ready"}"#);
    a.clear();
    b.clear();

    runtime.handle_message(&pa.id, br#"{"kind":"Ping"}"#);
    assert!(a.sent().iter().any(|m| m.contains("Pong")));
    assert!(b.sent().iter().any(|m| m.contains("Pong")));
}

#[test]
fn a_malformed_message_gets_an_error_frame_not_a_panic() {
    let (runtime, _clock) = runtime(None, None);
    let a = Arc::new(FakeConnection::new());
    let pa = runtime.handle_connection(a.clone()).unwrap();
    a.clear();

    runtime.handle_message(&pa.id, b"not json at all");
    assert!(a.last_sent().unwrap().contains("Invalid message format"));
}

#[tokio::test(start_paused = true)]
async fn the_tick_loop_drives_app_conditioned_end_and_then_stops() {
    let (runtime, clock) = runtime(Some(2), Some(TickConfig { interval_ms: 10 }));
    let a = Arc::new(FakeConnection::new());
    let b = Arc::new(FakeConnection::new());
    let pa = runtime.handle_connection(a.clone()).unwrap();
    let pb = runtime.handle_connection(b.clone()).unwrap();
    runtime.handle_message(&pa.id, br#"{"type":"participant_ready"}"#);
    runtime.handle_message(&pb.id, br#"{"type":"participant_ready"}"#);
    assert_eq!(runtime.phase(), SessionPhase::Playing);

    for _ in 0..2 {
        runtime.handle_message(&pa.id, br#"{"kind":"Ping"}"#);
    }

    clock.advance(Duration::from_millis(10));
    tokio::time::advance(Duration::from_millis(10)).await;
    tokio::task::yield_now().await;

    assert_eq!(runtime.phase(), SessionPhase::Finished);
    assert!(a.sent().iter().any(|m| m.contains("session_ended") && m.contains("app_condition")));
}

#[test]
fn end_session_is_idempotent_and_rejects_calls_while_waiting() {
    let (runtime, _clock) = runtime(None, None);
    let a = Arc::new(FakeConnection::new());
    let b = Arc::new(FakeConnection::new());
    let pa = runtime.handle_connection(a.clone()).unwrap();
    let pb = runtime.handle_connection(b.clone()).unwrap();

    assert!(matches!(
        runtime.end_session(None, None, EndReason::Timeout, None),
        Err(SessionError::NotPlaying)
    ));

    runtime.handle_message(&pa.id, br#"{"type":"participant_ready"}"#);
    runtime.handle_message(&pb.id, br#"{"type":"participant_ready"}"#);

    assert!(runtime.end_session(None, None, EndReason::Timeout, None).is_ok());
    // Second call on an already-finished session is a harmless no-op.
    assert!(runtime.end_session(None, None, EndReason::Timeout, None).is_ok());
}

#[test]
fn play_again_requires_every_remaining_participant_and_then_resets() {
    let (runtime, _clock) = runtime(None, None);
    let a = Arc::new(FakeConnection::new());
    let b = Arc::new(FakeConnection::new());
    let pa = runtime.handle_connection(a.clone()).unwrap();
    let pb = runtime.handle_connection(b.clone()).unwrap();
    runtime.handle_message(&pa.id, br#"{"type":"participant_ready"}"#);
    runtime.handle_message(&pb.id, br#"{"type":"participant_ready"}"#);
    runtime.end_session(None, None, EndReason::Timeout, None).unwrap();
    assert_eq!(runtime.phase(), SessionPhase::Finished);

    a.clear();
    b.clear();
    runtime.handle_message(&pa.id, br#"{"type":"play_again_vote"}"#);
    assert_eq!(runtime.phase(), SessionPhase::Finished);
    assert!(a.sent().iter().any(|m| m.contains("play_again_status")));

    runtime.handle_message(&pb.id, br#"{"type":"play_again_vote"}"#);
    assert_eq!(runtime.phase(), SessionPhase::Waiting);
    assert!(b.sent().iter().any(|m| m.contains("session_reset")));
}

#[test]
fn a_departure_notifies_the_remaining_participant_but_leaves_phase_untouched() {
    let (runtime, _clock) = runtime(None, None);
    let a = Arc::new(FakeConnection::new());
    let b = Arc::new(FakeConnection::new());
    let pa = runtime.handle_connection(a.clone()).unwrap();
    let pb = runtime.handle_connection(b.clone()).unwrap();
    runtime.handle_message(&pa.id, br#"{"type":"participant_ready"}"#);
    runtime.handle_message(&pb.id, br#"{"type":"participant_ready"}"#);
    assert_eq!(runtime.phase(), SessionPhase::Playing);

    b.clear();
    runtime.handle_disconnection(&pa.id);
    assert!(b.sent().iter().any(|m| m.contains("opponent_left")));
    // The app decides whether this ends the session; the runtime itself
    // does not force a phase change.
    assert_eq!(runtime.phase(), SessionPhase::Playing);
}
