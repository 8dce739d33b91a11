//! C3 integration tests: the three-condition watchdog (spec.md §4.3, §8
//! scenario S1), driven by an injected [`TestClock`] rather than real time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use duet::clock::test_clock::TestClock;
use duet::{Clock, InactivityMonitor};

#[tokio::test(start_paused = true)]
async fn fires_once_when_nobody_ever_connects() {
    let clock = Arc::new(TestClock::new());
    let monitor = InactivityMonitor::new(clock.clone() as Arc<dyn Clock>, 100, 10);

    let fired_reason = Arc::new(Mutex::new(None));
    let sink = fired_reason.clone();
    let handle = monitor.spawn(move |reason| {
        *sink.lock().unwrap() = Some(reason);
    });

    for _ in 0..9 {
        clock.advance(Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(10)).await;
    }
    assert!(fired_reason.lock().unwrap().is_none());

    clock.advance(Duration::from_millis(10));
    tokio::time::advance(Duration::from_millis(10)).await;

    let reason = fired_reason.lock().unwrap().clone();
    assert!(reason.unwrap().contains("No participants connected"));
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn a_connection_before_the_deadline_suppresses_the_never_connected_path() {
    let clock = Arc::new(TestClock::new());
    let monitor = InactivityMonitor::new(clock.clone() as Arc<dyn Clock>, 100, 10);

    let fired = Arc::new(AtomicBool::new(false));
    let sink = fired.clone();
    let handle = monitor.spawn(move |_| sink.store(true, Ordering::SeqCst));

    clock.advance(Duration::from_millis(50));
    tokio::time::advance(Duration::from_millis(50)).await;
    monitor.record_connect();

    for _ in 0..6 {
        clock.advance(Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(10)).await;
    }
    // 50ms (before connect) + 60ms (after, < 100ms idle) should not fire.
    assert!(!fired.load(Ordering::SeqCst));
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn fires_after_the_timeout_once_idle_following_activity() {
    let clock = Arc::new(TestClock::new());
    let monitor = InactivityMonitor::new(clock.clone() as Arc<dyn Clock>, 100, 10);
    monitor.record_connect();

    let fired = Arc::new(AtomicBool::new(false));
    let sink = fired.clone();
    let handle = monitor.spawn(move |_| sink.store(true, Ordering::SeqCst));

    for _ in 0..5 {
        clock.advance(Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(10)).await;
        monitor.record_activity("ping");
    }
    assert!(!fired.load(Ordering::SeqCst));

    for _ in 0..11 {
        clock.advance(Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(10)).await;
    }
    assert!(fired.load(Ordering::SeqCst));
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn ignored_kinds_do_not_reset_the_idle_timer() {
    let clock = Arc::new(TestClock::new());
    let monitor = InactivityMonitor::new(clock.clone() as Arc<dyn Clock>, 50, 10)
        .with_ignore_kinds(["heartbeat"]);
    monitor.record_connect();

    let fired = Arc::new(AtomicBool::new(false));
    let sink = fired.clone();
    let handle = monitor.spawn(move |_| sink.store(true, Ordering::SeqCst));

    for _ in 0..8 {
        clock.advance(Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(10)).await;
        monitor.record_activity("heartbeat");
    }
    assert!(fired.load(Ordering::SeqCst));
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn stop_prevents_any_further_firing() {
    let clock = Arc::new(TestClock::new());
    let monitor = InactivityMonitor::new(clock.clone() as Arc<dyn Clock>, 20, 10);
    monitor.stop();

    let fired = Arc::new(AtomicBool::new(false));
    let sink = fired.clone();
    let handle = monitor.spawn(move |_| sink.store(true, Ordering::SeqCst));

    for _ in 0..5 {
        clock.advance(Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(10)).await;
    }
    assert!(!fired.load(Ordering::SeqCst));
    handle.abort();
}
