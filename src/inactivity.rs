//! C3: the inactivity watchdog (spec.md §4.3).
//!
//! Grounded on the teacher's own interval-loop idiom (`tokio::time::interval`,
//! as used for Carbonfreezer's `relay-server/src/main.rs` dead-room
//! watchdog) generalized to the three-condition shutdown rule spec.md §4.3
//! specifies, with an injected [`Clock`] so the firing window (P11) is
//! testable without real sleeps.
//!
//! All timestamps are tracked as millisecond offsets from the monitor's
//! creation time rather than as raw `Instant`s, so they can live in plain
//! atomics and be compared without ever subtracting two possibly
//! out-of-order `Instant`s.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::Clock;

pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 30_000;

struct State {
    start: Instant,
    last_activity_offset_ms: AtomicU64,
    connection_count: AtomicU64,
    has_ever_connected: AtomicBool,
    stopped: AtomicBool,
    fired: AtomicBool,
}

impl State {
    fn offset_ms(&self, clock: &dyn Clock) -> u64 {
        clock.now().saturating_duration_since(self.start).as_millis() as u64
    }
}

/// Watches connection/activity counters and fires a shutdown callback at
/// most once when the session has been idle for `timeout_ms`.
pub struct InactivityMonitor {
    state: Arc<State>,
    clock: Arc<dyn Clock>,
    timeout_ms: u64,
    check_interval_ms: u64,
    ignore_kinds: HashSet<&'static str>,
}

impl InactivityMonitor {
    pub fn new(clock: Arc<dyn Clock>, timeout_ms: u64, check_interval_ms: u64) -> Self {
        Self {
            state: Arc::new(State {
                start: clock.now(),
                last_activity_offset_ms: AtomicU64::new(0),
                connection_count: AtomicU64::new(0),
                has_ever_connected: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                fired: AtomicBool::new(false),
            }),
            clock,
            timeout_ms,
            check_interval_ms,
            ignore_kinds: HashSet::new(),
        }
    }

    pub fn with_ignore_kinds(mut self, kinds: impl IntoIterator<Item = &'static str>) -> Self {
        self.ignore_kinds = kinds.into_iter().collect();
        self
    }

    pub fn record_connect(&self) {
        self.state.has_ever_connected.store(true, Ordering::SeqCst);
        self.state.connection_count.fetch_add(1, Ordering::SeqCst);
        self.touch();
    }

    pub fn record_disconnect(&self) {
        // Floored at zero (spec.md §4.3).
        let _ = self.state.connection_count.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |n| Some(n.saturating_sub(1)),
        );
        self.touch();
    }

    /// Records activity for a message of the given kind, unless `kind` is
    /// in the ignore set (spec.md §4.3 — used to exclude high-frequency
    /// streaming traffic from resetting the idle timer).
    pub fn record_activity(&self, kind: &str) {
        if self.ignore_kinds.contains(kind) {
            return;
        }
        self.touch();
    }

    fn touch(&self) {
        let offset = self.state.offset_ms(&*self.clock);
        self.state.last_activity_offset_ms.store(offset, Ordering::SeqCst);
    }

    fn should_fire(&self) -> bool {
        let now_offset = self.state.offset_ms(&*self.clock);
        let has_ever_connected = self.state.has_ever_connected.load(Ordering::SeqCst);
        let connection_count = self.state.connection_count.load(Ordering::SeqCst);
        let last_activity_offset = self.state.last_activity_offset_ms.load(Ordering::SeqCst);

        if !has_ever_connected {
            return now_offset >= self.timeout_ms;
        }
        let _ = connection_count; // "emptied" and "idle connected" share the same test.
        now_offset.saturating_sub(last_activity_offset) >= self.timeout_ms
    }

    pub fn stop(&self) {
        self.state.stopped.store(true, Ordering::SeqCst);
    }

    /// Spawns the periodic check loop. `on_shutdown` is invoked at most
    /// once, the first time a shutdown condition holds, with a
    /// human-readable reason (spec.md S1: "No participants connected
    /// within...").
    pub fn spawn<F>(&self, on_shutdown: F) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce(String) + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let timeout_ms = self.timeout_ms;
        let check_interval_ms = self.check_interval_ms;
        let ignore_kinds = self.ignore_kinds.clone();

        let checker = InactivityMonitor {
            state: Arc::clone(&state),
            clock: Arc::clone(&clock),
            timeout_ms,
            check_interval_ms,
            ignore_kinds,
        };

        let mut on_shutdown = Some(on_shutdown);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(check_interval_ms));
            loop {
                interval.tick().await;
                if state.stopped.load(Ordering::SeqCst) || state.fired.load(Ordering::SeqCst) {
                    break;
                }
                if checker.should_fire() {
                    state.fired.store(true, Ordering::SeqCst);
                    let has_ever_connected = state.has_ever_connected.load(Ordering::SeqCst);
                    let reason = if !has_ever_connected {
                        format!("No participants connected within {timeout_ms}ms of session start")
                    } else {
                        format!("Session idle for at least {timeout_ms}ms")
                    };
                    if let Some(cb) = on_shutdown.take() {
                        cb(reason);
                    }
                    break;
                }
            }
        })
    }
}
