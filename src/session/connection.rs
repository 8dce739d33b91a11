//! The abstract transport the runtime depends on (spec.md §3: "deliberately
//! abstract so the runtime is testable with in-memory doubles").

/// A message-oriented full-duplex link to one participant. The runtime
/// never downcasts this; every effect it needs is one of these three
/// methods.
pub trait Connection: Send + Sync {
    fn send(&self, text: &str);
    fn close(&self);
    fn is_open(&self) -> bool;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::Connection;
    use std::sync::{Arc, Mutex};

    /// An in-memory [`Connection`] double: `send` appends to a shared
    /// buffer instead of writing to a socket, and `close` just flips a
    /// flag. Used by the crate's own tests and available to downstream
    /// apps under `test-support` for their own hook tests.
    #[derive(Clone)]
    pub struct FakeConnection {
        inner: Arc<Mutex<FakeConnectionState>>,
    }

    struct FakeConnectionState {
        sent: Vec<String>,
        open: bool,
    }

    impl FakeConnection {
        pub fn new() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeConnectionState {
                    sent: Vec::new(),
                    open: true,
                })),
            }
        }

        /// All frames sent so far, in order.
        pub fn sent(&self) -> Vec<String> {
            self.inner.lock().expect("lock never poisoned").sent.clone()
        }

        /// The last frame sent, if any.
        pub fn last_sent(&self) -> Option<String> {
            self.inner
                .lock()
                .expect("lock never poisoned")
                .sent
                .last()
                .cloned()
        }

        pub fn clear(&self) {
            self.inner.lock().expect("lock never poisoned").sent.clear();
        }
    }

    impl Default for FakeConnection {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Connection for FakeConnection {
        fn send(&self, text: &str) {
            let mut state = self.inner.lock().expect("lock never poisoned");
            if state.open {
                state.sent.push(text.to_string());
            }
        }

        fn close(&self) {
            self.inner.lock().expect("lock never poisoned").open = false;
        }

        fn is_open(&self) -> bool {
            self.inner.lock().expect("lock never poisoned").open
        }
    }
}
