//! Reconnect policy (spec.md §4.5 "Reconnection").

/// Controls whether [`super::SessionClient`] retries an unexpected close.
/// Disabled by default: the server holds no state across a reconnect, so
/// the caller's app state is only safe to rebuild from a fresh `welcome`
/// while the session is `waiting` (spec.md §4.5).
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: 1_000,
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled(delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            enabled: true,
            delay_ms,
            max_attempts,
        }
    }
}
