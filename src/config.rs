//! Environment-variable configuration (spec.md §6).

use crate::inactivity::{DEFAULT_CHECK_INTERVAL_MS, DEFAULT_TIMEOUT_MS};

/// Process-level configuration for one session server, read once at
/// startup. The lobby service (out of scope, spec.md §1) is responsible
/// for populating the environment before spawning this process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub session_id: Option<String>,
    pub app_id: Option<String>,
    pub lobby_url: Option<String>,
    pub inactivity_timeout_ms: u64,
    pub inactivity_check_interval_ms: u64,
}

impl ServerConfig {
    /// Reads `PORT`, `SESSION_ID`, `APP_ID`, `LOBBY_URL`,
    /// `INACTIVITY_TIMEOUT_MS`, `INACTIVITY_CHECK_INTERVAL_MS`, applying
    /// the defaults spec.md §4.3/§6 specify. A malformed numeric override
    /// is logged and ignored rather than treated as fatal ("when present
    /// and parseable as positive integers").
    pub fn from_env() -> Self {
        Self::from_env_with_default_port(3001)
    }

    pub fn from_env_with_default_port(default_port: u16) -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default_port);

        Self {
            port,
            session_id: std::env::var("SESSION_ID").ok(),
            app_id: std::env::var("APP_ID").ok(),
            lobby_url: std::env::var("LOBBY_URL").ok(),
            inactivity_timeout_ms: positive_u64_env("INACTIVITY_TIMEOUT_MS", DEFAULT_TIMEOUT_MS),
            inactivity_check_interval_ms: positive_u64_env(
                "INACTIVITY_CHECK_INTERVAL_MS",
                DEFAULT_CHECK_INTERVAL_MS,
            ),
        }
    }

    /// The client bootstrap document (spec.md §6 "`session.json`").
    pub fn bootstrap_json(&self, ws_url: &str) -> serde_json::Value {
        serde_json::json!({
            "appId": self.app_id,
            "sessionId": self.session_id,
            "wsUrl": ws_url,
            "lobbyUrl": self.lobby_url,
        })
    }
}

fn positive_u64_env(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(value) if value > 0 => value,
            _ => {
                log::warn!("{key}={raw:?} is not a positive integer; using default {default}");
                default
            }
        },
        Err(_) => default,
    }
}
