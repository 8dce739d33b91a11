//! Dot Duel server binary, wiring the demo hooks into the framework's
//! `SessionServer`/`AxumTransport` (spec.md §6), grounded in the shape of
//! the teacher's `examples/pong` `start_server` (minus the embedded-client
//! thread, since this crate serves one process per role).

#[path = "hooks.rs"]
mod hooks;

use std::sync::Arc;

use duet::{
    AxumTransport, Clock, InactivityMonitor, ServerConfig, SessionServer, SessionRuntime,
    SystemClock, TickConfig,
};

use hooks::DotDuelHooks;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = ServerConfig::from_env_with_default_port(3001);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let runtime = SessionRuntime::new(
        DotDuelHooks::default(),
        Arc::clone(&clock),
        Some(TickConfig { interval_ms: 100 }),
    );

    let monitor = Arc::new(InactivityMonitor::new(
        clock,
        config.inactivity_timeout_ms,
        config.inactivity_check_interval_ms,
    ));

    let server = SessionServer::new(AxumTransport, runtime, monitor, config);
    if let Err(err) = server.run().await {
        log::error!("dot duel server exited with error: {err}");
        std::process::exit(1);
    }
}
