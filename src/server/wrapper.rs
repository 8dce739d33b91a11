//! [`SessionServer`]: binds a [`Transport`] to signal-driven graceful
//! shutdown (spec.md §4.4, §6), grounded on the teacher's own
//! `tokio::select!`-over-`ctrl_c()`/SIGTERM pattern in
//! `server/runtime.rs`, generalized so a monitor-fired shutdown collapses
//! into the same exit path as an OS signal.

use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::config::ServerConfig;
use crate::contract::schema::AppSchema;
use crate::error::TransportError;
use crate::inactivity::InactivityMonitor;
use crate::session::{AppHooks, SessionRuntime};

use super::transport::Transport;

/// Runs a [`Transport`] to completion, shutting it down gracefully on
/// SIGINT/SIGTERM or when the [`InactivityMonitor`] fires, whichever
/// comes first (spec.md §4.4's "single graceful shutdown path").
pub struct SessionServer<T, H, S>
where
    T: Transport<H, S>,
    S: AppSchema,
    H: AppHooks<S>,
{
    transport: T,
    runtime: SessionRuntime<H, S>,
    monitor: Arc<InactivityMonitor>,
    config: ServerConfig,
}

impl<T, H, S> SessionServer<T, H, S>
where
    T: Transport<H, S>,
    S: AppSchema,
    H: AppHooks<S>,
{
    pub fn new(
        transport: T,
        runtime: SessionRuntime<H, S>,
        monitor: Arc<InactivityMonitor>,
        config: ServerConfig,
    ) -> Self {
        Self {
            transport,
            runtime,
            monitor,
            config,
        }
    }

    /// Runs until a shutdown trigger fires, then stops the monitor and
    /// the runtime's tick loop before returning. The `Ok(())` return is
    /// the graceful-shutdown path (spec.md §6 exit code `0`); a transport
    /// failure propagates as `Err`.
    pub async fn run(self) -> Result<(), TransportError> {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<String>();
        let shutdown_tx = Arc::new(Mutex::new(Some(shutdown_tx)));

        let monitor_tx = Arc::clone(&shutdown_tx);
        let monitor_handle = self.monitor.spawn(move |reason| {
            if let Some(tx) = monitor_tx.lock().unwrap().take() {
                let _ = tx.send(reason);
            }
        });

        let runtime = self.runtime.clone();
        let monitor = Arc::clone(&self.monitor);

        let transport_result = tokio::select! {
            result = self.transport.run(runtime, Arc::clone(&monitor), self.config) => {
                result
            }
            reason = shutdown_rx => {
                let reason = reason.unwrap_or_else(|_| "shutdown signal received".to_string());
                log::info!("shutting down: {reason}");
                Ok(())
            }
            _ = wait_for_os_signal() => {
                log::info!("shutting down: received termination signal");
                Ok(())
            }
        };

        monitor.stop();
        monitor_handle.abort();
        self.runtime.stop();

        transport_result
    }
}

#[cfg(unix)]
async fn wait_for_os_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_os_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
