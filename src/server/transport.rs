//! The pluggable WebSocket acceptor abstraction (teacher:
//! `server::protocol::NetworkProtocol`), narrowed to the one-app-per-process
//! shape spec.md §4.4/§6 describes.

use std::sync::Arc;

use crate::error::TransportError;
use crate::inactivity::InactivityMonitor;
use crate::session::{AppHooks, SessionRuntime};
use crate::{config::ServerConfig, contract::schema::AppSchema};

/// Binds a concrete socket acceptor to a [`SessionRuntime`] and an
/// [`InactivityMonitor`] (spec.md §4.4). The wrapper "MUST NOT interpret
/// message contents" beyond what's needed to feed the monitor's ignore
/// set, matching spec.md §4.4's transparency requirement.
pub trait Transport<H, S>
where
    S: AppSchema,
    H: AppHooks<S>,
{
    fn run(
        self,
        runtime: SessionRuntime<H, S>,
        monitor: Arc<InactivityMonitor>,
        config: ServerConfig,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
