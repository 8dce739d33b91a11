//! axum-based [`Transport`] (grounded on Carbonfreezer's
//! `relay-server/src/main.rs`: a single `/ws` route upgraded with
//! `ws.on_upgrade`, split sender/receiver, and a `ServeDir` fallback — here
//! narrowed to the session-bootstrap document spec.md §6 asks for instead
//! of a static-file fallback, since static asset serving is explicitly out
//! of scope per spec.md §1).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::ServerConfig;
use crate::contract::schema::AppSchema;
use crate::error::TransportError;
use crate::inactivity::InactivityMonitor;
use crate::session::{AppHooks, Connection, SessionRuntime};

/// [`Connection`] impl backed by an axum [`WebSocket`] split sink, reached
/// only through an unbounded channel and a dedicated writer task — the
/// same shape as the teacher's `SessionManager`'s per-player
/// `UnboundedSender<Vec<u8>>`, so `Connection::send` never blocks the
/// caller on socket I/O.
struct WsConnection {
    outbound: mpsc::UnboundedSender<Message>,
}

impl Connection for WsConnection {
    fn send(&self, text: &str) {
        let _ = self.outbound.send(Message::Text(text.to_string().into()));
    }

    fn close(&self) {
        let _ = self.outbound.send(Message::Close(None));
    }

    fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }
}

struct ServerState<H, S>
where
    S: AppSchema,
    H: AppHooks<S>,
{
    runtime: SessionRuntime<H, S>,
    monitor: Arc<InactivityMonitor>,
    config: ServerConfig,
}

/// C4 transport: accepts WebSocket connections over axum and a
/// `GET /session.json` bootstrap document (spec.md §6).
pub struct AxumTransport;

impl<H, S> super::transport::Transport<H, S> for AxumTransport
where
    S: AppSchema,
    H: AppHooks<S>,
{
    async fn run(
        self,
        runtime: SessionRuntime<H, S>,
        monitor: Arc<InactivityMonitor>,
        config: ServerConfig,
    ) -> Result<(), TransportError> {
        let port = config.port;
        let state = Arc::new(ServerState {
            runtime,
            monitor,
            config,
        });

        let app = Router::new()
            .route("/ws", get(ws_handler::<H, S>))
            .route("/session.json", get(bootstrap_handler::<H, S>))
            .with_state(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailure)?;

        log::info!("listening on {addr}");
        axum::serve(listener, app)
            .await
            .map_err(TransportError::BindFailure)
    }
}

async fn bootstrap_handler<H, S>(State(state): State<Arc<ServerState<H, S>>>) -> impl IntoResponse
where
    S: AppSchema,
    H: AppHooks<S>,
{
    let ws_url = format!("ws://127.0.0.1:{}/ws", state.config.port);
    Json(state.config.bootstrap_json(&ws_url))
}

async fn ws_handler<H, S>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState<H, S>>>,
) -> impl IntoResponse
where
    S: AppSchema,
    H: AppHooks<S>,
{
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket<H, S>(socket: WebSocket, state: Arc<ServerState<H, S>>)
where
    S: AppSchema,
    H: AppHooks<S>,
{
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let is_close = matches!(message, Message::Close(_));
            if sender.send(message).await.is_err() {
                break;
            }
            if is_close {
                break;
            }
        }
    });

    let connection = Arc::new(WsConnection {
        outbound: outbound_tx,
    });

    let Some(participant) = state.runtime.handle_connection(connection.clone()) else {
        let _ = writer.await;
        return;
    };
    state.monitor.record_connect();
    let participant_id = participant.id.clone();

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => {
                state.monitor.record_activity(&message_kind(text.as_bytes()));
                state.runtime.handle_message(&participant_id, text.as_bytes());
            }
            Message::Binary(bytes) => {
                state.monitor.record_activity(&message_kind(&bytes));
                state.runtime.handle_message(&participant_id, &bytes);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.runtime.handle_disconnection(&participant_id);
    state.monitor.record_disconnect();
    connection.close();
    let _ = writer.await;
}

/// Best-effort `type` tag extraction, used only to feed the inactivity
/// monitor's ignore set (spec.md §4.3) — never to interpret message
/// semantics, which the wrapper must not do (spec.md §4.4).
fn message_kind(raw: &[u8]) -> String {
    serde_json::from_slice::<Value>(raw)
        .ok()
        .and_then(|value| value.get("type").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default()
}
