//! `tokio-tungstenite` transport for [`SessionClient`] (teacher:
//! `client/protocol/ws.rs`'s `WebSocketClientProtocol`), generalized from a
//! single-struct client to the generic `SessionClient<E, S>` and extended
//! with the optional reconnect loop spec.md §4.5 describes.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;

use crate::contract::schema::{AppSchema, Schema, SchemaType};
use crate::error::ClientError;

use super::state::{ConnectionState, EventSink, SessionClient};

/// spec.md §4.5 `connect`. Installs parse-and-dispatch on every inbound
/// frame; on an unexpected close, schedules a reconnect if the client's
/// [`crate::client::ReconnectPolicy`] is enabled.
pub async fn connect<E, S>(client: &SessionClient<E, S>, url: &str) -> Result<(), ClientError>
where
    S: AppSchema,
    E: EventSink<S> + 'static,
{
    client.set_url(url.to_string());
    client.set_state(ConnectionState::Connecting);

    match open_socket(url).await {
        Ok((writer, reader)) => {
            client.reset_reconnect_attempts();
            spawn_io_loop(client.clone(), writer, reader);
            client.set_state(ConnectionState::Connected);
            Ok(())
        }
        Err(err) => {
            client.set_state(ConnectionState::Error);
            Err(err)
        }
    }
}

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn open_socket(
    url: &str,
) -> Result<
    (
        futures::stream::SplitSink<WsStream, Message>,
        futures::stream::SplitStream<WsStream>,
    ),
    ClientError,
> {
    let request = url
        .into_client_request()
        .map_err(|e| ClientError::ConnectionFailure(e.to_string()))?;
    let (stream, _) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| ClientError::ConnectionFailure(e.to_string()))?;
    Ok(stream.split())
}

fn spawn_io_loop<E, S>(
    client: SessionClient<E, S>,
    mut writer: futures::stream::SplitSink<WsStream, Message>,
    mut reader: futures::stream::SplitStream<WsStream>,
) where
    S: AppSchema,
    E: EventSink<S> + 'static,
{
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Vec<u8>>();
    client.set_outbound(Some(tx));

    tokio::spawn(async move {
        loop {
            tokio::select! {
                outbound = rx.recv() => {
                    match outbound {
                        Some(raw) => {
                            if writer.send(encode_outbound::<S>(raw)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                inbound = reader.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => client.dispatch(text.as_bytes()),
                        Some(Ok(Message::Binary(bytes))) => client.dispatch(&bytes),
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            log::warn!("websocket read error: {e}");
                            break;
                        }
                    }
                }
            }
        }
        on_close(client).await;
    });
}

fn encode_outbound<S: AppSchema>(raw: Vec<u8>) -> Message {
    match S::Wire::schema_type() {
        SchemaType::Text => Message::Text(String::from_utf8_lossy(&raw).into_owned().into()),
        SchemaType::Binary => Message::Binary(raw.into()),
    }
}

async fn on_close<E, S>(client: SessionClient<E, S>)
where
    S: AppSchema,
    E: EventSink<S> + 'static,
{
    client.set_outbound(None);
    client.set_state(ConnectionState::Disconnected);

    if !client.reconnect.enabled {
        return;
    }
    let Some(attempt) = client.bump_reconnect_attempt() else {
        return;
    };
    if attempt > client.reconnect.max_attempts {
        log::warn!("reconnect attempts exhausted");
        return;
    }
    let Some(url) = client.url() else {
        return;
    };

    tokio::time::sleep(Duration::from_millis(client.reconnect.delay_ms)).await;
    if let Err(err) = connect(&client, &url).await {
        log::error!("reconnect attempt {attempt} failed: {err}");
    }
}
