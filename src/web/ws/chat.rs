//! Chat WebSocket handler.
//!
//! Each upgraded socket is one hub client: the first text frame joins, every
//! later text frame is decoded like a line, and a writer task forwards the
//! client's mailbox as text frames.

use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

use crate::chat::{parse_client_input, ChatEvent, ClientHandle, ClientInput, HubHandle, Mailbox};
use crate::RoomcastError;

use super::messages::{JoinRequest, INVALID_JOIN_MESSAGE};

/// WebSocket chat handler.
///
/// GET /ws
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(hub): State<HubHandle>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let peer = connect_info
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    ws.on_upgrade(move |socket| handle_socket(socket, hub, peer))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, hub: HubHandle, peer: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let request = match ws_receiver.next().await {
        Some(Ok(Message::Text(text))) => JoinRequest::parse(&text),
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
        Some(Ok(_)) => None,
    };
    let Some(request) = request else {
        reject(&mut ws_sender, INVALID_JOIN_MESSAGE).await;
        return;
    };

    let name = request.name_or(&peer);
    let (client, mailbox) = match hub.join(&name, request.code()) {
        Ok(joined) => joined,
        Err(RoomcastError::JoinRejected(rejection)) => {
            tracing::info!("Rejected {} from {}: {}", name, peer, rejection);
            reject(&mut ws_sender, &rejection.to_string()).await;
            return;
        }
        Err(e) => {
            tracing::warn!("Join from {} failed: {}", peer, e);
            return;
        }
    };
    tracing::info!(
        "WebSocket {} connected from {} as {}",
        client.name(),
        peer,
        client.id()
    );

    let writer = tokio::spawn(write_loop(ws_sender, mailbox));

    if hub
        .send(ChatEvent::joined(client.room(), client.name()))
        .is_ok()
    {
        read_loop(&mut ws_receiver, &hub, &client).await;
    }

    tracing::info!("WebSocket {} disconnected from {}", client.name(), peer);
    let _ = hub.send(ChatEvent::left(client.room(), client.name()));
    let _ = hub.leave(client);
    if let Err(e) = writer.await {
        tracing::warn!("Writer task for {} failed: {}", peer, e);
    }
}

async fn read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    hub: &HubHandle,
    client: &ClientHandle,
) {
    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match parse_client_input(&text) {
                ClientInput::Empty | ClientInput::Ignored => {}
                ClientInput::Quit => break,
                ClientInput::Payload(payload) => {
                    if hub.submit(client, payload).is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => {
                tracing::debug!("WebSocket closed by client: {}", client.id());
                break;
            }
            // Pings are answered by the protocol layer
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("WebSocket error: {}", e);
                break;
            }
        }
    }
}

/// Forward mailbox payloads as text frames, then close the socket.
async fn write_loop(mut ws_sender: SplitSink<WebSocket, Message>, mut mailbox: Mailbox) {
    while let Some(payload) = mailbox.recv().await {
        if ws_sender
            .send(Message::Text(payload.to_string()))
            .await
            .is_err()
        {
            break;
        }
    }
    let _ = ws_sender.close().await;
}

async fn reject(ws_sender: &mut SplitSink<WebSocket, Message>, text: &str) {
    let _ = ws_sender.send(Message::Text(text.to_string())).await;
    let _ = ws_sender.close().await;
}
