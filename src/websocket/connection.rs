use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

use futures_util::{
    SinkExt,
    StreamExt,
};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use uuid::Uuid;

use super::types::{
    ConnectedClient,
    Frame,
    OutboundMessage,
};
use crate::{
    bot::BotHandler,
    core::{
        errors::BotError,
        Identity,
    },
};

/// How long a closed connection waits for in-flight replies before giving up on them.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

fn unregister(clients: &Mutex<Vec<ConnectedClient>>, client_id: Uuid, addr: SocketAddr) {
    let mut clients_lock = clients.lock().unwrap_or_else(|e| e.into_inner());
    clients_lock.retain(|client| client.id != client_id && client.is_valid());
    log::info!("[WS] Client {} removed. Total clients remaining: {}", addr, clients_lock.len());
}

/// Messages of one identity are handled one after another by a dedicated worker, so
/// their replies keep their order. Different identities run side by side.
fn spawn_identity_worker(
    identity: Identity,
    handler: Arc<BotHandler>,
    frames: mpsc::Sender<String>,
) -> mpsc::Sender<String> {
    let (inbox_tx, mut inbox_rx) = mpsc::channel::<String>(32);
    let (reply_tx, mut reply_rx) = mpsc::channel::<String>(32);

    let reply_identity = identity.clone();
    tokio::spawn(async move {
        while let Some(text) = reply_rx.recv().await {
            let frame = OutboundMessage::new(&reply_identity, text);
            match serde_json::to_string(&frame) {
                Ok(json) => {
                    if frames.send(json).await.is_err() {
                        break;
                    }
                }
                Err(e) => log::error!("Failed to encode reply for {}: {}", reply_identity, e),
            }
        }
    });

    tokio::spawn(async move {
        while let Some(text) = inbox_rx.recv().await {
            if let Err(e) = handler.handle(&identity, &text, &reply_tx).await {
                log::error!("Failed to handle message from {}: {}", identity, e);
            }
        }
        log::debug!("Worker for {} finished", identity);
    });

    inbox_tx
}

pub async fn handle_connection(
    stream: tokio::net::TcpStream,
    addr: SocketAddr,
    handler: Arc<BotHandler>,
    clients: Arc<Mutex<Vec<ConnectedClient>>>,
) -> Result<(), BotError> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    log::info!("[WS] Connection established with {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<String>(32);
    let client_id = Uuid::new_v4();

    {
        let mut clients_lock = clients.lock().unwrap_or_else(|e| e.into_inner());
        clients_lock.push(ConnectedClient { id: client_id, tx: tx.clone() });
        log::info!("[WS] Client registered. Total clients: {}", clients_lock.len());
    }

    let mut forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(Message::text(msg)).await.is_err() {
                break;
            }
        }
    });

    let mut workers: HashMap<Identity, mpsc::Sender<String>> = HashMap::new();

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match Frame::parse(text.as_str()) {
                Frame::Ping => {
                    log::debug!("[WS] PING from {}", addr);
                    if tx.send("PONG".to_string()).await.is_err() {
                        break;
                    }
                }
                Frame::Message(message) => {
                    let worker = workers.entry(message.identity.clone()).or_insert_with(|| {
                        spawn_identity_worker(message.identity.clone(), handler.clone(), tx.clone())
                    });
                    if worker.send(message.text).await.is_err() {
                        log::warn!("[WS] Worker for {} is gone", message.identity);
                        workers.remove(&message.identity);
                    }
                }
                Frame::Invalid(reason) => {
                    log::warn!("[WS] Ignoring invalid frame from {}: {}", addr, reason);
                }
            },
            Ok(Message::Close(_)) => {
                log::info!("[WS] Client {} disconnected", addr);
                break;
            }
            Err(e) => {
                log::error!("[WS] Error from client {}: {}", addr, e);
                break;
            }
            _ => {}
        }
    }

    // The registry holds a sender too; the forwarder only ends once every sender is gone
    unregister(&clients, client_id, addr);
    drop(workers);
    drop(tx);
    match tokio::time::timeout(FLUSH_TIMEOUT, &mut forward_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("[WS] Forwarding task for {} ended abnormally: {}", addr, e),
        Err(_) => {
            log::warn!("[WS] Dropping unsent replies for {} after {:?}", addr, FLUSH_TIMEOUT);
            forward_task.abort();
        }
    }

    Ok(())
}
