use std::{
    net::SocketAddr,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};

use tokio::net::TcpListener;

use super::{
    connection::handle_connection,
    types::{
        ConnectedClient,
        ServerState,
    },
};
use crate::{
    bot::BotHandler,
    core::errors::BotError,
};

/// WebSocket endpoint the messaging transport connects to.
#[derive(Clone)]
pub struct WebSocketServer {
    handler: Arc<BotHandler>,
    connected_clients: Arc<Mutex<Vec<ConnectedClient>>>,
    state: Arc<Mutex<ServerState>>,
}

impl WebSocketServer {
    pub fn new(handler: Arc<BotHandler>) -> Self {
        Self {
            handler,
            connected_clients: Arc::new(Mutex::new(Vec::new())),
            state: Arc::new(Mutex::new(ServerState::default())),
        }
    }

    fn state_lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> ServerState {
        self.state_lock().clone()
    }

    pub fn client_count(&self) -> usize {
        let mut clients = self.connected_clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.retain(ConnectedClient::is_valid);
        clients.len()
    }

    pub async fn bind(addr: &str) -> Result<TcpListener, BotError> {
        let addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| BotError::Config(format!("invalid listen address '{}': {}", addr, e)))?;
        TcpListener::bind(&addr)
            .await
            .map_err(|e| BotError::Custom(format!("Failed to bind to address {}: {}", addr, e)))
    }

    /// Accepts connections until the listener fails. Each connection gets its own task.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), BotError> {
        *self.state_lock() = ServerState::Starting;
        let local_addr = listener.local_addr()?;
        log::info!("WebSocket server running on ws://{}", local_addr);
        *self.state_lock() = ServerState::Running;

        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    log::error!("Failed to accept connection: {}", e);
                    *self.state_lock() = ServerState::Error(e.to_string());
                    return Err(e.into());
                }
            };
            log::info!("New connection from: {}", addr);

            let handler = self.handler.clone();
            let clients = self.connected_clients.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, handler, clients).await {
                    log::error!("Error handling connection from {}: {}", addr, e);
                }
            });
        }
    }

    pub fn mark_stopped(&self) {
        *self.state_lock() = ServerState::Stopped;
    }
}
