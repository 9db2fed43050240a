use thiserror::Error;
use tokio::sync::mpsc::error::SendError;
use tokio_tungstenite::tungstenite;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("WebSocket send error: {0}")]
    WebSocketSend(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to load file: {0}")]
    FailedToLoadFile(String),

    #[error("BotError: {0}")]
    Custom(String),
}

impl<T> From<SendError<T>> for BotError {
    fn from(error: SendError<T>) -> Self {
        BotError::WebSocketSend(error.to_string())
    }
}

impl From<std::io::Error> for BotError {
    fn from(error: std::io::Error) -> Self {
        BotError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for BotError {
    fn from(error: reqwest::Error) -> Self {
        BotError::Reqwest(Box::new(error))
    }
}

impl From<tungstenite::Error> for BotError {
    fn from(error: tungstenite::Error) -> Self {
        BotError::WebSocket(Box::new(error))
    }
}
