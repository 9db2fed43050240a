use serde::{
    Deserialize,
    Serialize,
};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::Identity;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ServerState {
    Running,
    #[default]
    Stopped,
    Error(String),
    Starting,
}

/// `{"identity": "...", "text": "..."}` sent by the messaging transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    pub identity: Identity,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub identity: Identity,
    pub text: String,
    #[serde(rename = "messageId")]
    pub message_id: String,
}

impl OutboundMessage {
    pub fn new(identity: &Identity, text: String) -> Self {
        Self { identity: identity.clone(), text, message_id: Uuid::new_v4().to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Ping,
    Message(InboundMessage),
    Invalid(String),
}

impl Frame {
    pub fn parse(text: &str) -> Self {
        if text.trim() == "PING" {
            return Frame::Ping;
        }
        match serde_json::from_str::<InboundMessage>(text) {
            Ok(message) if message.identity.as_str().is_empty() => {
                Frame::Invalid("empty identity".to_string())
            }
            Ok(message) => Frame::Message(message),
            Err(e) => Frame::Invalid(e.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ConnectedClient {
    pub id: Uuid,
    pub tx: mpsc::Sender<String>,
}

impl ConnectedClient {
    pub fn is_valid(&self) -> bool {
        !self.tx.is_closed()
    }
}
