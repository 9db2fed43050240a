use std::time::Duration;

use tokio::time::Instant;

use crate::{
    core::Identity,
    spelling::WordRejection,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingSpellConfirm {
        original: String,
        suggestion: String,
    },
    AwaitingRevokeConfirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpellReply {
    Yes,
    No,
    Cancel,
}

impl SpellReply {
    /// Exact keywords only, after trimming and lower-casing.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "yes" | "y" => Some(SpellReply::Yes),
            "no" | "n" => Some(SpellReply::No),
            "cancel" | "c" => Some(SpellReply::Cancel),
            _ => None,
        }
    }
}

/// A message after the router has classified it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A screened word, with the spell checker's suggestion if it had one.
    Word { text: String, suggestion: Option<String> },
    Rejected(WordRejection),
    Revoke,
    ConfirmRevoke,
    /// Any other command. The router answers it itself when the session lets it through.
    Command,
    /// Free text that was not spell checked.
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordOrigin {
    Direct,
    Suggested,
    Original,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Generate { word: String, origin: WordOrigin },
    PromptSpelling { original: String, suggestion: String },
    RepromptSpelling { original: String, suggestion: String },
    CancelSpelling { original: String },
    RejectWord(WordRejection),
    RequestRevokeConfirm,
    RevokeAccess,
    RevokeLapsed,
    NoRevokePending,
    Passthrough,
}

/// Every (phase, input) pair has exactly one outcome.
pub fn transition(phase: &Phase, input: Input) -> (Phase, Effect) {
    match (phase, input) {
        (Phase::Idle, Input::Word { text, suggestion: Some(suggestion) }) => (
            Phase::AwaitingSpellConfirm { original: text.clone(), suggestion: suggestion.clone() },
            Effect::PromptSpelling { original: text, suggestion },
        ),
        (Phase::Idle, Input::Word { text, suggestion: None }) => {
            (Phase::Idle, Effect::Generate { word: text, origin: WordOrigin::Direct })
        }
        (Phase::Idle, Input::Rejected(reason)) => (Phase::Idle, Effect::RejectWord(reason)),
        (Phase::Idle, Input::Revoke) => (Phase::AwaitingRevokeConfirm, Effect::RequestRevokeConfirm),
        (Phase::Idle, Input::ConfirmRevoke) => (Phase::Idle, Effect::NoRevokePending),
        (Phase::Idle, Input::Command | Input::Text(_)) => (Phase::Idle, Effect::Passthrough),

        (Phase::AwaitingSpellConfirm { original, suggestion }, input) => {
            let reply = match &input {
                Input::Text(text) => SpellReply::parse(text),
                _ => None,
            };
            match reply {
                Some(SpellReply::Yes) => (
                    Phase::Idle,
                    Effect::Generate { word: suggestion.clone(), origin: WordOrigin::Suggested },
                ),
                Some(SpellReply::No) => (
                    Phase::Idle,
                    Effect::Generate { word: original.clone(), origin: WordOrigin::Original },
                ),
                Some(SpellReply::Cancel) => {
                    (Phase::Idle, Effect::CancelSpelling { original: original.clone() })
                }
                None => (
                    phase.clone(),
                    Effect::RepromptSpelling {
                        original: original.clone(),
                        suggestion: suggestion.clone(),
                    },
                ),
            }
        }

        (Phase::AwaitingRevokeConfirm, Input::ConfirmRevoke) => (Phase::Idle, Effect::RevokeAccess),
        (Phase::AwaitingRevokeConfirm, _) => (Phase::Idle, Effect::RevokeLapsed),
    }
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub identity: Identity,
    pub phase: Phase,
    pub created_at: Instant,
    pub last_activity: Instant,
}

impl SessionState {
    pub fn new(identity: Identity, now: Instant) -> Self {
        Self { identity, phase: Phase::Idle, created_at: now, last_activity: now }
    }

    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_activity) > timeout
    }

    /// Resets to idle when the session sat unused longer than `timeout`, then marks it
    /// active. Returns whether a reset happened.
    pub fn refresh(&mut self, now: Instant, timeout: Duration) -> bool {
        let expired = self.is_expired(now, timeout) && self.phase != Phase::Idle;
        if expired {
            log::info!("Session for {} expired in {:?}", self.identity, self.phase);
            self.phase = Phase::Idle;
        }
        self.last_activity = now;
        expired
    }

    pub fn apply(&mut self, input: Input) -> Effect {
        let (next, effect) = transition(&self.phase, input);
        if next != self.phase {
            log::debug!("Session {}: {:?} -> {:?}", self.identity, self.phase, next);
        }
        self.phase = next;
        effect
    }
}
