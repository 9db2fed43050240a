use std::time::Duration;

use async_trait::async_trait;
use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::core::Card;

pub mod api;
pub mod render;

pub use api::AnkiConnect;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("'{0}' is already in the deck")]
    Duplicate(String),

    #[error("flashcard store timed out after {0:?}")]
    Timeout(Duration),

    #[error("flashcard store request failed: {0}")]
    Request(String),

    #[error("flashcard store error: {0}")]
    Api(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckStats {
    pub name: String,
    pub new_count: u64,
    pub learn_count: u64,
    pub review_count: u64,
    pub total_in_deck: u64,
}

/// The external flashcard collection cards are handed to.
#[async_trait]
pub trait FlashcardStore: Send + Sync {
    async fn is_running(&self) -> bool;

    /// Brings the store up if it can. Stores that cannot be launched just report liveness.
    async fn ensure_running(&self) -> bool {
        self.is_running().await
    }

    async fn exists(&self, word: &str) -> Result<bool, StoreError>;

    async fn add(&self, card: &Card) -> Result<u64, StoreError>;

    async fn sync(&self) -> Result<(), StoreError>;

    async fn stats(&self) -> Result<DeckStats, StoreError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Mutex,
    };

    use super::*;

    /// In-memory deck. Words are compared case-insensitively like Anki's search.
    #[derive(Default)]
    pub struct MemoryStore {
        pub cards: Mutex<Vec<Card>>,
        pub fail_sync: bool,
        pub syncs: AtomicUsize,
    }

    impl MemoryStore {
        pub fn with_words(words: &[&str]) -> Self {
            let store = Self::default();
            for word in words {
                store.cards.lock().unwrap().push(Card {
                    word: word.to_string(),
                    translations: Vec::new(),
                    ipa: crate::core::Ipa { british: String::new(), american: String::new() },
                    explanations: crate::core::Explanations {
                        english: String::new(),
                        ukrainian: String::new(),
                    },
                    examples: Vec::new(),
                });
            }
            store
        }

        pub fn words(&self) -> Vec<String> {
            self.cards.lock().unwrap().iter().map(|c| c.word.clone()).collect()
        }

        pub fn sync_count(&self) -> usize {
            self.syncs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FlashcardStore for MemoryStore {
        async fn is_running(&self) -> bool {
            true
        }

        async fn exists(&self, word: &str) -> Result<bool, StoreError> {
            Ok(self.cards.lock().unwrap().iter().any(|c| c.word.eq_ignore_ascii_case(word)))
        }

        async fn add(&self, card: &Card) -> Result<u64, StoreError> {
            if self.exists(&card.word).await? {
                return Err(StoreError::Duplicate(card.word.clone()));
            }
            let mut cards = self.cards.lock().unwrap();
            cards.push(card.clone());
            Ok(cards.len() as u64)
        }

        async fn sync(&self) -> Result<(), StoreError> {
            self.syncs.fetch_add(1, Ordering::SeqCst);
            if self.fail_sync {
                return Err(StoreError::Request("sync server unreachable".to_string()));
            }
            Ok(())
        }

        async fn stats(&self) -> Result<DeckStats, StoreError> {
            let total = self.cards.lock().unwrap().len() as u64;
            Ok(DeckStats {
                name: "Test".to_string(),
                new_count: total,
                total_in_deck: total,
                ..DeckStats::default()
            })
        }
    }
}
