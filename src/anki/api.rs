use std::{
    collections::HashMap,
    future::Future,
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};
use tokio::{
    sync::Mutex,
    time::Instant,
};

use super::{
    render::render_back,
    DeckStats,
    FlashcardStore,
    StoreError,
};
use crate::core::{
    BotError,
    Card,
};

const ANKI_CONNECT_VERSION: u32 = 6;
const LAUNCH_WAIT_SECS: u64 = 15;
/// After a launch attempt, further calls only check liveness for this long.
const LAUNCH_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<Option<T>, StoreError> {
        match self.error {
            Some(error) if error.to_lowercase().contains("duplicate") => {
                Err(StoreError::Duplicate(error))
            }
            Some(error) => Err(StoreError::Api(error)),
            None => Ok(self.result),
        }
    }
}

/// Search query matching `word` on the front side within `deck`.
pub fn word_query(deck: &str, word: &str) -> String {
    format!("deck:\"{}\" Front:\"{}\"", escape_query(deck), escape_query(word))
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// AnkiConnect client. Every call is bounded by `timeout`.
pub struct AnkiConnect {
    client: Client,
    url: String,
    deck_name: String,
    model_name: String,
    launch_command: Option<String>,
    timeout: Duration,
    last_launch: Mutex<Option<Instant>>,
}

impl AnkiConnect {
    pub fn new(
        url: &str,
        deck_name: &str,
        model_name: &str,
        launch_command: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BotError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            deck_name: deck_name.to_string(),
            model_name: model_name.to_string(),
            launch_command,
            timeout,
            last_launch: Mutex::new(None),
        })
    }

    async fn make_request<T: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        params: Option<serde_json::Value>,
    ) -> Result<Option<T>, StoreError> {
        let mut body = serde_json::Map::new();
        body.insert("action".to_string(), serde_json::Value::String(action.to_string()));
        body.insert("version".to_string(), serde_json::Value::Number(ANKI_CONNECT_VERSION.into()));
        if let Some(params) = params {
            body.insert("params".to_string(), params);
        }

        let request = async {
            let response = self
                .client
                .post(&self.url)
                .json(&body)
                .send()
                .await
                .map_err(|e| StoreError::Request(e.to_string()))?
                .error_for_status()
                .map_err(|e| StoreError::Request(e.to_string()))?;
            response.json::<ApiResponse<T>>().await.map_err(|e| StoreError::Request(e.to_string()))
        };

        let response = bounded(self.timeout, request).await?;
        response.into_result().inspect_err(|e| log::error!("AnkiConnect {} failed: {}", action, e))
    }

    async fn launch(&self, command: &str) -> bool {
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return false;
        };

        log::info!("Starting Anki with '{}'", command);
        let spawned = tokio::process::Command::new(program)
            .args(parts)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn();
        if let Err(e) = spawned {
            log::error!("Failed to start Anki: {}", e);
            return false;
        }

        for second in 1..=LAUNCH_WAIT_SECS {
            tokio::time::sleep(Duration::from_secs(1)).await;
            if self.is_running().await {
                log::info!("Anki started after {} seconds", second);
                return true;
            }
        }

        log::error!("Anki did not start within {} seconds", LAUNCH_WAIT_SECS);
        false
    }
}

async fn bounded<T>(
    limit: Duration,
    request: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, request).await.map_err(|_| StoreError::Timeout(limit))?
}

#[derive(Debug, Deserialize)]
struct RawDeckStats {
    #[serde(default)]
    name: String,
    #[serde(default)]
    new_count: u64,
    #[serde(default)]
    learn_count: u64,
    #[serde(default)]
    review_count: u64,
    #[serde(default)]
    total_in_deck: u64,
}

#[async_trait]
impl FlashcardStore for AnkiConnect {
    async fn is_running(&self) -> bool {
        match self.make_request::<u32>("version", None).await {
            Ok(version) => version.is_some(),
            Err(e) => {
                log::debug!("Anki not reachable: {}", e);
                false
            }
        }
    }

    /// Launches Anki at most once per cooldown. Callers arriving while a launch is in
    /// flight wait for it instead of starting another.
    async fn ensure_running(&self) -> bool {
        if self.is_running().await {
            return true;
        }
        let Some(command) = &self.launch_command else {
            return false;
        };

        let mut last_launch = self.last_launch.lock().await;
        if self.is_running().await {
            return true;
        }
        if let Some(at) = *last_launch {
            if at.elapsed() < LAUNCH_COOLDOWN {
                log::debug!("Anki launch attempted {:?} ago; not retrying yet", at.elapsed());
                return false;
            }
        }
        *last_launch = Some(Instant::now());
        self.launch(command).await
    }

    async fn exists(&self, word: &str) -> Result<bool, StoreError> {
        let params = serde_json::json!({ "query": word_query(&self.deck_name, word) });
        let notes: Vec<u64> = self.make_request("findNotes", Some(params)).await?.unwrap_or_default();
        log::info!("'{}' exists in '{}': {}", word, self.deck_name, !notes.is_empty());
        Ok(!notes.is_empty())
    }

    async fn add(&self, card: &Card) -> Result<u64, StoreError> {
        let params = serde_json::json!({
            "note": {
                "deckName": self.deck_name,
                "modelName": self.model_name,
                "fields": {
                    "Front": card.word,
                    "Back": render_back(card),
                },
                "options": {
                    "allowDuplicate": false,
                    "duplicateScope": "deck",
                },
            }
        });

        let note_id = self
            .make_request::<u64>("addNote", Some(params))
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => StoreError::Duplicate(card.word.clone()),
                other => other,
            })?
            .ok_or_else(|| StoreError::Api("addNote returned no note id".to_string()))?;

        log::info!("Added card for '{}' as note {}", card.word, note_id);
        Ok(note_id)
    }

    async fn sync(&self) -> Result<(), StoreError> {
        log::info!("Triggering Anki sync");
        self.make_request::<serde_json::Value>("sync", None).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<DeckStats, StoreError> {
        let params = serde_json::json!({ "decks": [self.deck_name] });
        let stats: HashMap<String, RawDeckStats> =
            self.make_request("getDeckStats", Some(params)).await?.unwrap_or_default();

        let raw = stats
            .into_values()
            .find(|s| s.name == self.deck_name)
            .ok_or_else(|| StoreError::Api(format!("deck '{}' not found", self.deck_name)))?;

        Ok(DeckStats {
            name: raw.name,
            new_count: raw.new_count,
            learn_count: raw.learn_count,
            review_count: raw.review_count,
            total_in_deck: raw.total_in_deck,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_query_is_quoted() {
        assert_eq!(word_query("English", "receive"), "deck:\"English\" Front:\"receive\"");
        assert_eq!(word_query("My \"Deck\"", "it's"), "deck:\"My \\\"Deck\\\"\" Front:\"it's\"");
    }

    #[test]
    fn test_duplicate_error_is_recognised() {
        let response: ApiResponse<u64> = serde_json::from_str(
            r#"{"result": null, "error": "cannot create note because it is a duplicate"}"#,
        )
        .unwrap();
        assert!(matches!(response.into_result(), Err(StoreError::Duplicate(_))));

        let response: ApiResponse<u64> =
            serde_json::from_str(r#"{"result": null, "error": "model was not found"}"#).unwrap();
        assert_eq!(response.into_result(), Err(StoreError::Api("model was not found".into())));

        let response: ApiResponse<u64> =
            serde_json::from_str(r#"{"result": 1496198395707, "error": null}"#).unwrap();
        assert_eq!(response.into_result(), Ok(Some(1496198395707)));
    }

    #[test]
    fn test_deck_stats_shape() {
        let raw: HashMap<String, RawDeckStats> = serde_json::from_str(
            r#"{"1651445861967": {"deck_id": 1651445861967, "name": "English",
                "new_count": 20, "learn_count": 0, "review_count": 3, "total_in_deck": 1501}}"#,
        )
        .unwrap();
        let stats = raw.into_values().next().unwrap();
        assert_eq!(stats.name, "English");
        assert_eq!(stats.total_in_deck, 1501);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_request_times_out() {
        let result: Result<(), StoreError> = bounded(Duration::from_secs(30), async {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(StoreError::Timeout(Duration::from_secs(30))));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_not_running() {
        let store = AnkiConnect::new(
            "http://127.0.0.1:9/",
            "English",
            "Basic",
            None,
            Duration::from_secs(2),
        )
        .unwrap();
        assert!(!store.is_running().await);
        assert!(!store.ensure_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_launch_is_not_repeated_within_cooldown() {
        let store = AnkiConnect::new(
            "http://127.0.0.1:9/",
            "English",
            "Basic",
            Some("true".to_string()),
            Duration::from_secs(2),
        )
        .unwrap();
        let launch_wait = Duration::from_secs(LAUNCH_WAIT_SECS);

        let started = Instant::now();
        assert!(!store.ensure_running().await);
        assert!(started.elapsed() >= launch_wait);

        let started = Instant::now();
        assert!(!store.ensure_running().await);
        assert!(started.elapsed() < launch_wait);

        tokio::time::advance(LAUNCH_COOLDOWN).await;
        let started = Instant::now();
        assert!(!store.ensure_running().await);
        assert!(started.elapsed() >= launch_wait);
    }
}
