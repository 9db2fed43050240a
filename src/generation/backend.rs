use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::core::BotError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("generation backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation request failed: {0}")]
    Request(String),

    #[error("generation backend returned an error: {0}")]
    Backend(String),
}

/// Free-form text generator. No structure is expected from the output.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Runs one backend call under `limit`. Elapsed time becomes `BackendError::Timeout`.
pub async fn generate_with_timeout(
    backend: &dyn GenerationBackend,
    prompt: &str,
    limit: Duration,
) -> Result<String, BackendError> {
    match tokio::time::timeout(limit, backend.generate(prompt)).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(limit)),
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct OllamaBackend {
    client: Client,
    url: String,
    model: String,
    timeout: Duration,
}

impl OllamaBackend {
    pub fn new(url: &str, model: &str, timeout: Duration) -> Result<Self, BotError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Custom(format!("HTTP client build failed: {e}")))?;

        Ok(Self { client, url: url.to_string(), model: model.to_string(), timeout })
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let body = GenerateRequest { model: &self.model, prompt, stream: false };

        let response = self.client.post(&self.url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.timeout)
            } else {
                BackendError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        let parsed: GenerateResponse =
            response.json().await.map_err(|e| BackendError::Request(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(BackendError::Backend(error));
        }
        if !status.is_success() {
            return Err(BackendError::Backend(format!("HTTP {status}")));
        }

        parsed
            .response
            .map(|text| text.trim().to_string())
            .ok_or_else(|| BackendError::Backend("response field missing".to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{
                AtomicUsize,
                Ordering,
            },
            Mutex,
        },
    };

    use super::*;

    pub enum Scripted {
        Reply(String),
        Fail(BackendError),
        Hang,
    }

    /// Backend that replays a fixed script and counts calls. Repeats the last entry.
    pub struct ScriptedBackend {
        script: Mutex<VecDeque<Scripted>>,
        last: Mutex<Option<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        pub fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn replies(replies: &[&str]) -> Self {
            Self::new(replies.iter().map(|r| Scripted::Reply(r.to_string())).collect())
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate(&self, _prompt: &str) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Reply(text)) => {
                    *self.last.lock().unwrap() = Some(text.clone());
                    Ok(text)
                }
                Some(Scripted::Fail(error)) => Err(error),
                Some(Scripted::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(BackendError::Request("unreachable".to_string()))
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .ok_or_else(|| BackendError::Request("script exhausted".to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        testing::*,
        *,
    };

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_reported() {
        let backend = ScriptedBackend::new(vec![Scripted::Hang]);
        let result = generate_with_timeout(&backend, "p", Duration::from_secs(5)).await;
        assert_eq!(result, Err(BackendError::Timeout(Duration::from_secs(5))));
    }

    #[tokio::test]
    async fn test_reply_passes_through() {
        let backend = ScriptedBackend::replies(&["hello"]);
        let result = generate_with_timeout(&backend, "p", Duration::from_secs(5)).await;
        assert_eq!(result.as_deref(), Ok("hello"));
        assert_eq!(backend.calls(), 1);
    }
}
