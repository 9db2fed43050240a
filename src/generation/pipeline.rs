use std::{
    collections::BTreeMap,
    sync::Arc,
    time::Duration,
};

use thiserror::Error;

use super::{
    backend::{
        generate_with_timeout,
        GenerationBackend,
    },
    merger::merge,
    prompt::card_prompt,
    validator::CardAttempt,
};
use crate::core::{
    Card,
    CardField,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("could not generate a complete card; missing: {}", field_list(.field_errors))]
    Exhausted { field_errors: BTreeMap<CardField, String> },
}

fn field_list(field_errors: &BTreeMap<CardField, String>) -> String {
    field_errors.keys().map(CardField::as_str).collect::<Vec<_>>().join(", ")
}

/// Bounded-retry driver around the generation backend.
pub struct CardGenerator {
    backend: Arc<dyn GenerationBackend>,
    max_attempts: u32,
    attempt_timeout: Duration,
}

impl CardGenerator {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        max_attempts: u32,
        attempt_timeout: Duration,
    ) -> Self {
        Self { backend, max_attempts: max_attempts.max(1), attempt_timeout }
    }

    pub async fn generate(&self, word: &str) -> Result<Card, GenerationError> {
        let prompt = card_prompt(word);
        let mut pool: Vec<CardAttempt> = Vec::with_capacity(self.max_attempts as usize);

        for attempt_no in 1..=self.max_attempts {
            let attempt =
                match generate_with_timeout(self.backend.as_ref(), &prompt, self.attempt_timeout)
                    .await
                {
                    Ok(raw) => CardAttempt::from_response(word, &raw),
                    Err(e) => {
                        log::warn!(
                            "Generation attempt {}/{} for '{}' failed: {}",
                            attempt_no,
                            self.max_attempts,
                            word,
                            e
                        );
                        CardAttempt::failed(&e.to_string())
                    }
                };

            if attempt.is_valid() {
                log::info!("Generated card for '{}' on attempt {}", word, attempt_no);
                return merge(word, std::slice::from_ref(&attempt))
                    .map_err(|e| GenerationError::Exhausted { field_errors: e.field_errors });
            }

            log::debug!(
                "Attempt {}/{} for '{}' invalid fields: {:?}",
                attempt_no,
                self.max_attempts,
                word,
                attempt.verdicts.invalid_fields()
            );
            pool.push(attempt);

            // Stop early once the pool already covers every field
            if merge(word, &pool).is_ok() {
                break;
            }
        }

        match merge(word, &pool) {
            Ok(card) => {
                log::info!("Merged card for '{}' from {} attempts", word, pool.len());
                Ok(card)
            }
            Err(e) => {
                log::warn!("Generation for '{}' exhausted: {}", word, e);
                Err(GenerationError::Exhausted { field_errors: e.field_errors })
            }
        }
    }
}
