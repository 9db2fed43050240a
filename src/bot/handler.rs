use std::sync::Arc;

use tokio::sync::mpsc;

use super::{
    commands::Command,
    replies,
};
use crate::{
    access::{
        AccessDecision,
        AccessGuard,
    },
    anki::{
        AnkiConnect,
        FlashcardStore,
        StoreError,
    },
    core::{
        BotError,
        Identity,
        Settings,
    },
    generation::{
        CardGenerator,
        GenerationError,
        OllamaBackend,
    },
    session::{
        Effect,
        Input,
        Phase,
        SessionStore,
        WordOrigin,
    },
    spelling::{
        SpellChecker,
        WordList,
    },
};

/// Routes one incoming message through access control, the identity's session and,
/// when a word is settled on, card generation and the store.
pub struct BotHandler {
    guard: Arc<AccessGuard>,
    sessions: Arc<SessionStore>,
    spell_checker: SpellChecker,
    generator: CardGenerator,
    store: Arc<dyn FlashcardStore>,
}

impl BotHandler {
    pub fn new(
        guard: Arc<AccessGuard>,
        sessions: Arc<SessionStore>,
        spell_checker: SpellChecker,
        generator: CardGenerator,
        store: Arc<dyn FlashcardStore>,
    ) -> Self {
        Self { guard, sessions, spell_checker, generator, store }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, BotError> {
        let backend = Arc::new(OllamaBackend::new(
            &settings.ollama_url,
            &settings.ollama_model,
            settings.generation_timeout(),
        )?);

        let words = WordList::load(settings.dictionary_path.as_deref())?;
        log::info!("Spell checker loaded {} words", words.len());
        let mut spell_checker = SpellChecker::new(words);
        if settings.spell_check_backend_fallback {
            spell_checker =
                spell_checker.with_backend_fallback(backend.clone(), settings.spell_check_timeout());
        }

        let generator = CardGenerator::new(
            backend,
            settings.max_generation_attempts,
            settings.generation_timeout(),
        );

        let store = Arc::new(AnkiConnect::new(
            &settings.anki_url,
            &settings.anki_deck_name,
            &settings.anki_model_name,
            settings.anki_launch_command.clone(),
            settings.sync_timeout(),
        )?);

        let guard = Arc::new(AccessGuard::new(
            settings.auth_code.clone(),
            settings.max_auth_attempts,
            settings.preseeded_identity(),
        ));
        let sessions = Arc::new(SessionStore::new(settings.session_timeout()));

        Ok(Self::new(guard, sessions, spell_checker, generator, store))
    }

    pub fn guard(&self) -> &Arc<AccessGuard> {
        &self.guard
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub async fn handle(
        &self,
        identity: &Identity,
        text: &str,
        outbox: &mpsc::Sender<String>,
    ) -> Result<(), BotError> {
        let command = Command::parse(text);

        let was_authorized = self.guard.is_authorized(identity);
        if self.guard.authorize(identity, command.auth_code(), text) == AccessDecision::Deny {
            outbox.send(replies::DENIED.to_string()).await?;
            if self.guard.authorized_identity().is_none() {
                outbox.send(replies::SETUP_HINT.to_string()).await?;
            }
            return Ok(());
        }
        if !was_authorized {
            outbox.send(replies::authenticated(identity.as_str())).await?;
        }

        let mut session = self.sessions.lock(identity).await;

        let input = match &command {
            Command::Revoke => Input::Revoke,
            Command::ConfirmRevoke => Input::ConfirmRevoke,
            Command::Text(text) if session.phase == Phase::Idle => {
                let check = self.spell_checker.check(text).await;
                match check.rejection {
                    Some(reason) => Input::Rejected(reason),
                    None => Input::Word {
                        text: check.word.normalized,
                        suggestion: check.word.suggestion,
                    },
                }
            }
            Command::Text(text) => Input::Text(text.clone()),
            _ => Input::Command,
        };

        match session.apply(input) {
            Effect::Generate { word, origin } => {
                match origin {
                    WordOrigin::Suggested => {
                        outbox.send(replies::using_suggestion(&word)).await?;
                    }
                    WordOrigin::Original => {
                        outbox.send(replies::keeping_original(&word)).await?;
                    }
                    WordOrigin::Direct => {}
                }
                self.process_word(&word, outbox).await?;
            }
            Effect::PromptSpelling { original, suggestion } => {
                outbox.send(replies::spelling_prompt(&original, &suggestion)).await?;
            }
            Effect::RepromptSpelling { original, suggestion } => {
                outbox.send(replies::spelling_reprompt(&original, &suggestion)).await?;
            }
            Effect::CancelSpelling { original } => {
                log::info!("{} cancelled '{}'", identity, original);
                outbox.send(replies::CANCELLED.to_string()).await?;
            }
            Effect::RejectWord(reason) => {
                outbox.send(replies::rejected(text.trim(), reason)).await?;
            }
            Effect::RequestRevokeConfirm => {
                outbox.send(replies::REVOKE_CONFIRM.to_string()).await?;
            }
            Effect::RevokeAccess => {
                self.guard.revoke(identity);
                outbox.send(replies::REVOKED.to_string()).await?;
            }
            Effect::RevokeLapsed => {
                outbox.send(replies::REVOKE_LAPSED.to_string()).await?;
            }
            Effect::NoRevokePending => {
                outbox.send(replies::NO_PENDING_REVOKE.to_string()).await?;
            }
            Effect::Passthrough => self.run_command(&command, outbox).await?,
        }

        Ok(())
    }

    async fn run_command(
        &self,
        command: &Command,
        outbox: &mpsc::Sender<String>,
    ) -> Result<(), BotError> {
        match command {
            Command::Start(_) => {
                let reply = if self.store.ensure_running().await {
                    replies::ANKI_READY
                } else {
                    replies::ANKI_DOWN
                };
                outbox.send(reply.to_string()).await?;
            }
            Command::Help => outbox.send(replies::HELP.to_string()).await?,
            Command::Sync => {
                if !self.store.ensure_running().await {
                    outbox.send(replies::ANKI_DOWN.to_string()).await?;
                    return Ok(());
                }
                outbox.send(replies::SYNCING.to_string()).await?;
                let reply = match self.store.sync().await {
                    Ok(()) => replies::SYNC_DONE.to_string(),
                    Err(e) => replies::sync_failed(&e.to_string()),
                };
                outbox.send(reply).await?;
            }
            Command::Stats => {
                if !self.store.ensure_running().await {
                    outbox.send(replies::ANKI_DOWN.to_string()).await?;
                    return Ok(());
                }
                let reply = match self.store.stats().await {
                    Ok(stats) => replies::stats(&stats, self.sessions.active_count()),
                    Err(e) => replies::stats_failed(&e.to_string()),
                };
                outbox.send(reply).await?;
            }
            Command::Security => {
                outbox.send(replies::security(&self.guard.status())).await?;
            }
            Command::Unknown(name) => outbox.send(replies::unknown_command(name)).await?,
            Command::Text(_) | Command::Revoke | Command::ConfirmRevoke => {
                log::debug!("Nothing to run for {:?}", command);
            }
        }
        Ok(())
    }

    /// Duplicate check, generation, add and auto-sync for a settled word.
    async fn process_word(
        &self,
        word: &str,
        outbox: &mpsc::Sender<String>,
    ) -> Result<(), BotError> {
        log::info!("Processing word '{}'", word);

        if !self.store.ensure_running().await {
            outbox.send(replies::ANKI_STARTING.to_string()).await?;
            return Ok(());
        }

        match self.store.exists(word).await {
            Ok(true) => {
                log::info!("'{}' already exists, skipping", word);
                outbox.send(replies::duplicate(word)).await?;
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => {
                outbox.send(replies::store_failed(&e.to_string())).await?;
                return Ok(());
            }
        }

        outbox.send(replies::generating(word)).await?;
        let card = match self.generator.generate(word).await {
            Ok(card) => card,
            Err(GenerationError::Exhausted { field_errors }) => {
                outbox.send(replies::exhausted(word, &field_errors)).await?;
                return Ok(());
            }
        };

        match self.store.add(&card).await {
            Ok(_) => outbox.send(replies::added(&card)).await?,
            Err(StoreError::Duplicate(_)) => {
                outbox.send(replies::duplicate(word)).await?;
                return Ok(());
            }
            Err(e) => {
                log::error!("Failed to add card for '{}': {}", word, e);
                outbox.send(replies::store_failed(&e.to_string())).await?;
                return Ok(());
            }
        }

        let reply = match self.store.sync().await {
            Ok(()) => replies::SYNC_DONE,
            Err(e) => {
                log::warn!("Auto-sync after adding '{}' failed: {}", word, e);
                replies::SYNC_FAILED_SAVED
            }
        };
        outbox.send(reply.to_string()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        anki::testing::MemoryStore,
        generation::backend::testing::ScriptedBackend,
    };

    const VALID_RECEIVE: &str = "TRANSLATION: verb — отримувати
IPA_BRITISH: /rɪˈsiːv/
IPA_AMERICAN: /rɪˈsiv/
EXPLANATION_EN: To get something
EXPLANATION_UK: Отримувати щось
EXAMPLE: Did you receive it? | Ти це отримав?";

    const XYLOPHONE_NO_MATCH: &str = "TRANSLATION: noun — ксилофон
IPA_BRITISH: /ˈzaɪləfəʊn/
IPA_AMERICAN: /ˈzaɪləfoʊn/
EXPLANATION_EN: A percussion instrument
EXPLANATION_UK: Ударний музичний інструмент
EXAMPLE: She plays the xylophone. | Вона грає на ксилофоні.";

    struct Harness {
        handler: BotHandler,
        backend: Arc<ScriptedBackend>,
        store: Arc<MemoryStore>,
    }

    impl Harness {
        fn new(replies: &[&str], store: MemoryStore, guard: AccessGuard) -> Self {
            let backend = Arc::new(ScriptedBackend::replies(replies));
            let store = Arc::new(store);
            let handler = BotHandler::new(
                Arc::new(guard),
                Arc::new(SessionStore::new(Duration::from_secs(30 * 60))),
                SpellChecker::new(WordList::embedded()),
                CardGenerator::new(backend.clone(), 4, Duration::from_secs(60)),
                store.clone(),
            );
            Self { handler, backend, store }
        }

        fn for_alice(replies: &[&str]) -> Self {
            Self::new(replies, MemoryStore::default(), alice_guard())
        }

        async fn send(&self, identity: &str, text: &str) -> Vec<String> {
            let (tx, mut rx) = mpsc::channel(64);
            self.handler.handle(&Identity::from(identity), text, &tx).await.unwrap();
            drop(tx);
            let mut out = Vec::new();
            while let Some(reply) = rx.recv().await {
                out.push(reply);
            }
            out
        }

        fn phase(&self, identity: &str) -> Option<Phase> {
            self.handler.sessions().peek(&Identity::from(identity))
        }
    }

    fn alice_guard() -> AccessGuard {
        AccessGuard::new(Some("s3cret".to_string()), 3, Some(Identity::from("alice")))
    }

    #[tokio::test]
    async fn test_misspelled_word_is_confirmed_then_added() {
        let h = Harness::for_alice(&[VALID_RECEIVE]);

        let replies = h.send("alice", "recieve").await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("Did you mean receive"));
        assert_eq!(
            h.phase("alice"),
            Some(Phase::AwaitingSpellConfirm {
                original: "recieve".into(),
                suggestion: "receive".into()
            })
        );
        assert_eq!(h.backend.calls(), 0);

        let replies = h.send("alice", "yes").await;
        assert_eq!(replies[0], replies::using_suggestion("receive"));
        assert!(replies[1].starts_with("🔄 Generating flashcard for 'receive'"));
        assert!(replies[2].starts_with("✅ Added 'receive' to Anki!"));
        assert_eq!(replies[3], replies::SYNC_DONE);

        assert_eq!(h.backend.calls(), 1);
        assert_eq!(h.store.words(), vec!["receive".to_string()]);
        assert_eq!(h.store.sync_count(), 1);
        assert_eq!(h.phase("alice"), Some(Phase::Idle));
    }

    #[tokio::test]
    async fn test_unfixable_word_exhausts_on_examples() {
        let h = Harness::for_alice(&[XYLOPHONE_NO_MATCH]);

        let replies = h.send("alice", "xylophonezzz").await;

        assert_eq!(h.backend.calls(), 4);
        let last = replies.last().unwrap();
        assert!(last.contains("Could not generate a complete card for 'xylophonezzz'"));
        assert!(last.contains("• examples:"));
        assert!(!last.contains("• translations:"));
        assert!(h.store.words().is_empty());
        assert_eq!(h.store.sync_count(), 0);
        assert_eq!(h.phase("alice"), Some(Phase::Idle));
    }

    #[tokio::test]
    async fn test_unclear_spelling_reply_reprompts() {
        let h = Harness::for_alice(&[VALID_RECEIVE]);
        h.send("alice", "recieve").await;

        let replies = h.send("alice", "maybe").await;
        assert_eq!(replies, vec![replies::spelling_reprompt("recieve", "receive")]);
        assert!(matches!(h.phase("alice"), Some(Phase::AwaitingSpellConfirm { .. })));

        let replies = h.send("alice", "/stats").await;
        assert_eq!(replies, vec![replies::spelling_reprompt("recieve", "receive")]);

        let replies = h.send("alice", "c").await;
        assert_eq!(replies, vec![replies::CANCELLED.to_string()]);
        assert_eq!(h.backend.calls(), 0);
        assert!(h.store.words().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_is_caught_before_generation() {
        let h = Harness::new(&[VALID_RECEIVE], MemoryStore::with_words(&["receive"]), alice_guard());

        let replies = h.send("alice", "receive").await;
        assert_eq!(replies, vec![replies::duplicate("receive")]);
        assert_eq!(h.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_strangers_are_denied() {
        let h = Harness::new(
            &[VALID_RECEIVE],
            MemoryStore::default(),
            AccessGuard::new(Some("s3cret".to_string()), 3, None),
        );

        let replies = h.send("bob", "receive").await;
        assert_eq!(replies, vec![replies::DENIED.to_string(), replies::SETUP_HINT.to_string()]);

        let replies = h.send("bob", "/start s3cret").await;
        assert_eq!(replies[0], replies::authenticated("bob"));
        assert_eq!(replies[1], replies::ANKI_READY);

        let replies = h.send("carol", "/start s3cret").await;
        assert_eq!(replies, vec![replies::DENIED.to_string()]);
        assert_eq!(h.phase("carol"), None);
        assert_eq!(h.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_revoke_needs_confirmation() {
        let h = Harness::for_alice(&[VALID_RECEIVE]);

        assert_eq!(h.send("alice", "/revoke").await, vec![replies::REVOKE_CONFIRM.to_string()]);
        assert_eq!(h.send("alice", "receive").await, vec![replies::REVOKE_LAPSED.to_string()]);
        assert!(h.handler.guard().is_authorized(&Identity::from("alice")));
        assert_eq!(h.backend.calls(), 0);

        h.send("alice", "/revoke").await;
        assert_eq!(h.send("alice", "/confirm_revoke").await, vec![replies::REVOKED.to_string()]);
        assert_eq!(h.handler.guard().authorized_identity(), None);

        let replies = h.send("alice", "receive").await;
        assert_eq!(replies, vec![replies::DENIED.to_string(), replies::SETUP_HINT.to_string()]);
    }

    #[tokio::test]
    async fn test_failed_sync_still_reports_saved_card() {
        let store = MemoryStore { fail_sync: true, ..MemoryStore::default() };
        let h = Harness::new(&[VALID_RECEIVE], store, alice_guard());

        let replies = h.send("alice", "receive").await;
        assert_eq!(replies.last().unwrap(), replies::SYNC_FAILED_SAVED);
        assert_eq!(h.store.words(), vec!["receive".to_string()]);
    }

    #[tokio::test]
    async fn test_greeting_and_commands() {
        let h = Harness::for_alice(&[VALID_RECEIVE]);

        assert_eq!(h.send("alice", "hello").await, vec![replies::GREETING.to_string()]);
        assert_eq!(h.send("alice", "/help").await, vec![replies::HELP.to_string()]);
        assert_eq!(h.send("alice", "/confirm_revoke").await, vec![replies::NO_PENDING_REVOKE.to_string()]);

        let stats = h.send("alice", "/stats").await;
        assert!(stats[0].contains("Deck: Test"));
        assert!(stats[0].contains("Active bot sessions: 1"));

        let security = h.send("alice", "/security").await;
        assert!(security[0].contains("Authorized identity: alice"));
    }
}
