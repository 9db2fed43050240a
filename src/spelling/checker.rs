use std::{
    fmt,
    sync::{
        Arc,
        LazyLock,
    },
    time::Duration,
};

use regex::Regex;

use super::dictionary::WordList;
use crate::{
    core::Word,
    generation::{
        backend::generate_with_timeout,
        parser::clean_markdown,
        prompt::spelling_prompt,
        GenerationBackend,
    },
};

pub const MIN_WORD_LENGTH: usize = 2;
pub const MAX_WORD_LENGTH: usize = 30;

const GREETINGS: &[&str] =
    &["hi", "hello", "hey", "bye", "goodbye", "ok", "okay", "yes", "no", "yeah", "nah"];

static WORD_SHAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z'-]+$").unwrap());
static CORRECTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)CORRECTION\s*:\s*([A-Za-z'-]+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordRejection {
    InvalidCharacters,
    TooShort,
    TooLong,
    Greeting,
}

impl fmt::Display for WordRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordRejection::InvalidCharacters => {
                f.write_str("only English letters, hyphens and apostrophes are allowed")
            }
            WordRejection::TooShort => write!(f, "a word needs at least {MIN_WORD_LENGTH} letters"),
            WordRejection::TooLong => write!(f, "a word can have at most {MAX_WORD_LENGTH} letters"),
            WordRejection::Greeting => f.write_str("that looks like a greeting, not a word to learn"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellCheck {
    pub word: Word,
    pub rejection: Option<WordRejection>,
}

/// Screens `text` before any lookup. Single-token input only.
pub fn screen(text: &str) -> Option<WordRejection> {
    let word = text.trim();
    let length = word.chars().count();

    if !WORD_SHAPE.is_match(word) {
        return Some(WordRejection::InvalidCharacters);
    }
    if length < MIN_WORD_LENGTH {
        return Some(WordRejection::TooShort);
    }
    if length > MAX_WORD_LENGTH {
        return Some(WordRejection::TooLong);
    }
    if GREETINGS.contains(&word.to_lowercase().as_str()) {
        return Some(WordRejection::Greeting);
    }
    None
}

/// Keeps a leading capital from the user's input on the suggested word.
fn match_case(original: &str, suggestion: &str) -> String {
    let starts_upper = original.chars().next().is_some_and(char::is_uppercase);
    if !starts_upper {
        return suggestion.to_string();
    }
    let mut chars = suggestion.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Reads a `CORRECT` / `CORRECTION: x` reply. Anything unexpected means no suggestion.
fn parse_backend_reply(reply: &str) -> Option<String> {
    if let Some(captures) = CORRECTION_LINE.captures(&clean_markdown(reply)) {
        return Some(captures[1].to_lowercase());
    }
    None
}

pub struct SpellChecker {
    words: WordList,
    backend: Option<(Arc<dyn GenerationBackend>, Duration)>,
}

impl SpellChecker {
    pub fn new(words: WordList) -> Self {
        Self { words, backend: None }
    }

    /// Asks the backend about words the dictionary has no close match for.
    pub fn with_backend_fallback(
        mut self,
        backend: Arc<dyn GenerationBackend>,
        timeout: Duration,
    ) -> Self {
        self.backend = Some((backend, timeout));
        self
    }

    /// Never fails. A suggestion is only set when it differs from the input.
    pub async fn check(&self, raw: &str) -> SpellCheck {
        let normalized = raw.trim().to_string();
        let rejection = screen(&normalized);
        let mut word = Word { raw: raw.to_string(), normalized, suggestion: None };
        if rejection.is_some() {
            return SpellCheck { word, rejection };
        }

        let lookup = word.normalized.to_lowercase();
        let suggestion = if self.words.knows(&lookup) {
            None
        } else {
            match self.words.closest(&lookup) {
                Some(candidate) => Some(candidate),
                None => self.ask_backend(&lookup).await,
            }
        };

        word.suggestion = suggestion
            .filter(|s| !s.eq_ignore_ascii_case(&lookup))
            .map(|s| match_case(&word.normalized, &s));
        if let Some(suggestion) = &word.suggestion {
            log::debug!("Spelling suggestion for '{}': '{}'", word.normalized, suggestion);
        }

        SpellCheck { word, rejection: None }
    }

    async fn ask_backend(&self, word: &str) -> Option<String> {
        let (backend, timeout) = self.backend.as_ref()?;
        match generate_with_timeout(backend.as_ref(), &spelling_prompt(word), *timeout).await {
            Ok(reply) => parse_backend_reply(&reply),
            Err(e) => {
                log::warn!("Spell check fallback failed for '{}': {}", word, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::backend::testing::*;

    fn checker() -> SpellChecker {
        SpellChecker::new(WordList::embedded())
    }

    #[tokio::test]
    async fn test_misspelling_gets_suggestion() {
        let result = checker().check("  recieve ").await;
        assert_eq!(result.rejection, None);
        assert_eq!(result.word.normalized, "recieve");
        assert_eq!(result.word.suggestion.as_deref(), Some("receive"));
    }

    #[tokio::test]
    async fn test_known_word_has_no_suggestion() {
        let result = checker().check("Necessary").await;
        assert_eq!(result.word.suggestion, None);
        assert_eq!(result.word.normalized, "Necessary");
    }

    #[tokio::test]
    async fn test_everyday_words_are_not_corrected() {
        let checker = checker();
        for word in ["bake", "cake", "kitten", "bold", "Kittens", "baked"] {
            let result = checker.check(word).await;
            assert_eq!(result.word.suggestion, None, "{word} should not be corrected");
        }
    }

    #[tokio::test]
    async fn test_known_misspelling_skips_backend() {
        let backend = Arc::new(ScriptedBackend::replies(&["CORRECTION: runny"]));
        let checker = checker().with_backend_fallback(backend.clone(), Duration::from_secs(20));

        let result = checker.check("Runing").await;
        assert_eq!(result.word.suggestion.as_deref(), Some("Running"));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_suggestion_keeps_capital() {
        let result = checker().check("Recieve").await;
        assert_eq!(result.word.suggestion.as_deref(), Some("Receive"));
    }

    #[tokio::test]
    async fn test_screening() {
        assert_eq!(screen("hello"), Some(WordRejection::Greeting));
        assert_eq!(screen("a"), Some(WordRejection::TooShort));
        assert_eq!(screen("two words"), Some(WordRejection::InvalidCharacters));
        assert_eq!(screen("слово"), Some(WordRejection::InvalidCharacters));
        assert_eq!(screen(&"a".repeat(31)), Some(WordRejection::TooLong));
        assert_eq!(screen("mother-in-law"), None);
        assert_eq!(screen("don't"), None);

        let result = checker().check("Hey").await;
        assert_eq!(result.rejection, Some(WordRejection::Greeting));
    }

    #[tokio::test]
    async fn test_backend_fallback_for_unknown_words() {
        let backend = Arc::new(ScriptedBackend::replies(&["CORRECTION: onomatopoeia"]));
        let checker = checker().with_backend_fallback(backend.clone(), Duration::from_secs(20));

        let result = checker.check("onomatopeiaa").await;
        assert_eq!(result.word.suggestion.as_deref(), Some("onomatopoeia"));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_backend_correct_reply_means_no_suggestion() {
        let backend = Arc::new(ScriptedBackend::replies(&["CORRECT"]));
        let checker = checker().with_backend_fallback(backend, Duration::from_secs(20));

        let result = checker.check("xylophonezzz").await;
        assert_eq!(result.word.suggestion, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_timeout_fails_open() {
        let backend = Arc::new(ScriptedBackend::new(vec![Scripted::Hang]));
        let checker = checker().with_backend_fallback(backend, Duration::from_secs(20));

        let result = checker.check("xylophonezzz").await;
        assert_eq!(result.word.suggestion, None);
        assert_eq!(result.rejection, None);
    }

    #[test]
    fn test_backend_reply_parsing() {
        assert_eq!(parse_backend_reply("CORRECTION: Receive").as_deref(), Some("receive"));
        assert_eq!(parse_backend_reply("**Correction:** definitely").as_deref(), Some("definitely"));
        assert_eq!(parse_backend_reply("CORRECT"), None);
        assert_eq!(parse_backend_reply("I think so"), None);
    }
}
