use std::sync::LazyLock;

use regex::Regex;

use crate::core::{
    Example,
    Translation,
};

static LABELED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-•]\s*|\d+[.)]\s*)?([A-Za-z][A-Za-z0-9 _]*?)\s*[:：]\s*(.*)$").unwrap()
});
static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());
static MARKDOWN_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#+\s+").unwrap());
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*```.*$").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static TRANSLATION_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[—–]\s*|\s+-\s+").unwrap());
static TRANSCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(/[^/]+/|\[[^\]]+\])\s*(?:\(\s*(BrE|AmE|UK|US|British|American)\s*\))?").unwrap()
});

/// Whatever could be pulled out of one backend response. Absent values stay `None`/empty;
/// nothing here is validated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    pub translations: Vec<Translation>,
    pub ipa_british: Option<String>,
    pub ipa_american: Option<String>,
    pub explanation_english: Option<String>,
    pub explanation_ukrainian: Option<String>,
    pub examples: Vec<Example>,
}

/// Strips markdown that models add despite being told not to.
pub fn clean_markdown(text: &str) -> String {
    let text = CODE_FENCE.replace_all(text, "");
    let text = MARKDOWN_LINK.replace_all(&text, "$1");
    let text = MARKDOWN_HEADER.replace_all(&text, "");
    let text = INLINE_CODE.replace_all(&text, "$1");
    text.replace("**", "").replace('*', "").trim().to_string()
}

/// Best-effort extraction of labelled lines. Unknown lines are ignored and the first value
/// seen for a single-valued field wins.
pub fn parse_response(raw: &str) -> ParsedFields {
    let cleaned = clean_markdown(raw);
    let mut fields = ParsedFields::default();

    for line in cleaned.lines() {
        let Some(captures) = LABELED_LINE.captures(line) else {
            continue;
        };
        let label = captures[1].trim().to_uppercase().replace(' ', "_");
        let value = captures[2].trim();
        if value.is_empty() || value.eq_ignore_ascii_case("n/a") {
            continue;
        }

        match label.as_str() {
            "TRANSLATION" | "TRANSLATIONS" => {
                fields.translations.extend(parse_translations(value));
            }
            "IPA_BRITISH" | "BRITISH_IPA" | "IPA_BRE" | "IPA_UK" | "BRE" => {
                set_once(&mut fields.ipa_british, &first_transcription(value));
            }
            "IPA_AMERICAN" | "AMERICAN_IPA" | "IPA_AME" | "IPA_US" | "AME" => {
                set_once(&mut fields.ipa_american, &first_transcription(value));
            }
            "PRONUNCIATION" | "IPA" => {
                let (british, american) = parse_pronunciation(value);
                if let Some(british) = british {
                    set_once(&mut fields.ipa_british, &british);
                }
                if let Some(american) = american {
                    set_once(&mut fields.ipa_american, &american);
                }
            }
            "EXPLANATION_EN" | "EXPLANATION_ENGLISH" | "ENGLISH_EXPLANATION" => {
                set_once(&mut fields.explanation_english, value);
            }
            "EXPLANATION_UK" | "EXPLANATION_UA" | "EXPLANATION_UKRAINIAN"
            | "UKRAINIAN_EXPLANATION" => {
                set_once(&mut fields.explanation_ukrainian, value);
            }
            other if other.starts_with("EXPLANATION") => {
                // "English text (Ukrainian text)" on one line
                match split_trailing_parenthetical(value) {
                    Some((english, ukrainian)) => {
                        set_once(&mut fields.explanation_english, &english);
                        set_once(&mut fields.explanation_ukrainian, &ukrainian);
                    }
                    None => set_once(&mut fields.explanation_english, value),
                }
            }
            other if other.starts_with("EXAMPLE") => {
                fields.examples.push(parse_example(value));
            }
            _ => {}
        }
    }

    fields
}

fn set_once(slot: &mut Option<String>, value: &str) {
    if slot.is_none() {
        *slot = Some(value.trim().to_string());
    }
}

/// `verb — бігти; noun — біг`. Commas inside a translation are kept when the next chunk
/// has no part-of-speech separator of its own.
fn parse_translations(value: &str) -> Vec<Translation> {
    let mut entries: Vec<String> = Vec::new();

    for segment in value.split([';', ',']) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match entries.last_mut() {
            Some(last) if !TRANSLATION_DASH.is_match(segment) => {
                last.push_str(", ");
                last.push_str(segment);
            }
            _ => entries.push(segment.to_string()),
        }
    }

    entries
        .iter()
        .map(|entry| {
            let mut parts = TRANSLATION_DASH.splitn(entry, 2);
            let head = parts.next().unwrap_or_default().trim();
            match parts.next() {
                Some(text) => Translation {
                    part_of_speech: head.trim_matches(|c| c == '(' || c == ')').trim().to_string(),
                    text: text.trim().to_string(),
                },
                None => Translation { part_of_speech: String::new(), text: head.to_string() },
            }
        })
        .collect()
}

/// Drops trailing accent markers such as `(BrE)`; text without brackets is kept as is.
fn first_transcription(value: &str) -> String {
    TRANSCRIPTION
        .captures(value)
        .map(|captures| captures[1].to_string())
        .unwrap_or_else(|| value.to_string())
}

/// `/x/ (BrE), /y/ (AmE)`. Unmarked transcriptions fill British first, then American.
fn parse_pronunciation(value: &str) -> (Option<String>, Option<String>) {
    let mut british = None;
    let mut american = None;
    let mut unmarked = Vec::new();

    for captures in TRANSCRIPTION.captures_iter(value) {
        let transcription = captures[1].to_string();
        match captures.get(2).map(|m| m.as_str()) {
            Some("BrE" | "UK" | "British") => british = british.or(Some(transcription)),
            Some(_) => american = american.or(Some(transcription)),
            None => unmarked.push(transcription),
        }
    }

    let mut unmarked = unmarked.into_iter();
    if british.is_none() {
        british = unmarked.next();
    }
    if american.is_none() {
        american = unmarked.next();
    }
    (british, american)
}

fn parse_example(value: &str) -> Example {
    if let Some((sentence, translation)) = value.split_once('|') {
        return Example {
            sentence: sentence.trim().to_string(),
            translation: translation.trim().to_string(),
        };
    }

    match split_trailing_parenthetical(value) {
        Some((sentence, translation)) => Example { sentence, translation },
        None => Example { sentence: value.trim().to_string(), translation: String::new() },
    }
}

/// Splits `text (inner)` into `("text", "inner")`, respecting nested parentheses.
fn split_trailing_parenthetical(value: &str) -> Option<(String, String)> {
    let value = value.trim();
    if !value.ends_with(')') {
        return None;
    }

    let mut depth = 0usize;
    for (idx, ch) in value.char_indices().rev() {
        match ch {
            ')' => depth += 1,
            '(' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let before = value[..idx].trim();
                    let inner = value[idx + 1..value.len() - 1].trim();
                    if before.is_empty() || inner.is_empty() {
                        return None;
                    }
                    return Some((before.to_string(), inner.to_string()));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "TRANSLATION: verb — отримувати; noun — отримання
IPA_BRITISH: /rɪˈsiːv/
IPA_AMERICAN: /rɪˈsiv/
EXPLANATION_EN: To get or be given something
EXPLANATION_UK: Отримувати щось
EXAMPLE: Did you receive my message? | Ти отримав моє повідомлення?";

    #[test]
    fn test_parse_labelled_response() {
        let fields = parse_response(WELL_FORMED);

        assert_eq!(
            fields.translations,
            vec![
                Translation { text: "отримувати".into(), part_of_speech: "verb".into() },
                Translation { text: "отримання".into(), part_of_speech: "noun".into() },
            ]
        );
        assert_eq!(fields.ipa_british.as_deref(), Some("/rɪˈsiːv/"));
        assert_eq!(fields.ipa_american.as_deref(), Some("/rɪˈsiv/"));
        assert_eq!(fields.explanation_ukrainian.as_deref(), Some("Отримувати щось"));
        assert_eq!(fields.examples.len(), 1);
        assert_eq!(fields.examples[0].translation, "Ти отримав моє повідомлення?");
    }

    #[test]
    fn test_markdown_and_bullets_are_tolerated() {
        let raw = "```text\n## Card\n- **TRANSLATION:** noun — біг\n* Pronunciation: /rʌn/ (BrE), /rʌn/ (AmE)\n```";
        let fields = parse_response(raw);

        assert_eq!(fields.translations.len(), 1);
        assert_eq!(fields.translations[0].part_of_speech, "noun");
        assert_eq!(fields.ipa_british.as_deref(), Some("/rʌn/"));
        assert_eq!(fields.ipa_american.as_deref(), Some("/rʌn/"));
    }

    #[test]
    fn test_legacy_layout() {
        let raw = "TRANSLATION: verb — отримав/отримала, past participle — отриманий
EXPLANATION_NOUN: N/A
EXPLANATION_VERB: Past tense of receive (отримав; одержав щось)
EXAMPLE_VERB: I received your letter yesterday. (Я отримав твого листа вчора.)";
        let fields = parse_response(raw);

        assert_eq!(fields.translations.len(), 2);
        assert_eq!(fields.translations[1].part_of_speech, "past participle");
        assert_eq!(fields.explanation_english.as_deref(), Some("Past tense of receive"));
        assert_eq!(fields.explanation_ukrainian.as_deref(), Some("отримав; одержав щось"));
        assert_eq!(fields.examples[0].sentence, "I received your letter yesterday.");
        assert_eq!(fields.examples[0].translation, "Я отримав твого листа вчора.");
    }

    #[test]
    fn test_garbage_yields_empty_fields() {
        assert_eq!(parse_response("I'm sorry, I can't help with that."), ParsedFields::default());
        assert_eq!(parse_response(""), ParsedFields::default());
    }

    #[test]
    fn test_comma_inside_translation_is_kept() {
        let translations = parse_translations("noun — ключ, відповідь; adjective — ключовий");
        assert_eq!(translations.len(), 2);
        assert_eq!(translations[0].text, "ключ, відповідь");
        assert_eq!(translations[1].part_of_speech, "adjective");
    }

    #[test]
    fn test_unmarked_pronunciations_fill_in_order() {
        let (british, american) = parse_pronunciation("[ˈwɔːtə] [ˈwɑːtər]");
        assert_eq!(british.as_deref(), Some("[ˈwɔːtə]"));
        assert_eq!(american.as_deref(), Some("[ˈwɑːtər]"));
    }
}
