use std::{
    collections::BTreeMap,
    sync::LazyLock,
};

use regex::Regex;

use super::parser::{
    parse_response,
    ParsedFields,
};
use crate::core::{
    CardField,
    Example,
    Explanations,
    Ipa,
    Translation,
};

static IPA_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(/[^/\s][^/]*/|\[[^\]\s][^\]]*\])$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(String),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

/// Per-field outcome of validating one attempt. A field is only ever `Ok` with a value
/// that satisfies every rule for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldVerdicts {
    pub translations: Result<Vec<Translation>, String>,
    pub ipa: Result<Ipa, String>,
    pub explanations: Result<Explanations, String>,
    pub examples: Result<Vec<Example>, String>,
}

impl FieldVerdicts {
    pub fn all_invalid(reason: &str) -> Self {
        Self {
            translations: Err(reason.to_string()),
            ipa: Err(reason.to_string()),
            explanations: Err(reason.to_string()),
            examples: Err(reason.to_string()),
        }
    }

    pub fn is_valid(&self) -> bool {
        CardField::ALL.iter().all(|field| self.verdict(*field).is_valid())
    }

    pub fn verdict(&self, field: CardField) -> Verdict {
        let reason = match field {
            CardField::Translations => self.translations.as_ref().err(),
            CardField::Ipa => self.ipa.as_ref().err(),
            CardField::Explanations => self.explanations.as_ref().err(),
            CardField::Examples => self.examples.as_ref().err(),
        };
        match reason {
            Some(reason) => Verdict::Invalid(reason.clone()),
            None => Verdict::Valid,
        }
    }

    pub fn summary(&self) -> BTreeMap<CardField, Verdict> {
        CardField::ALL.iter().map(|field| (*field, self.verdict(*field))).collect()
    }

    pub fn invalid_fields(&self) -> Vec<CardField> {
        CardField::ALL.into_iter().filter(|field| !self.verdict(*field).is_valid()).collect()
    }
}

/// One backend call: what came back, what could be parsed, and what passed.
#[derive(Debug, Clone)]
pub struct CardAttempt {
    pub raw: String,
    pub fields: ParsedFields,
    pub verdicts: FieldVerdicts,
}

impl CardAttempt {
    pub fn from_response(word: &str, raw: &str) -> Self {
        let fields = parse_response(raw);
        let verdicts = validate(word, &fields);
        Self { raw: raw.to_string(), fields, verdicts }
    }

    /// An attempt that produced nothing usable, e.g. a timed out call.
    pub fn failed(reason: &str) -> Self {
        Self {
            raw: String::new(),
            fields: ParsedFields::default(),
            verdicts: FieldVerdicts::all_invalid(reason),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.verdicts.is_valid()
    }
}

pub fn validate(word: &str, fields: &ParsedFields) -> FieldVerdicts {
    FieldVerdicts {
        translations: validate_translations(&fields.translations),
        ipa: validate_ipa(fields.ipa_british.as_deref(), fields.ipa_american.as_deref()),
        explanations: validate_explanations(
            fields.explanation_english.as_deref(),
            fields.explanation_ukrainian.as_deref(),
        ),
        examples: validate_examples(word, &fields.examples),
    }
}

pub fn contains_cyrillic(text: &str) -> bool {
    text.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c))
}

pub fn is_ipa(text: &str) -> bool {
    IPA_PATTERN.is_match(text.trim())
}

fn validate_translations(translations: &[Translation]) -> Result<Vec<Translation>, String> {
    if translations.is_empty() {
        return Err("no translations found".to_string());
    }

    for (idx, translation) in translations.iter().enumerate() {
        if translation.text.trim().is_empty() {
            return Err(format!("translation {} has no text", idx + 1));
        }
        if translation.part_of_speech.trim().is_empty() {
            return Err(format!("translation {} has no part of speech", idx + 1));
        }
        if !contains_cyrillic(&translation.text) {
            return Err(format!("translation {} is not in Ukrainian", idx + 1));
        }
    }

    Ok(translations.to_vec())
}

fn validate_ipa(british: Option<&str>, american: Option<&str>) -> Result<Ipa, String> {
    let british = british.ok_or("British IPA missing")?;
    let american = american.ok_or("American IPA missing")?;

    if !is_ipa(british) {
        return Err(format!("British IPA is malformed: {british}"));
    }
    if !is_ipa(american) {
        return Err(format!("American IPA is malformed: {american}"));
    }

    Ok(Ipa { british: british.trim().to_string(), american: american.trim().to_string() })
}

fn validate_explanations(
    english: Option<&str>,
    ukrainian: Option<&str>,
) -> Result<Explanations, String> {
    let english = english.map(str::trim).filter(|e| !e.is_empty());
    let ukrainian = ukrainian.map(str::trim).filter(|u| !u.is_empty());

    let english = english.ok_or("English explanation missing")?;
    let ukrainian = ukrainian.ok_or("Ukrainian explanation missing")?;
    if !contains_cyrillic(ukrainian) {
        return Err("Ukrainian explanation is not in Cyrillic".to_string());
    }

    Ok(Explanations { english: english.to_string(), ukrainian: ukrainian.to_string() })
}

fn validate_examples(word: &str, examples: &[Example]) -> Result<Vec<Example>, String> {
    if examples.is_empty() {
        return Err("no examples found".to_string());
    }

    let needle = word.trim().to_lowercase();
    for (idx, example) in examples.iter().enumerate() {
        if example.sentence.trim().is_empty() {
            return Err(format!("example {} is empty", idx + 1));
        }
        if !example.sentence.to_lowercase().contains(&needle) {
            return Err(format!("example {} does not contain \"{}\"", idx + 1, word.trim()));
        }
    }

    Ok(examples.to_vec())
}
