use std::collections::BTreeMap;

use thiserror::Error;

use super::validator::{
    CardAttempt,
    Verdict,
};
use crate::core::{
    Card,
    CardField,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no valid value for: {}", missing_fields(.field_errors))]
pub struct MergeError {
    pub field_errors: BTreeMap<CardField, String>,
}

fn missing_fields(field_errors: &BTreeMap<CardField, String>) -> String {
    field_errors.keys().map(CardField::as_str).collect::<Vec<_>>().join(", ")
}

/// Where each field's value comes from, or why none could be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    From(usize),
    Missing(String),
}

pub type ResolutionTable = BTreeMap<CardField, Resolution>;

/// Folds the attempts, in order, into one resolution per field. The first attempt with a
/// valid value for a field wins it; later attempts never override.
pub fn resolve(attempts: &[CardAttempt]) -> ResolutionTable {
    let empty: ResolutionTable = CardField::ALL
        .into_iter()
        .map(|field| (field, Resolution::Missing("no attempts were made".to_string())))
        .collect();

    attempts.iter().enumerate().fold(empty, |mut table, (idx, attempt)| {
        for field in CardField::ALL {
            let entry = table.entry(field).or_insert(Resolution::Missing(String::new()));
            if matches!(entry, Resolution::From(_)) {
                continue;
            }
            *entry = match attempt.verdicts.verdict(field) {
                Verdict::Valid => Resolution::From(idx),
                Verdict::Invalid(reason) => {
                    Resolution::Missing(format!("{reason} (after {} attempts)", idx + 1))
                }
            };
        }
        table
    })
}

/// Builds a card from the first valid value of every field.
pub fn merge(word: &str, attempts: &[CardAttempt]) -> Result<Card, MergeError> {
    let table = resolve(attempts);

    let field_errors: BTreeMap<CardField, String> = table
        .iter()
        .filter_map(|(field, resolution)| match resolution {
            Resolution::Missing(reason) => Some((*field, reason.clone())),
            Resolution::From(_) => None,
        })
        .collect();
    if !field_errors.is_empty() {
        return Err(MergeError { field_errors });
    }

    let source = |field: CardField| match table.get(&field) {
        Some(Resolution::From(idx)) => attempts.get(*idx),
        _ => None,
    };
    let missing = |field: CardField| MergeError {
        field_errors: BTreeMap::from([(field, "resolution lost".to_string())]),
    };

    let translations = source(CardField::Translations)
        .and_then(|a| a.verdicts.translations.clone().ok())
        .ok_or_else(|| missing(CardField::Translations))?;
    let ipa = source(CardField::Ipa)
        .and_then(|a| a.verdicts.ipa.clone().ok())
        .ok_or_else(|| missing(CardField::Ipa))?;
    let explanations = source(CardField::Explanations)
        .and_then(|a| a.verdicts.explanations.clone().ok())
        .ok_or_else(|| missing(CardField::Explanations))?;
    let examples = source(CardField::Examples)
        .and_then(|a| a.verdicts.examples.clone().ok())
        .ok_or_else(|| missing(CardField::Examples))?;

    Ok(Card { word: word.to_string(), translations, ipa, explanations, examples })
}
