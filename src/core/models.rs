use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};

/// Opaque user identifier handed over by the messaging transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub raw: String,             // Exactly what the user sent
    pub normalized: String,      // Trimmed, case preserved
    pub suggestion: Option<String>, // Proposed correction, never equal to `normalized`
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub text: String,
    pub part_of_speech: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipa {
    pub british: String,
    pub american: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanations {
    pub english: String,
    pub ukrainian: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub sentence: String,
    pub translation: String,
}

/// A fully validated flashcard. Only built from values that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub word: String,
    pub translations: Vec<Translation>,
    pub ipa: Ipa,
    pub explanations: Explanations,
    pub examples: Vec<Example>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardField {
    Translations,
    Ipa,
    Explanations,
    Examples,
}

impl CardField {
    pub const ALL: [CardField; 4] =
        [CardField::Translations, CardField::Ipa, CardField::Explanations, CardField::Examples];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardField::Translations => "translations",
            CardField::Ipa => "ipa",
            CardField::Explanations => "explanations",
            CardField::Examples => "examples",
        }
    }
}

impl fmt::Display for CardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
