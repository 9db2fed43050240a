use std::{
    collections::HashMap,
    fs,
    path::Path,
};

use super::inflection::base_forms;
use crate::core::BotError;

const EMBEDDED_WORDS: &str = include_str!("../../data/words.txt");
const EMBEDDED_MISSPELLINGS: &str = include_str!("../../data/misspellings.txt");

/// Maximum Damerau-Levenshtein (optimal string alignment) distance for a suggestion.
pub const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Lower-cased word list with relative frequencies. Higher frequency means more common.
///
/// Regular inflections of listed words are accepted without their own entry. Known
/// misspellings are never accepted and map straight to their correction.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    frequencies: HashMap<String, u64>,
    misspellings: HashMap<String, String>,
}

fn content_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

impl WordList {
    pub fn embedded() -> Self {
        Self::parse(EMBEDDED_WORDS).with_misspellings(EMBEDDED_MISSPELLINGS)
    }

    /// Embedded list plus the user's own file, if one is given.
    pub fn load(extra: Option<&Path>) -> Result<Self, BotError> {
        let mut list = Self::embedded();
        if let Some(path) = extra {
            let content = fs::read_to_string(path).map_err(|e| {
                BotError::FailedToLoadFile(format!("{}: {}", path.display(), e))
            })?;
            let before = list.len();
            list.extend(Self::parse(&content));
            log::info!(
                "Loaded {} extra words from {}",
                list.len().saturating_sub(before),
                path.display()
            );
        }
        Ok(list)
    }

    /// One word per line, optionally followed by whitespace and a frequency. Lines without
    /// a frequency are ranked by position, earliest first. `#` starts a comment line.
    pub fn parse(content: &str) -> Self {
        let entries: Vec<(&str, Option<u64>)> = content_lines(content)
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let word = parts.next()?;
                let frequency = parts.next().and_then(|f| f.parse::<u64>().ok());
                Some((word, frequency))
            })
            .collect();

        let total = entries.len() as u64;
        let mut frequencies = HashMap::with_capacity(entries.len());
        for (idx, (word, frequency)) in entries.into_iter().enumerate() {
            frequencies
                .entry(word.to_lowercase())
                .or_insert_with(|| frequency.unwrap_or(total - idx as u64));
        }

        Self { frequencies, misspellings: HashMap::new() }
    }

    /// Adds `misspelling correction` pairs, one per line. A misspelling that is itself a
    /// listed word is skipped.
    pub fn with_misspellings(mut self, content: &str) -> Self {
        for line in content_lines(content) {
            let mut parts = line.split_whitespace();
            let (Some(wrong), Some(right)) = (parts.next(), parts.next()) else {
                log::warn!("Ignoring malformed misspelling line '{}'", line);
                continue;
            };
            let wrong = wrong.to_lowercase();
            if self.frequencies.contains_key(&wrong) {
                continue;
            }
            self.misspellings.insert(wrong, right.to_lowercase());
        }
        self
    }

    /// Words from `other` win over known misspellings with the same spelling.
    pub fn extend(&mut self, other: WordList) {
        for (word, frequency) in other.frequencies {
            self.misspellings.remove(&word);
            self.frequencies.entry(word).or_insert(frequency);
        }
        for (wrong, right) in other.misspellings {
            if !self.frequencies.contains_key(&wrong) {
                self.misspellings.entry(wrong).or_insert(right);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Listed exactly, without inflection.
    pub fn contains(&self, word: &str) -> bool {
        self.frequencies.contains_key(&word.to_lowercase())
    }

    /// Listed, or a regular inflection of a listed word, and not a known misspelling.
    pub fn knows(&self, word: &str) -> bool {
        let lookup = word.to_lowercase();
        if self.misspellings.contains_key(&lookup) {
            return false;
        }
        self.frequencies.contains_key(&lookup)
            || base_forms(&lookup).iter().any(|base| self.frequencies.contains_key(base))
    }

    pub fn correction(&self, word: &str) -> Option<&str> {
        self.misspellings.get(&word.to_lowercase()).map(String::as_str)
    }

    pub fn frequency(&self, word: &str) -> Option<u64> {
        self.frequencies.get(&word.to_lowercase()).copied()
    }

    /// The correction for a known misspelling, else the closest listed word within
    /// `MAX_SUGGESTION_DISTANCE`, ranked by distance, then by frequency, then alphabetically.
    /// `None` for known words, inflected forms included.
    pub fn closest(&self, word: &str) -> Option<String> {
        let lookup = word.to_lowercase();
        if let Some(correction) = self.misspellings.get(&lookup) {
            return Some(correction.clone());
        }
        if self.knows(&lookup) {
            return None;
        }

        let length = lookup.chars().count();
        self.frequencies
            .iter()
            .filter(|(candidate, _)| {
                candidate.chars().count().abs_diff(length) <= MAX_SUGGESTION_DISTANCE
            })
            .filter_map(|(candidate, frequency)| {
                let distance = strsim::osa_distance(&lookup, candidate);
                (distance <= MAX_SUGGESTION_DISTANCE).then_some((distance, *frequency, candidate))
            })
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(b.2)))
            .map(|(_, _, candidate)| candidate.clone())
    }
}
