/// What the stem left after removing a suffix has to look like for the rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StemCheck {
    Any,
    /// Suffix doubled the final consonant (stopped, bigger, travelled).
    Doubled,
    /// Stem used as is. Rejects one-syllable stems that should have doubled (runing) and
    /// stems that kept a silent e (bakeing).
    Plain,
    /// Stem must not end in e (baking from bake, but not bakeing).
    NoTrailingE,
    /// Stem ends in s, x, z, ch, sh or o (boxes, wishes, heroes).
    Sibilant,
    /// Stem must not need the `-es` form (cats, but not boxs).
    NotSibilant,
}

struct SuffixRule {
    name: &'static str,
    suffix: &'static str,
    restore: &'static str,
    check: StemCheck,
}

const MIN_STEM_LENGTH: usize = 2;

const RULES: &[SuffixRule] = &[
    SuffixRule { name: "possessive", suffix: "'s", restore: "", check: StemCheck::Any },
    SuffixRule { name: "plural possessive", suffix: "s'", restore: "", check: StemCheck::Any },
    SuffixRule { name: "consonant y plural", suffix: "ies", restore: "y", check: StemCheck::Any },
    SuffixRule { name: "sibilant plural", suffix: "es", restore: "", check: StemCheck::Sibilant },
    SuffixRule { name: "plural", suffix: "s", restore: "", check: StemCheck::NotSibilant },
    SuffixRule { name: "progressive doubled", suffix: "ing", restore: "", check: StemCheck::Doubled },
    SuffixRule { name: "progressive", suffix: "ing", restore: "", check: StemCheck::Plain },
    SuffixRule {
        name: "progressive silent e",
        suffix: "ing",
        restore: "e",
        check: StemCheck::NoTrailingE,
    },
    SuffixRule { name: "past consonant y", suffix: "ied", restore: "y", check: StemCheck::Any },
    SuffixRule { name: "past doubled", suffix: "ed", restore: "", check: StemCheck::Doubled },
    SuffixRule { name: "past", suffix: "ed", restore: "", check: StemCheck::Plain },
    SuffixRule { name: "past silent e", suffix: "d", restore: "", check: StemCheck::Any },
    SuffixRule { name: "comparative consonant y", suffix: "ier", restore: "y", check: StemCheck::Any },
    SuffixRule { name: "comparative doubled", suffix: "er", restore: "", check: StemCheck::Doubled },
    SuffixRule { name: "comparative", suffix: "er", restore: "", check: StemCheck::Plain },
    SuffixRule { name: "comparative silent e", suffix: "r", restore: "", check: StemCheck::Any },
    SuffixRule { name: "superlative consonant y", suffix: "iest", restore: "y", check: StemCheck::Any },
    SuffixRule { name: "superlative doubled", suffix: "est", restore: "", check: StemCheck::Doubled },
    SuffixRule { name: "superlative", suffix: "est", restore: "", check: StemCheck::Plain },
    SuffixRule { name: "superlative silent e", suffix: "st", restore: "", check: StemCheck::Any },
    SuffixRule { name: "adverb consonant y", suffix: "ily", restore: "y", check: StemCheck::Any },
    SuffixRule { name: "adverb from -le", suffix: "ly", restore: "le", check: StemCheck::Any },
    SuffixRule { name: "adverb", suffix: "ly", restore: "", check: StemCheck::Any },
    SuffixRule { name: "noun consonant y", suffix: "iness", restore: "y", check: StemCheck::Any },
    SuffixRule { name: "noun", suffix: "ness", restore: "", check: StemCheck::Any },
    SuffixRule { name: "privative", suffix: "less", restore: "", check: StemCheck::Any },
    SuffixRule { name: "adjective", suffix: "ful", restore: "", check: StemCheck::Any },
    SuffixRule { name: "result noun", suffix: "ment", restore: "", check: StemCheck::Any },
];

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn syllables(word: &str) -> usize {
    let mut count = 0;
    let mut in_group = false;
    for c in word.chars() {
        let vowel = is_vowel(c) || c == 'y';
        if vowel && !in_group {
            count += 1;
        }
        in_group = vowel;
    }
    count
}

/// Consonant, vowel, consonant ending where the final consonant is not w, x or y.
fn ends_cvc(word: &str) -> bool {
    let tail: Vec<char> = word.chars().rev().take(3).collect();
    match tail.as_slice() {
        [last, middle, first] => {
            !is_vowel(*last)
                && !matches!(last, 'w' | 'x' | 'y')
                && is_vowel(*middle)
                && !is_vowel(*first)
        }
        _ => false,
    }
}

fn keeps_silent_e(stem: &str) -> bool {
    stem.ends_with('e') && !["ee", "ye", "oe"].iter().any(|ending| stem.ends_with(ending))
}

impl StemCheck {
    /// Base form for `stem`, or `None` when the stem fails the check.
    fn apply(self, stem: &str) -> Option<String> {
        match self {
            StemCheck::Any => Some(stem.to_string()),
            StemCheck::Doubled => {
                let mut chars = stem.chars().rev();
                let (last, before) = (chars.next()?, chars.next()?);
                if last != before || is_vowel(last) {
                    return None;
                }
                let single = &stem[..stem.len() - last.len_utf8()];
                (ends_cvc(single) || last == 'l').then(|| single.to_string())
            }
            StemCheck::Plain => {
                let should_double = ends_cvc(stem) && syllables(stem) == 1;
                (!should_double && !keeps_silent_e(stem)).then(|| stem.to_string())
            }
            StemCheck::NoTrailingE => (!stem.ends_with('e')).then(|| stem.to_string()),
            StemCheck::Sibilant => ["s", "x", "z", "ch", "sh", "o"]
                .iter()
                .any(|ending| stem.ends_with(ending))
                .then(|| stem.to_string()),
            StemCheck::NotSibilant => (!["s", "x", "z", "ch", "sh"]
                .iter()
                .any(|ending| stem.ends_with(ending)))
            .then(|| stem.to_string()),
        }
    }
}

/// Candidate base forms of a lower-cased word under the regular English suffix rules.
/// Candidates are not checked against any word list.
pub fn base_forms(word: &str) -> Vec<String> {
    let mut forms: Vec<String> = Vec::new();
    for rule in RULES {
        let Some(stem) = word.strip_suffix(rule.suffix) else {
            continue;
        };
        if stem.chars().count() < MIN_STEM_LENGTH {
            continue;
        }
        if let Some(base) = rule.check.apply(stem) {
            let base = base + rule.restore;
            if base != word && !forms.contains(&base) {
                log::trace!("'{}' may be '{}' ({})", word, base, rule.name);
                forms.push(base);
            }
        }
    }
    forms
}
