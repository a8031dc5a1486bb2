//! Old-orthography spelling normalizer
//!
//! Rewrites pre-1972 Indonesian spelling into the modern one:
//! `oe → u`, `dj → j`, `tj → c`, `nj → ny`, `sj → sy`, `ch → kh`, plus a few
//! whole words whose `j` became `y`. Foreign words and modern words that
//! merely contain one of the digraphs are left alone.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z]+(?:['-][A-Za-z]+)*").expect("word pattern is valid")
});

/// Digraph rules, applied in order
static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [("oe", "u"), ("dj", "j"), ("tj", "c"), ("nj", "ny"), ("sj", "sy"), ("ch", "kh")]
        .into_iter()
        .map(|(pattern, replacement)| {
            let re = Regex::new(&format!("(?i){}", pattern)).expect("digraph pattern is valid");
            (re, replacement)
        })
        .collect()
});

const FOREIGN_WORDS: &[&str] = &[
    "project", "object", "subject", "inject", "reject", "eject", "adjacent", "trajectory",
    "objective", "subjective", "projection", "adjective", "conjunction", "injection",
    "objection", "rejection", "adjustment", "major", "junior", "senior", "adjunct",
    "penunjukan", "tunjuk", "panjang", "janji", "banjir", "manja", "technical", "school",
    "chapter", "church", "march", "much", "which", "each", "such", "shoe", "does", "goes",
];

const J_TO_Y_WORDS: &[(&str, &str)] = &[
    ("jang", "yang"),
    ("ja", "ya"),
    ("jaitu", "yaitu"),
    ("jaitoe", "yaitu"),
    ("kaja", "kaya"),
    ("saja", "saya"),
];

/// Normalized text plus the number of rewritten words
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Normalization {
    pub text: String,
    pub changes: usize,
}

#[derive(Debug, Clone)]
pub struct SpellingNormalizer {
    foreign: HashSet<String>,
    j_to_y: HashMap<String, String>,
}

impl Default for SpellingNormalizer {
    fn default() -> Self {
        Self {
            foreign: FOREIGN_WORDS.iter().map(|w| w.to_string()).collect(),
            j_to_y: J_TO_Y_WORDS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

impl SpellingNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude an additional word from normalization
    pub fn allow_word(&mut self, word: &str) {
        self.foreign.insert(word.to_lowercase());
    }

    pub fn normalize(&self, text: &str) -> Normalization {
        let mut changes = 0;
        let normalized = WORD_RE.replace_all(text, |caps: &Captures<'_>| {
            let word = &caps[0];
            let rewritten = self.normalize_word(word);
            if rewritten != word {
                changes += 1;
            }
            rewritten
        });

        Normalization {
            text: normalized.into_owned(),
            changes,
        }
    }

    /// Normalize a single word
    pub fn normalize_word(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        if self.foreign.contains(&lower) {
            return word.to_string();
        }
        if let Some(replacement) = self.j_to_y.get(&lower) {
            return apply_case(word, replacement);
        }

        let mut result = word.to_string();
        for (re, replacement) in RULES.iter() {
            result = re
                .replace_all(&result, |caps: &Captures<'_>| apply_case(&caps[0], replacement))
                .into_owned();
        }
        result
    }
}

/// Give `replacement` the case pattern of `matched`
fn apply_case(matched: &str, replacement: &str) -> String {
    let has_lower = matched.chars().any(char::is_lowercase);
    let first_upper = matched.chars().next().is_some_and(char::is_uppercase);

    if !has_lower && first_upper {
        replacement.to_uppercase()
    } else if first_upper {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        replacement.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digraphs() {
        let n = SpellingNormalizer::new();
        assert_eq!(n.normalize_word("oetara"), "utara");
        assert_eq!(n.normalize_word("Djalan"), "Jalan");
        assert_eq!(n.normalize_word("tjari"), "cari");
        assert_eq!(n.normalize_word("njamuk"), "nyamuk");
        assert_eq!(n.normalize_word("sjarat"), "syarat");
        assert_eq!(n.normalize_word("chabar"), "khabar");
        assert_eq!(n.normalize_word("DJAWATAN"), "JAWATAN");
        assert_eq!(n.normalize_word("kedjujoeran"), "kejujuran");
    }

    #[test]
    fn test_j_to_y_words() {
        let n = SpellingNormalizer::new();
        assert_eq!(n.normalize_word("jang"), "yang");
        assert_eq!(n.normalize_word("Jaitoe"), "Yaitu");
        assert_eq!(n.normalize_word("jalan"), "jalan");
    }

    #[test]
    fn test_whitelist_and_punctuation() {
        let n = SpellingNormalizer::new();
        let result = n.normalize("Chabar baik dari project, (banjir) di Djakarta.");
        assert_eq!(result.text, "Khabar baik dari project, (banjir) di Jakarta.");
        assert_eq!(result.changes, 2);
    }

    #[test]
    fn test_allow_word() {
        let mut n = SpellingNormalizer::new();
        n.allow_word("Tjokro");
        assert_eq!(n.normalize_word("tjokro"), "tjokro");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let n = SpellingNormalizer::new();
        let result = n.normalize("Surat keputusan nomor 12 tahun 1958");
        assert_eq!(result.text, "Surat keputusan nomor 12 tahun 1958");
        assert_eq!(result.changes, 0);
    }
}
