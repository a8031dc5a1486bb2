//! Dictionary-assisted correction
//!
//! Replaces misrecognized tokens with the closest known word. Known words are
//! the baseline vocabulary plus the approved learned words; pending words are
//! never used as targets.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde::Serialize;

use super::baseline::Vocabulary;
use super::candidate::{CandidateFilter, WordShapeFilter};

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z](?:[A-Za-z'-]*[A-Za-z])?").expect("word pattern is valid")
});

/// Default similarity cutoff
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.8;

/// Corrected text plus the number of replaced tokens
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correction {
    pub text: String,
    pub corrections: usize,
}

#[derive(Clone)]
pub struct DictionaryCorrector {
    vocabulary: Arc<Vocabulary>,
    min_similarity: f64,
    shape: WordShapeFilter,
}

impl DictionaryCorrector {
    pub fn new(vocabulary: Arc<Vocabulary>, min_similarity: f64) -> Self {
        Self {
            vocabulary,
            min_similarity: min_similarity.clamp(0.0, 1.0),
            shape: WordShapeFilter::default(),
        }
    }

    pub fn min_similarity(&self) -> f64 {
        self.min_similarity
    }

    /// Correct every word token of `text`
    pub fn correct(&self, text: &str, approved: &HashSet<String>) -> Correction {
        let mut corrections = 0;
        let corrected = WORD_RE.replace_all(text, |caps: &Captures<'_>| {
            let token = &caps[0];
            match self.correct_word(token, approved) {
                Some(replacement) => {
                    corrections += 1;
                    replacement
                }
                None => token.to_string(),
            }
        });

        Correction {
            text: match corrected {
                Cow::Borrowed(_) => text.to_string(),
                Cow::Owned(owned) => owned,
            },
            corrections,
        }
    }

    /// Replacement for a single token, if one is close enough
    pub fn correct_word(&self, token: &str, approved: &HashSet<String>) -> Option<String> {
        if !self.shape.is_candidate_word(token) {
            return None;
        }
        let lower = token.to_lowercase();
        if self.vocabulary.contains(&lower) || approved.contains(&lower) {
            return None;
        }

        let candidates = self
            .vocabulary
            .iter()
            .chain(approved.iter().map(String::as_str));
        let best = self.best_match(&lower, candidates)?;
        Some(match_case(token, best))
    }

    fn best_match<'a>(&self, word: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
        let len = word.chars().count();
        let mut best: Option<(f64, &'a str)> = None;

        for candidate in candidates {
            let other_len = candidate.chars().count();
            let longest = len.max(other_len) as f64;
            // Length difference alone already rules the candidate out
            if 1.0 - (len.abs_diff(other_len) as f64 / longest) < self.min_similarity {
                continue;
            }

            let score = similarity(word, candidate);
            if score < self.min_similarity {
                continue;
            }
            best = match best {
                Some((s, w)) if s > score || (s == score && w <= candidate) => Some((s, w)),
                _ => Some((score, candidate)),
            };
        }

        best.map(|(_, w)| w)
    }
}

/// Normalized Levenshtein similarity in `0.0..=1.0`
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Apply the capitalisation pattern of `original` to `word`
fn match_case(original: &str, word: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return word.to_uppercase();
    }
    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = word.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    word.to_string()
}
