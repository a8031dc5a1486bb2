//! Word tracker
//!
//! Extracts the tokens of a recognized text that the service does not know
//! yet and describes how a single sighting changes a tracked word. The
//! tracker never approves anything; promotion is evaluated afterwards by
//! `PromotionPolicy`.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;

use super::baseline::Vocabulary;
use super::candidate::{CandidateFilter, WordShapeFilter};
use super::types::TrackedWord;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z](?:[A-Za-z'-]*[A-Za-z])?").expect("token pattern is valid")
});

/// Lower-cased word tokens in order of first appearance, without duplicates
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

#[derive(Clone)]
pub struct WordTracker {
    vocabulary: Arc<Vocabulary>,
    filter: Arc<dyn CandidateFilter>,
}

impl WordTracker {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self::with_filter(vocabulary, Arc::new(WordShapeFilter::default()))
    }

    pub fn with_filter(vocabulary: Arc<Vocabulary>, filter: Arc<dyn CandidateFilter>) -> Self {
        Self { vocabulary, filter }
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// Candidate tokens of `text` that are absent from the baseline vocabulary
    pub fn unknown_tokens(&self, text: &str) -> Vec<String> {
        tokenize(text)
            .into_iter()
            .filter(|token| self.filter.is_candidate_word(token))
            .filter(|token| !self.vocabulary.contains(token))
            .collect()
    }

    /// State of `word` after one more sighting
    pub fn record_occurrence(
        existing: Option<&TrackedWord>,
        word: &str,
        now: DateTime<Utc>,
    ) -> TrackedWord {
        match existing {
            Some(current) => {
                let mut next = current.clone();
                next.frequency = next.frequency.saturating_add(1);
                next.last_seen = now;
                next
            }
            None => TrackedWord::first_sighting(word, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> WordTracker {
        WordTracker::new(Arc::new(Vocabulary::builtin()))
    }

    #[test]
    fn test_tokenize_dedupes_and_lowercases() {
        let tokens = tokenize("Koperasi koperasi, KOPERASI! sewa-beli 'pangkalan' 1958");
        assert_eq!(tokens, vec!["koperasi", "sewa-beli", "pangkalan"]);
    }

    #[test]
    fn test_unknown_tokens_skip_baseline_and_noise() {
        let tokens = tracker().unknown_tokens("Kepala Djawatan Koperasi di Kabupaten Sertipikat x7y ab");
        assert_eq!(tokens, vec!["koperasi", "sertipikat"]);
    }

    #[test]
    fn test_custom_filter_is_consulted() {
        let only_k = |token: &str| token.starts_with('k');
        let tracker = WordTracker::with_filter(Arc::new(Vocabulary::empty()), Arc::new(only_k));
        assert_eq!(tracker.unknown_tokens("koperasi merdeka kramat"), vec!["koperasi", "kramat"]);
    }

    #[test]
    fn test_record_occurrence_increments_without_approving() {
        let t0 = Utc::now();
        let first = WordTracker::record_occurrence(None, "merdeka", t0);
        assert_eq!(first.frequency, 1);
        assert!(!first.is_approved);

        let t1 = t0 + chrono::Duration::seconds(5);
        let second = WordTracker::record_occurrence(Some(&first), "merdeka", t1);
        assert_eq!(second.frequency, 2);
        assert_eq!(second.first_seen, t0);
        assert_eq!(second.last_seen, t1);
        assert!(!second.is_approved);
    }
}
