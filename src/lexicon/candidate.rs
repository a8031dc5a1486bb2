//! Candidate-word predicate
//!
//! Decides which extracted tokens are worth tracking at all. The tracker only
//! consults this predicate; the dictionary state machine does not depend on
//! which heuristic is plugged in.

/// Predicate deciding whether a token may enter the word store
pub trait CandidateFilter: Send + Sync {
    fn is_candidate_word(&self, token: &str) -> bool;
}

impl<F> CandidateFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_candidate_word(&self, token: &str) -> bool {
        self(token)
    }
}

/// Default word-shape rule: long enough, no digits, letters apart from `-` and `'`
#[derive(Debug, Clone, Copy)]
pub struct WordShapeFilter {
    pub min_length: usize,
}

impl Default for WordShapeFilter {
    fn default() -> Self {
        Self { min_length: 3 }
    }
}

impl CandidateFilter for WordShapeFilter {
    fn is_candidate_word(&self, token: &str) -> bool {
        if token.chars().count() < self.min_length {
            return false;
        }
        if token.chars().any(|c| c.is_ascii_digit()) {
            return false;
        }
        let mut letters = 0;
        for c in token.chars() {
            match c {
                '-' | '\'' => {}
                c if c.is_alphabetic() => letters += 1,
                _ => return false,
            }
        }
        letters >= self.min_length
    }
}
