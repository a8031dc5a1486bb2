//! Baseline vocabulary
//!
//! Words the service already knows without learning them. Tokens found here
//! are never tracked, and they are valid correction targets.

use std::collections::HashSet;
use std::path::Path;

const BUILTIN_WORDS: &str = include_str!("baseline_words.txt");

/// Known-word set (lower-cased)
#[derive(Debug, Clone)]
pub struct Vocabulary {
    words: HashSet<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Vocabulary {
    /// The built-in Indonesian/English document vocabulary
    pub fn builtin() -> Self {
        let mut vocab = Self::empty();
        vocab.extend_from_str(BUILTIN_WORDS);
        vocab
    }

    pub fn empty() -> Self {
        Self {
            words: HashSet::new(),
        }
    }

    /// Built-in words plus a newline-separated word file. Lines starting with `#` are ignored.
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let extra = std::fs::read_to_string(path.as_ref())?;
        let mut vocab = Self::builtin();
        let before = vocab.len();
        vocab.extend_from_str(&extra);
        tracing::info!(
            path = %path.as_ref().display(),
            added = vocab.len() - before,
            "Loaded baseline dictionary file"
        );
        Ok(vocab)
    }

    pub fn extend_from_str(&mut self, text: &str) {
        for line in text.lines() {
            let word = line.trim();
            if word.is_empty() || word.starts_with('#') {
                continue;
            }
            self.words.insert(word.to_lowercase());
        }
    }

    pub fn insert(&mut self, word: &str) {
        self.words.insert(word.to_lowercase());
    }

    /// Case-insensitive lookup
    pub fn contains(&self, word: &str) -> bool {
        if self.words.contains(word) {
            return true;
        }
        word.chars().any(char::is_uppercase) && self.words.contains(&word.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}
