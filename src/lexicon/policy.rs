//! Promotion policy
//!
//! Decides when a pending word becomes approved. Kept separate from the
//! tracker so that recording an occurrence and evaluating promotion are two
//! explicit steps.

use chrono::{DateTime, Utc};

use super::types::{TrackedWord, DEFAULT_FREQUENCY_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionPolicy {
    threshold: u32,
}

impl Default for PromotionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY_THRESHOLD)
    }
}

impl PromotionPolicy {
    /// A threshold of zero is treated as one
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn should_promote(&self, frequency: u32) -> bool {
        frequency >= self.threshold
    }

    /// Approve the word if it has reached the threshold.
    /// Returns true only for the call that flips the flag.
    pub fn evaluate(&self, word: &mut TrackedWord, now: DateTime<Utc>) -> bool {
        if word.is_approved || !self.should_promote(word.frequency) {
            return false;
        }
        word.approve(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotes_exactly_once_at_threshold() {
        let policy = PromotionPolicy::new(3);
        let now = Utc::now();
        let mut word = TrackedWord::first_sighting("merdeka", now);

        let mut flips = Vec::new();
        for _ in 0..6 {
            flips.push(policy.evaluate(&mut word, now));
            word.frequency += 1;
        }

        assert_eq!(flips, vec![false, false, true, false, false, false]);
        assert!(word.is_approved);
    }

    #[test]
    fn test_zero_threshold_clamped() {
        let policy = PromotionPolicy::new(0);
        assert_eq!(policy.threshold(), 1);
        assert!(policy.should_promote(1));
    }
}
