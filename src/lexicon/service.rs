//! Lexicon service
//!
//! The operations exposed to the rest of the server: tracking unknown words
//! from OCR output, manual approval and rejection, import/export, listing and
//! statistics. Every administrative mutation is committed together with its
//! audit event.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use serde_json::json;

use super::policy::PromotionPolicy;
use super::store::WordStore;
use super::tracker::WordTracker;
use super::types::*;
use crate::audit::{AuditContext, AuditEventType, AuditLog, NewAuditEvent};
use crate::persistence::WriteBatch;

/// Result type for lexicon operations
pub type LexiconResult<T> = std::result::Result<T, LexiconError>;

/// Largest page returned by `list_pending`
pub const MAX_PENDING_PAGE: usize = 500;

/// Tunables for the learning dictionary
#[derive(Debug, Clone, Copy)]
pub struct LexiconSettings {
    pub frequency_threshold: u32,
    pub max_import_words: usize,
}

impl Default for LexiconSettings {
    fn default() -> Self {
        Self {
            frequency_threshold: DEFAULT_FREQUENCY_THRESHOLD,
            max_import_words: MAX_IMPORT_WORDS,
        }
    }
}

/// Validate and normalize an imported word
pub fn validate_import_word(raw: &str) -> LexiconResult<String> {
    let word = normalize_word(raw);
    let invalid = |reason: &str| LexiconError::InvalidWord {
        word: raw.to_string(),
        reason: reason.to_string(),
    };

    let len = word.chars().count();
    if len < MIN_IMPORT_WORD_LENGTH {
        return Err(invalid("too short"));
    }
    if len > MAX_IMPORT_WORD_LENGTH {
        return Err(invalid("too long"));
    }
    if !word
        .chars()
        .all(|c| c.is_ascii_lowercase() || c == '-' || c == '\'')
    {
        return Err(invalid("only letters, hyphens and apostrophes are allowed"));
    }
    Ok(word)
}

fn clamp_frequency(frequency: i64) -> u32 {
    // Range fits u32
    frequency.clamp(1, MAX_IMPORT_FREQUENCY) as u32
}

pub struct LexiconService {
    store: WordStore,
    audit: AuditLog,
    tracker: WordTracker,
    policy: PromotionPolicy,
    max_import_words: usize,
}

impl LexiconService {
    pub fn new(store: WordStore, audit: AuditLog, tracker: WordTracker, settings: LexiconSettings) -> Self {
        Self {
            store,
            audit,
            tracker,
            policy: PromotionPolicy::new(settings.frequency_threshold),
            max_import_words: settings.max_import_words,
        }
    }

    pub fn store(&self) -> &WordStore {
        &self.store
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn tracker(&self) -> &WordTracker {
        &self.tracker
    }

    pub fn policy(&self) -> PromotionPolicy {
        self.policy
    }

    /// Count every unknown candidate token of `text` once, promoting words
    /// that reach the threshold.
    ///
    /// Each word is committed on its own. If the backend fails part-way, the
    /// words before the failing one stay counted and the error is returned;
    /// the failing word and the ones after it are not touched.
    pub async fn track_unknown_words(&self, text: &str) -> LexiconResult<TrackingReport> {
        let tokens = self.tracker.unknown_tokens(text);
        let mut report = TrackingReport::default();

        for token in tokens {
            let now = Utc::now();
            let policy = self.policy;
            let result = self
                .store
                .upsert(&token, |existing| {
                    let mut next = WordTracker::record_occurrence(existing, &token, now);
                    let promoted = policy.evaluate(&mut next, now);
                    (next, (existing.is_none(), promoted))
                })
                .await;
            let (word, (is_new, promoted)) = match result {
                Ok(applied) => applied,
                Err(e) => {
                    tracing::warn!(
                        word = %token,
                        applied = report.tracked,
                        error = %e,
                        "Tracking stopped part-way"
                    );
                    return Err(e.into());
                }
            };

            report.tracked += 1;
            if is_new {
                report.new_words += 1;
            }
            if promoted {
                tracing::info!(word = %word.word, frequency = word.frequency, "Word auto-approved");
                report.newly_approved.push(word.word);
            }
        }

        if report.tracked > 0 {
            tracing::debug!(
                tracked = report.tracked,
                new_words = report.new_words,
                promoted = report.newly_approved.len(),
                "Tracked unknown words"
            );
        }
        Ok(report)
    }

    /// Force a word into the approved set
    pub async fn approve(&self, word: &str, ctx: &AuditContext) -> LexiconResult<ApprovalOutcome> {
        let key = normalize_word(word);
        let now = Utc::now();

        let result = self
            .store
            .modify(&key, |current| {
                let mut next = current.clone();
                let already_approved = !next.approve(now);
                let audit = NewAuditEvent::new(AuditEventType::WordApproved)
                    .by(ctx)
                    .details(json!({
                        "word": next.word,
                        "frequency": next.frequency,
                        "already_approved": already_approved,
                    }));
                (next, audit, already_approved)
            })
            .await?;

        let (word, already_approved) = result.ok_or_else(|| LexiconError::WordNotFound(key))?;
        tracing::info!(word = %word.word, actor = %ctx.actor, already_approved, "Word approved");
        Ok(ApprovalOutcome {
            word,
            already_approved,
        })
    }

    /// Delete a word outright, whatever its state
    pub async fn reject(&self, word: &str, ctx: &AuditContext) -> LexiconResult<TrackedWord> {
        let key = normalize_word(word);

        let removed = self
            .store
            .remove(&key, |current| {
                NewAuditEvent::new(AuditEventType::WordRejected)
                    .by(ctx)
                    .details(json!({
                        "word": current.word,
                        "frequency": current.frequency,
                        "was_approved": current.is_approved,
                    }))
            })
            .await?
            .ok_or_else(|| LexiconError::WordNotFound(key))?;

        tracing::info!(word = %removed.word, actor = %ctx.actor, "Word rejected");
        Ok(removed)
    }

    /// Words ordered by word. The export is audited before it is handed out.
    pub async fn export_words(&self, mode: ExportMode, ctx: &AuditContext) -> LexiconResult<Vec<TrackedWord>> {
        let mut words = self.store.snapshot().await;
        if mode == ExportMode::ApprovedOnly {
            words.retain(|w| w.is_approved);
        }

        self.audit
            .record_action(
                AuditEventType::WordsExported,
                ctx,
                json!({ "mode": mode.as_str(), "count": words.len() }),
            )
            .await?;

        tracing::info!(mode = mode.as_str(), count = words.len(), "Words exported");
        Ok(words)
    }

    /// Combine `records` with the store according to `mode`.
    ///
    /// Fails before touching anything if there are too many records or any
    /// record is malformed.
    pub async fn import_words(
        &self,
        records: Vec<WordRecord>,
        mode: ImportMode,
        ctx: &AuditContext,
    ) -> LexiconResult<ImportSummary> {
        self.check_import_size(records.len())?;

        let received = records.len();
        let mut incoming: BTreeMap<String, (u32, bool)> = BTreeMap::new();
        let mut skipped = 0;
        for record in records {
            let word = validate_import_word(&record.word)?;
            if mode == ImportMode::ApprovedOnly && !record.is_approved {
                skipped += 1;
                continue;
            }
            let frequency = clamp_frequency(record.frequency);
            incoming
                .entry(word)
                .and_modify(|(f, a)| {
                    *f = (*f).max(frequency);
                    *a |= record.is_approved;
                })
                .or_insert((frequency, record.is_approved));
        }

        self.apply_import(incoming, mode, received, skipped, "records", ctx)
            .await
    }

    /// Merge a plain word list. Invalid entries are skipped; valid ones enter
    /// with the promotion threshold as frequency.
    pub async fn import_wordlist(
        &self,
        words: Vec<String>,
        auto_approve: bool,
        ctx: &AuditContext,
    ) -> LexiconResult<ImportSummary> {
        self.check_import_size(words.len())?;

        let received = words.len();
        let frequency = self.policy.threshold();
        let mut incoming = BTreeMap::new();
        let mut skipped = 0;
        for raw in words {
            match validate_import_word(&raw) {
                Ok(word) => {
                    incoming.insert(word, (frequency, auto_approve));
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping word list entry");
                    skipped += 1;
                }
            }
        }

        self.apply_import(incoming, ImportMode::Merge, received, skipped, "wordlist", ctx)
            .await
    }

    fn check_import_size(&self, count: usize) -> LexiconResult<()> {
        if count > self.max_import_words {
            tracing::warn!(count, max = self.max_import_words, "Import rejected: too many words");
            return Err(LexiconError::ImportLimitExceeded {
                count,
                max: self.max_import_words,
            });
        }
        Ok(())
    }

    async fn apply_import(
        &self,
        incoming: BTreeMap<String, (u32, bool)>,
        mode: ImportMode,
        received: usize,
        skipped: usize,
        source: &str,
        ctx: &AuditContext,
    ) -> LexiconResult<ImportSummary> {
        let now = Utc::now();
        let imported = incoming.len();

        let audit = NewAuditEvent::new(AuditEventType::WordsImported)
            .by(ctx)
            .details(json!({
                "mode": mode.as_str(),
                "source": source,
                "received": received,
                "imported": imported,
                "skipped": skipped,
            }));

        self.store
            .bulk(|current| {
                let replace = mode == ImportMode::Replace;
                let upserts = incoming
                    .into_iter()
                    .map(|(word, (frequency, approved))| match current.get(&word) {
                        Some(existing) if !replace => {
                            let mut merged = existing.clone();
                            merged.frequency = merged.frequency.max(frequency);
                            merged.last_seen = now;
                            if approved {
                                merged.approve(now);
                            }
                            merged
                        }
                        _ => {
                            let mut fresh = TrackedWord::first_sighting(word, now);
                            fresh.frequency = frequency;
                            if approved {
                                fresh.approve(now);
                            }
                            fresh
                        }
                    })
                    .collect();

                let batch = WriteBatch {
                    clear_words: replace,
                    upserts,
                    audit: Some(audit),
                    ..Default::default()
                };
                (batch, ())
            })
            .await?;

        tracing::info!(mode = mode.as_str(), imported, skipped, actor = %ctx.actor, "Words imported");
        Ok(ImportSummary {
            mode,
            imported,
            skipped,
        })
    }

    /// Pending words, most frequent first, then most recently seen
    pub async fn list_pending(&self, limit: usize) -> Vec<TrackedWord> {
        let mut pending: Vec<TrackedWord> = self
            .store
            .snapshot()
            .await
            .into_iter()
            .filter(|w| !w.is_approved)
            .collect();
        pending.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| b.last_seen.cmp(&a.last_seen))
        });
        pending.truncate(limit.min(MAX_PENDING_PAGE));
        pending
    }

    /// Approved words ordered by word
    pub async fn list_approved(&self) -> Vec<TrackedWord> {
        self.store
            .snapshot()
            .await
            .into_iter()
            .filter(|w| w.is_approved)
            .collect()
    }

    pub async fn get_word(&self, word: &str) -> LexiconResult<TrackedWord> {
        let key = normalize_word(word);
        self.store
            .get(&key)
            .await
            .ok_or(LexiconError::WordNotFound(key))
    }

    pub async fn stats(&self) -> LexiconStats {
        let words = self.store.snapshot().await;
        let approved = words.iter().filter(|w| w.is_approved).count();
        LexiconStats {
            total: words.len(),
            approved,
            pending: words.len() - approved,
            threshold: self.policy.threshold(),
        }
    }

    /// Approved words, the only learned words used for correction
    pub async fn approved_vocabulary(&self) -> HashSet<String> {
        self.list_approved().await.into_iter().map(|w| w.word).collect()
    }
}
