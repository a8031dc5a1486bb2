//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::audit::AuditLog;
use crate::config::Config;
use crate::lexicon::{DictionaryCorrector, LexiconService, Vocabulary, WordStore, WordTracker};
use crate::ocr::OcrService;
use crate::persistence::{SqliteBackend, StorageBackend, StorageError};
use crate::text::SpellingNormalizer;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to load baseline dictionary: {0}")]
    BaselineDictionary(#[from] std::io::Error),

    #[error("Failed to load learned words: {0}")]
    WordStore(#[from] StorageError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    lexicon: LexiconService,
    ocr: OcrService,
    corrector: DictionaryCorrector,
    normalizer: SpellingNormalizer,
}

impl AppState {
    /// Create the production state: SQLite-backed lexicon and the configured OCR engines
    pub async fn new(config: Config, db: SqlitePool) -> Result<Self, StateError> {
        let backend: Arc<dyn StorageBackend> = Arc::new(SqliteBackend::new(db.clone()));
        let ocr = OcrService::new(config.ocr.clone());
        Self::from_parts(config, db, backend, ocr).await
    }

    /// Assemble the state over an explicit word/audit backend and OCR service
    pub async fn from_parts(
        config: Config,
        db: SqlitePool,
        backend: Arc<dyn StorageBackend>,
        ocr: OcrService,
    ) -> Result<Self, StateError> {
        let vocabulary = Arc::new(match &config.learning.baseline_dictionary_path {
            Some(path) => Vocabulary::from_file(path)?,
            None => Vocabulary::builtin(),
        });

        let store = WordStore::open(backend.clone()).await?;
        tracing::info!(
            words = store.len().await,
            baseline = vocabulary.len(),
            threshold = config.learning.frequency_threshold,
            "Learning dictionary loaded"
        );

        let lexicon = LexiconService::new(
            store,
            AuditLog::new(backend),
            WordTracker::new(vocabulary.clone()),
            config.learning.lexicon_settings(),
        );
        let corrector = DictionaryCorrector::new(vocabulary, config.learning.correction_min_similarity);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                lexicon,
                ocr,
                corrector,
                normalizer: SpellingNormalizer::new(),
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the learning dictionary
    pub fn lexicon(&self) -> &LexiconService {
        &self.inner.lexicon
    }

    pub fn audit(&self) -> &AuditLog {
        self.inner.lexicon.audit()
    }

    pub fn ocr(&self) -> &OcrService {
        &self.inner.ocr
    }

    pub fn corrector(&self) -> &DictionaryCorrector {
        &self.inner.corrector
    }

    pub fn normalizer(&self) -> &SpellingNormalizer {
        &self.inner.normalizer
    }

    /// Close the database pool once in-flight requests have drained
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down application state...");
        self.inner.db.close().await;
    }
}
