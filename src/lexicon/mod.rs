//! Auto-learning dictionary
//!
//! Unknown tokens from OCR output are counted per word. Once a word has been
//! seen often enough it is promoted to the approved set, which in turn feeds
//! dictionary-assisted correction of later requests.
//!
//! - `tracker`: token extraction and occurrence recording
//! - `policy`: promotion threshold
//! - `store`: concurrent in-process view over the storage backend
//! - `service`: approve/reject/import/export/list operations with audit
//! - `corrector`: fuzzy correction against baseline + approved words

mod baseline;
mod candidate;
mod corrector;
mod policy;
mod service;
mod store;
mod tracker;
mod types;

pub use baseline::Vocabulary;
pub use candidate::{CandidateFilter, WordShapeFilter};
pub use corrector::{similarity, Correction, DictionaryCorrector, DEFAULT_MIN_SIMILARITY};
pub use policy::PromotionPolicy;
pub use service::{validate_import_word, LexiconResult, LexiconService, LexiconSettings, MAX_PENDING_PAGE};
pub use store::WordStore;
pub use tracker::{tokenize, WordTracker};
pub use types::*;
