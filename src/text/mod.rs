//! Text post-processing applied to recognized OCR output

mod spelling;

pub use spelling::{Normalization, SpellingNormalizer};
