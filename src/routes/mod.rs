//! Route modules for the OCR lexicon server

pub mod admin;
pub mod health;
pub mod learning;
pub mod ocr;
