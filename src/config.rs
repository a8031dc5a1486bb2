//! Configuration management for the OCR lexicon server

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::lexicon::{LexiconSettings, DEFAULT_FREQUENCY_THRESHOLD, DEFAULT_MIN_SIMILARITY, MAX_IMPORT_WORDS};
use crate::ocr::{OcrEngineKind, OcrLanguage, OcrServiceConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ocr: OcrServiceConfig,
    pub learning: LearningConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct LearningConfig {
    pub frequency_threshold: u32,
    pub max_import_words: usize,
    /// Correct recognized text against baseline + approved words
    pub dictionary_correction: bool,
    pub correction_min_similarity: f64,
    /// Default for old-orthography normalization when a request does not say
    pub spelling_normalization: bool,
    /// Extra newline-separated baseline words
    pub baseline_dictionary_path: Option<PathBuf>,
}

impl LearningConfig {
    pub fn lexicon_settings(&self) -> LexiconSettings {
        LexiconSettings {
            frequency_threshold: self.frequency_threshold,
            max_import_words: self.max_import_words,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Require `X-API-Key` on OCR endpoints
    pub api_keys_enabled: bool,
    /// Static keys accepted besides the stored ones
    pub api_keys: Vec<String>,
    /// Master `X-Admin-Key`; admin endpoints only accept stored admin keys when unset
    pub admin_master_key: Option<String>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                url: "sqlite:./data/ocr_lexicon.db".to_string(),
            },
            ocr: OcrServiceConfig::default(),
            learning: LearningConfig {
                frequency_threshold: DEFAULT_FREQUENCY_THRESHOLD,
                max_import_words: MAX_IMPORT_WORDS,
                dictionary_correction: true,
                correction_min_similarity: DEFAULT_MIN_SIMILARITY,
                spelling_normalization: false,
                baseline_dictionary_path: None,
            },
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars { lookup: &lookup };
        let defaults = Config::default();

        let engines = match vars.get("OCR_ENGINES") {
            Some(raw) => parse_engines(&raw)?,
            None => defaults.ocr.engines.clone(),
        };
        let default_language = match vars.get("OCR_DEFAULT_LANGUAGE") {
            Some(raw) => OcrLanguage::parse(&raw).map_err(|_| ConfigError::Invalid {
                var: "OCR_DEFAULT_LANGUAGE",
                value: raw,
            })?,
            None => defaults.ocr.default_language,
        };

        let frequency_threshold: u32 =
            vars.parse("LEARNING_FREQUENCY_THRESHOLD", defaults.learning.frequency_threshold)?;
        if frequency_threshold == 0 {
            return Err(ConfigError::Invalid {
                var: "LEARNING_FREQUENCY_THRESHOLD",
                value: "0".to_string(),
            });
        }
        let correction_min_similarity: f64 = vars.parse(
            "CORRECTION_MIN_SIMILARITY",
            defaults.learning.correction_min_similarity,
        )?;
        if !(0.0..=1.0).contains(&correction_min_similarity) {
            return Err(ConfigError::Invalid {
                var: "CORRECTION_MIN_SIMILARITY",
                value: correction_min_similarity.to_string(),
            });
        }

        Ok(Config {
            server: ServerConfig {
                host: vars.get("SERVER_HOST").unwrap_or(defaults.server.host),
                port: vars.parse("SERVER_PORT", defaults.server.port)?,
            },
            database: DatabaseConfig {
                url: vars.get("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            ocr: OcrServiceConfig {
                engines,
                tesseract_cmd: vars.get("TESSERACT_CMD").unwrap_or(defaults.ocr.tesseract_cmd),
                pdftoppm_cmd: vars.get("PDFTOPPM_CMD").unwrap_or(defaults.ocr.pdftoppm_cmd),
                paddle_url: vars.get("PADDLE_OCR_URL").unwrap_or(defaults.ocr.paddle_url),
                default_language,
                pdf_dpi: vars.parse("PDF_DPI", defaults.ocr.pdf_dpi)?,
                pdf_max_pages: vars.parse("PDF_MAX_PAGES", defaults.ocr.pdf_max_pages)?,
                pdf_workers: vars.parse("PDF_WORKERS", defaults.ocr.pdf_workers)?,
                max_image_dimension: vars.parse("MAX_IMAGE_DIMENSION", defaults.ocr.max_image_dimension)?,
                max_file_size: vars.parse("MAX_FILE_SIZE", defaults.ocr.max_file_size)?,
            },
            learning: LearningConfig {
                frequency_threshold,
                max_import_words: vars.parse("LEARNING_MAX_IMPORT_WORDS", defaults.learning.max_import_words)?,
                dictionary_correction: vars.flag("DICTIONARY_CORRECTION", defaults.learning.dictionary_correction)?,
                correction_min_similarity,
                spelling_normalization: vars.flag("SPELLING_NORMALIZATION", defaults.learning.spelling_normalization)?,
                baseline_dictionary_path: vars.get("BASELINE_DICTIONARY_PATH").map(PathBuf::from),
            },
            auth: AuthConfig {
                api_keys_enabled: vars.flag("API_KEYS_ENABLED", false)?,
                api_keys: vars
                    .get("API_KEYS")
                    .map(|raw| {
                        raw.split(',')
                            .map(str::trim)
                            .filter(|k| !k.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
                admin_master_key: vars.get("ADMIN_MASTER_KEY"),
            },
        })
    }
}

struct Vars<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Vars<'_> {
    /// Set and non-blank value
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { var: name, value: raw }),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.get(name) {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid { var: name, value: raw }),
            },
            None => Ok(default),
        }
    }
}

fn parse_engines(raw: &str) -> Result<Vec<OcrEngineKind>, ConfigError> {
    let mut engines = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let engine = OcrEngineKind::parse(name).ok_or_else(|| ConfigError::Invalid {
            var: "OCR_ENGINES",
            value: raw.to_string(),
        })?;
        if !engines.contains(&engine) {
            engines.push(engine);
        }
    }
    Ok(engines)
}
