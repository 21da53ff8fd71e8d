//! Error types for the learner.
//!
//! Per the fatal/recoverable split: configuration, I/O and subprocess
//! breakage are fatal and propagated as [`LearnerError`]. Data-shaped
//! problems (unrecognized sentences, malformed score rows, empty
//! categories) are not errors at all — they are counted in
//! [`crate::stats::RunStats`] and logged so large corpus runs stay
//! productive.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LearnerError {
    #[error("failed to parse rules file {path}: {source}")]
    BadRulesXml { path: PathBuf, source: roxmltree::Error },

    #[error("rules file {path} is missing required section or attribute: {detail}")]
    RulesSchema { path: PathBuf, detail: String },

    #[error("corpus I/O error on {path}: {source}")]
    CorpusIo { path: PathBuf, source: std::io::Error },

    #[error("translator process failed: {0}")]
    TranslatorFailure(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),
}

pub type Result<T> = std::result::Result<T, LearnerError>;
