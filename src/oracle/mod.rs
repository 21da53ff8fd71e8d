//! Translator oracle client (spec §4.F): drives the external
//! translate-with-weights pipeline as a chain of long-lived subprocesses
//! connected by a null-byte-flush framing protocol.

pub mod process;

use crate::errors::Result;
use std::path::Path;

/// Opaque contract over the external translator (spec §4.F). Two
/// implementations exist below: one backs the persistent five-stage
/// default pipeline, the other respawns the transfer stage per call so it
/// can pick up a fresh weights file.
pub trait TranslatorOracle {
    fn translate_default(&mut self, chunk_text: &str) -> Result<String>;
    fn translate_with_weights(&mut self, chunk_text: &str, weights_xml_path: &Path) -> Result<String>;
}

/// Appended to every outgoing chunk before the null-byte sentinel, matching
/// the downstream pipeline's own chunk-boundary marker.
pub(crate) const CHUNK_SUFFIX: &str = "[][\n]";

/// Strips the apertium decoration characters and any trailing chunk
/// sentinel from a pipeline stage's output (spec §4.F).
pub(crate) fn strip_decorations(raw: &str) -> String {
    let trimmed = raw.strip_suffix(CHUNK_SUFFIX).unwrap_or(raw);
    trimmed.chars().filter(|c| !matches!(c, '@' | '#' | '~' | '*')).collect()
}

/// Glues a weight-free pipeline and a weighted pipeline behind one
/// [`TranslatorOracle`], since the estimator needs both operations within
/// the same sentence's processing (spec §4.G calls `translate_default` for
/// every part, then `translate_with_weights` for the varying part).
pub struct CombinedPipeline<D, W> {
    pub default: D,
    pub weighted: W,
}

impl<D: TranslatorOracle, W: TranslatorOracle> TranslatorOracle for CombinedPipeline<D, W> {
    fn translate_default(&mut self, chunk_text: &str) -> Result<String> {
        self.default.translate_default(chunk_text)
    }

    fn translate_with_weights(&mut self, chunk_text: &str, weights_xml_path: &Path) -> Result<String> {
        self.weighted.translate_with_weights(chunk_text, weights_xml_path)
    }
}
