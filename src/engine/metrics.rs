//! Opt-in timing/debug metrics for a single recognition pass.
//!
//! Kept as a plain, separate struct so the coverage search's hot path
//! never has to pay for metrics collection unless a caller asks for it
//! (the same separation the reference engine crate uses for its own
//! `RunMetrics`/`PassMetrics`).

use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct RecognitionMetrics {
    pub total: Duration,
    pub sentences: usize,
    pub coverages_found: usize,
    pub unrecognized: usize,
}

/// Debug-trace a coverage's signature when `TWLEARN_DEBUG_COVERAGE` is set,
/// mirroring the `RUSTLING_DEBUG_RULES` convention the rest of the pack
/// uses for opt-in stderr tracing.
pub fn debug_trace_signature(sentence_index: usize, signature: &[usize]) {
    if std::env::var_os("TWLEARN_DEBUG_COVERAGE").is_some() {
        eprintln!("[coverage] sentence={sentence_index} signature={signature:?}");
    }
}
