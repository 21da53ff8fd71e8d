//! Opt-in run statistics.
//!
//! Mirrors the reference engine's separation of hot-path logic from a
//! plain counters struct: recoverable, data-shaped problems (spec §7)
//! are tallied here rather than threaded through `Result`.

#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub sentences_seen: u64,
    pub unrecognized_sentences: u64,
    pub empty_category_tokens: u64,
    pub malformed_score_rows: u64,
    pub ambiguous_sites: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs a progress line; call this every `every` sentences.
    pub fn maybe_log_progress(&self, every: u64) {
        if every != 0 && self.sentences_seen % every == 0 {
            log::info!(
                "progress: {} sentences, {} unrecognized, {} empty-category tokens, {} ambiguous sites",
                self.sentences_seen,
                self.unrecognized_sentences,
                self.empty_category_tokens,
                self.ambiguous_sites
            );
        }
    }
}
