//! Top-level driver (spec §4.J): wires tagging, recognition, estimation,
//! aggregation and pruning into the monolingual and parallel learning
//! pipelines, and owns the `tmpweights.w1x` named-resource lifecycle
//! (spec §5).

use crate::aggregator::{aggregate_monolingual, aggregate_parallel, external_sort, write_score_row};
use crate::config::{Config, Mode};
use crate::engine::metrics::{RecognitionMetrics, debug_trace_signature};
use crate::engine::{Fst, ambiguous_sites, lrlm};
use crate::errors::{LearnerError, Result};
use crate::estimator::{estimate_monolingual, estimate_parallel};
use crate::lm::ProcessLanguageModel;
use crate::oracle::CombinedPipeline;
use crate::oracle::process::{DefaultPipeline, PipelineConfig, WeightedPipeline};
use crate::pruner::{prune, remove_generalized};
use crate::rules_xml::{self, RulesDocument};
use crate::stats::RunStats;
use crate::token::{Token, tokens};
use crate::weights_xml::{WeightsDocument, parse_weights_xml};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

const PROGRESS_EVERY: u64 = 1000;

/// Removes the shared temporary weights file on every exit path (spec §5:
/// "on any exit path — success, error, interrupt — this file must be
/// removed").
struct TempWeightsGuard {
    path: PathBuf,
}

impl TempWeightsGuard {
    fn new(path: PathBuf) -> Self {
        TempWeightsGuard { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempWeightsGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                log::warn!("failed to remove temporary weights file {}: {e}", self.path.display());
            }
        }
    }
}

/// Apertium's standard per-pair naming convention; used to resolve the
/// binaries the config's CLI surface does not name individually (spec §6
/// states their existence and CLI are "part of the contract but outside
/// this spec" — these paths are a reasonable, documented convention
/// rather than a guess at arbitrary new configuration surface).
struct PairPaths {
    pair_data: PathBuf,
    prefix: String,
    source: String,
    target: String,
}

impl PairPaths {
    fn from_config(config: &Config) -> Self {
        PairPaths {
            pair_data: config.apertium_pair_data.clone(),
            prefix: config.fname_common_prefix.clone().unwrap_or_default(),
            source: config.source.clone(),
            target: config.target.clone(),
        }
    }

    fn file(&self, suffix: &str) -> PathBuf {
        self.pair_data.join(format!("{}{}-{}{}", self.prefix, self.source, self.target, suffix))
    }

    fn analyzer_bin(&self) -> PathBuf {
        self.pair_data.join(format!("{}{}.automorf.bin", self.prefix, self.source))
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            autobil_bin: self.file(".autobil.bin"),
            transfer_t1x: self.file(".t1x"),
            transfer_bin: self.file(".t1x.bin"),
            interchunk_t2x: self.file(".t2x"),
            interchunk_bin: self.file(".t2x.bin"),
            postchunk_t3x: self.file(".t3x"),
            postchunk_bin: self.file(".t3x.bin"),
            autogen_bin: self.pair_data.join(format!("{}{}.autogen.bin", self.prefix, self.target)),
        }
    }

    fn transfer_rules_path(&self) -> PathBuf {
        self.file(".t1x")
    }
}

/// Runs the morphological tagger once over the whole corpus file, returning
/// its stream-format output (spec §1: out of scope, invoked as a
/// black box).
fn run_tagger(analyzer_bin: &Path, corpus_path: &Path) -> Result<String> {
    let corpus = std::fs::read_to_string(corpus_path).map_err(|e| LearnerError::CorpusIo { path: corpus_path.to_path_buf(), source: e })?;
    let mut child = Command::new("lt-proc")
        .arg("-z")
        .arg(analyzer_bin)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| LearnerError::TranslatorFailure(format!("failed to spawn tagger: {e}")))?;
    {
        let stdin = child.stdin.as_mut().ok_or_else(|| LearnerError::TranslatorFailure("tagger has no stdin".into()))?;
        stdin.write_all(corpus.as_bytes()).map_err(LearnerError::Io)?;
    }
    let output = child.wait_with_output().map_err(LearnerError::Io)?;
    if !output.status.success() {
        return Err(LearnerError::TranslatorFailure(format!("tagger exited with {}", output.status)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Splits a tagged stream into sentences: a run of tokens up to and
/// including one carrying the `<sent>` tag (spec §6: "sentence boundary is
/// the occurrence of a token with tag `<sent>`").
fn split_sentences(tagged_text: &str) -> Vec<Vec<Token>> {
    let mut sentences = Vec::new();
    let mut current = Vec::new();
    for token in tokens(tagged_text) {
        let boundary = token.is_sentence_boundary();
        current.push(token);
        if boundary {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

fn build_default_pipeline(paths: &PairPaths) -> Result<DefaultPipeline> {
    DefaultPipeline::spawn(&paths.pipeline_config())
}

fn build_weighted_pipeline(paths: &PairPaths) -> Result<WeightedPipeline> {
    WeightedPipeline::spawn(paths.pipeline_config())
}

/// Component J, monolingual entry point.
pub fn learn_from_monolingual(config: &Config) -> Result<()> {
    let paths = PairPaths::from_config(config);
    let rules_doc = rules_xml::load(&paths.transfer_rules_path())?;
    let fst = Fst::build(rules_doc.fst_patterns.clone());

    let tagged = run_tagger(&paths.analyzer_bin(), &config.source_language_corpus)?;
    let sentences = split_sentences(&tagged);

    let tmp_weights = TempWeightsGuard::new(config.data_folder.join("tmpweights.w1x"));
    let rows_path = config.data_folder.join("scores.tsv");
    let sorted_rows_path = config.data_folder.join("scores.sorted.tsv");

    let lm_path = config
        .language_model
        .as_ref()
        .ok_or_else(|| LearnerError::Config("language_model is required in mono mode".into()))?;
    let lm = ProcessLanguageModel::load("query", lm_path)?;

    let mut oracle = CombinedPipeline { default: build_default_pipeline(&paths)?, weighted: build_weighted_pipeline(&paths)? };

    let mut stats = RunStats::new();
    let mut metrics = RecognitionMetrics::default();
    let pass_started = Instant::now();
    {
        let rows_file = std::fs::File::create(&rows_path).map_err(LearnerError::Io)?;
        let mut rows_writer = BufWriter::new(rows_file);

        for sentence in &sentences {
            stats.sentences_seen += 1;
            metrics.sentences += 1;
            let coverages = lrlm(sentence, &fst, &rules_doc.category_index, &mut stats);
            if coverages.is_empty() {
                stats.unrecognized_sentences += 1;
                metrics.unrecognized += 1;
                stats.maybe_log_progress(PROGRESS_EVERY);
                continue;
            }
            let coverage = &coverages[0];
            metrics.coverages_found += 1;
            debug_trace_signature(stats.sentences_seen as usize, &coverage.signature());
            let sites = ambiguous_sites(coverage, &rules_doc.ambiguous_groups);
            stats.ambiguous_sites += sites.len() as u64;

            let rows = estimate_monolingual(coverage, &sites, &rules_doc, &mut oracle, &lm, tmp_weights.path())?;
            for row in &rows {
                write_score_row(&mut rows_writer, row)?;
            }
            stats.maybe_log_progress(PROGRESS_EVERY);
        }
    }
    metrics.total = pass_started.elapsed();
    log::debug!("recognition pass: {metrics:?}");

    external_sort(&rows_path, &sorted_rows_path)?;

    let weights_path = config.data_folder.join("weights.w1x");
    {
        let weights_file = std::fs::File::create(&weights_path).map_err(LearnerError::Io)?;
        let mut writer = BufWriter::new(weights_file);
        aggregate_monolingual(&sorted_rows_path, &rules_doc, &mut writer, &mut stats)?;
    }

    write_pruned(&weights_path, &config.data_folder.join("weights.pruned.w1x"))?;

    log::info!(
        "monolingual run complete: {} sentences, {} unrecognized, {} ambiguous sites",
        stats.sentences_seen,
        stats.unrecognized_sentences,
        stats.ambiguous_sites
    );
    Ok(())
}

/// Component J, parallel entry point. Assumes the source and target
/// corpora are sentence-aligned one-per-line, the conventional layout for
/// a parallel training corpus.
pub fn learn_from_parallel(config: &Config) -> Result<()> {
    let paths = PairPaths::from_config(config);
    let rules_doc = rules_xml::load(&paths.transfer_rules_path())?;
    let fst = Fst::build(rules_doc.fst_patterns.clone());

    let tagged = run_tagger(&paths.analyzer_bin(), &config.source_language_corpus)?;
    let sentences = split_sentences(&tagged);

    let target_corpus = config
        .target_language_corpus
        .as_ref()
        .ok_or_else(|| LearnerError::Config("target_language_corpus is required in parallel mode".into()))?;
    let target_text = std::fs::read_to_string(target_corpus).map_err(|e| LearnerError::CorpusIo { path: target_corpus.clone(), source: e })?;
    let target_lines: Vec<&str> = target_text.lines().collect();

    let tmp_weights = TempWeightsGuard::new(config.data_folder.join("tmpweights.w1x"));
    let rows_path = config.data_folder.join("scores.tsv");
    let sorted_rows_path = config.data_folder.join("scores.sorted.tsv");

    let mut oracle = build_weighted_pipeline(&paths)?;

    let mut stats = RunStats::new();
    let mut metrics = RecognitionMetrics::default();
    let pass_started = Instant::now();
    {
        let rows_file = std::fs::File::create(&rows_path).map_err(LearnerError::Io)?;
        let mut rows_writer = BufWriter::new(rows_file);

        for (index, sentence) in sentences.iter().enumerate() {
            stats.sentences_seen += 1;
            metrics.sentences += 1;
            let Some(&reference) = target_lines.get(index) else {
                stats.unrecognized_sentences += 1;
                metrics.unrecognized += 1;
                continue;
            };
            let coverages = lrlm(sentence, &fst, &rules_doc.category_index, &mut stats);
            if coverages.is_empty() {
                stats.unrecognized_sentences += 1;
                metrics.unrecognized += 1;
                stats.maybe_log_progress(PROGRESS_EVERY);
                continue;
            }
            let coverage = &coverages[0];
            metrics.coverages_found += 1;
            debug_trace_signature(stats.sentences_seen as usize, &coverage.signature());
            let sites = ambiguous_sites(coverage, &rules_doc.ambiguous_groups);
            stats.ambiguous_sites += sites.len() as u64;

            let rows = estimate_parallel(&sites, &rules_doc, reference, &mut oracle, tmp_weights.path())?;
            for row in &rows {
                write_score_row(&mut rows_writer, row)?;
            }
            stats.maybe_log_progress(PROGRESS_EVERY);
        }
    }
    metrics.total = pass_started.elapsed();
    log::debug!("recognition pass: {metrics:?}");

    external_sort(&rows_path, &sorted_rows_path)?;

    let weights_path = config.data_folder.join("weights.w1x");
    {
        let weights_file = std::fs::File::create(&weights_path).map_err(LearnerError::Io)?;
        let mut writer = BufWriter::new(weights_file);
        aggregate_parallel(&sorted_rows_path, &rules_doc, &mut writer, &mut stats)?;
    }

    write_pruned(&weights_path, &config.data_folder.join("weights.pruned.w1x"))?;

    log::info!(
        "parallel run complete: {} sentences, {} unrecognized, {} ambiguous sites",
        stats.sentences_seen,
        stats.unrecognized_sentences,
        stats.ambiguous_sites
    );
    Ok(())
}

fn write_pruned(weights_path: &Path, pruned_path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(weights_path).map_err(LearnerError::Io)?;
    let doc: WeightsDocument = parse_weights_xml(&text, weights_path)?;
    let pruned = remove_generalized(&prune(&doc));
    std::fs::write(pruned_path, pruned.to_xml()).map_err(LearnerError::Io)
}

/// Supplemented diagnostic (grounded on the reference's `rlister.py`): one
/// line per rule, `index\tcomment\tpattern`.
pub fn list_rules(rules_doc: &RulesDocument) -> Vec<String> {
    rules_doc
        .rules
        .iter()
        .map(|rule| {
            let comment = rule.attrs.iter().find(|(k, _)| k == "comment").map(|(_, v)| v.as_str()).unwrap_or("-");
            format!("{}\t{}\t{}", rule.index, comment, rule.pattern.join("."))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sentences_on_sent_tag() {
        let tagged = "^foo<n>$ ^bar<vblex>$ ^.<sent>$ ^baz<n>$";
        let sentences = split_sentences(tagged);
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].len(), 3);
        assert_eq!(sentences[1].len(), 1);
    }

    #[test]
    fn list_rules_formats_index_comment_pattern() {
        let doc = rules_xml::parse(
            r#"<transfer-rules>
              <section-def-cats><def-cat n="noun"><cat-item tags="n"/></def-cat></section-def-cats>
              <section-rules><rule id="r0" comment="strip plural"><pattern><pattern-item n="noun"/></pattern></rule></section-rules>
            </transfer-rules>"#,
            Path::new("t.t1x"),
        )
        .unwrap();
        let lines = list_rules(&doc);
        assert_eq!(lines, vec!["0\tstrip plural\tnoun".to_string()]);
    }
}
