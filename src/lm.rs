//! Language-model oracle (spec §6): `logscore(text, bos, eos) -> f64` plus
//! model loading from a path. The spec explicitly leaves the scorer
//! pluggable ("the implementer may substitute any n-gram scorer"); this
//! module provides the trait plus a subprocess-backed default that shells
//! out to a configurable scorer command, mirroring the translator oracle's
//! subprocess idiom rather than vendoring an n-gram model implementation.

use crate::errors::{LearnerError, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};

pub trait LanguageModel {
    fn logscore(&self, text: &str, bos: bool, eos: bool) -> Result<f64>;
}

/// Invokes an external scorer binary (e.g. a `kenlm`-compatible `query`
/// tool) once per call, passing the text on stdin and reading a single
/// float from stdout.
pub struct ProcessLanguageModel {
    scorer_bin: PathBuf,
    model_path: PathBuf,
}

impl ProcessLanguageModel {
    pub fn load(scorer_bin: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Result<Self> {
        let model_path = model_path.into();
        if !model_path.exists() {
            return Err(LearnerError::Config(format!("language model not found at {}", model_path.display())));
        }
        Ok(ProcessLanguageModel { scorer_bin: scorer_bin.into(), model_path })
    }
}

impl LanguageModel for ProcessLanguageModel {
    fn logscore(&self, text: &str, bos: bool, eos: bool) -> Result<f64> {
        use std::io::Write;
        let mut cmd = Command::new(&self.scorer_bin);
        cmd.arg("--model").arg(&self.model_path);
        if bos {
            cmd.arg("--bos");
        }
        if eos {
            cmd.arg("--eos");
        }
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| LearnerError::TranslatorFailure(format!("failed to spawn scorer: {e}")))?;
        child
            .stdin
            .take()
            .ok_or_else(|| LearnerError::TranslatorFailure("scorer has no stdin".into()))?
            .write_all(text.as_bytes())
            .map_err(LearnerError::Io)?;
        let output = child.wait_with_output().map_err(LearnerError::Io)?;
        if !output.status.success() {
            return Err(LearnerError::TranslatorFailure(format!("scorer exited with {}", output.status)));
        }
        let raw = String::from_utf8_lossy(&output.stdout);
        raw.trim()
            .parse::<f64>()
            .map_err(|e| LearnerError::TranslatorFailure(format!("scorer produced non-numeric output: {e}")))
    }
}

/// In-memory fake used by estimator tests, returning a fixed score per
/// exact input text.
#[cfg(test)]
pub struct FixedLanguageModel {
    pub scores: std::collections::HashMap<String, f64>,
}

#[cfg(test)]
impl LanguageModel for FixedLanguageModel {
    fn logscore(&self, text: &str, _bos: bool, _eos: bool) -> Result<f64> {
        self.scores
            .get(text)
            .copied()
            .ok_or_else(|| LearnerError::TranslatorFailure(format!("no fixed score for {text:?}")))
    }
}
