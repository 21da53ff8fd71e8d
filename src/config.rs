//! Driver configuration (spec §6's CLI surface): one TOML file, keys as
//! specified, validated eagerly so a missing key or missing file produces
//! a diagnostic naming the file (spec §6: "Exit code non-zero on missing
//! required key or missing file").

use crate::errors::{LearnerError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Mono,
    Parallel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mode: Mode,
    pub apertium_pair_name: String,
    pub apertium_pair_data: PathBuf,
    pub source: String,
    pub target: String,
    pub source_language_corpus: PathBuf,
    #[serde(default)]
    pub target_language_corpus: Option<PathBuf>,
    #[serde(default)]
    pub language_model: Option<PathBuf>,
    pub data_folder: PathBuf,
    #[serde(default)]
    pub fname_common_prefix: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path).map_err(|e| LearnerError::CorpusIo { path: path.to_path_buf(), source: e })?;
        let config: Config = toml::from_str(&text).map_err(|e| LearnerError::Config(format!("{path:?}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.mode {
            Mode::Mono => {
                if self.language_model.is_none() {
                    return Err(LearnerError::Config("language_model is required in mono mode".into()));
                }
            }
            Mode::Parallel => {
                if self.target_language_corpus.is_none() {
                    return Err(LearnerError::Config("target_language_corpus is required in parallel mode".into()));
                }
            }
        }
        require_exists(&self.apertium_pair_data)?;
        require_exists(&self.source_language_corpus)?;
        if let Some(target_corpus) = &self.target_language_corpus {
            require_exists(target_corpus)?;
        }
        if let Some(lm) = &self.language_model {
            require_exists(lm)?;
        }
        require_exists(&self.data_folder)?;
        Ok(())
    }
}

fn require_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(LearnerError::Config(format!("required path does not exist: {}", path.display())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_missing_required_key() {
        let toml_text = r#"
            mode = "mono"
            apertium_pair_name = "en-es"
            apertium_pair_data = "."
            source = "en"
            target = "es"
            source_language_corpus = "."
            data_folder = "."
        "#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, toml_text).unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, LearnerError::Config(_)));
    }

    #[test]
    fn accepts_well_formed_mono_config() {
        let dir = tempfile::tempdir().unwrap();
        let lm_path = dir.path().join("model.bin");
        std::fs::write(&lm_path, b"fake").unwrap();

        let toml_text = format!(
            r#"
            mode = "mono"
            apertium_pair_name = "en-es"
            apertium_pair_data = "{dir}"
            source = "en"
            target = "es"
            source_language_corpus = "{dir}"
            language_model = "{lm}"
            data_folder = "{dir}"
            "#,
            dir = dir.path().display(),
            lm = lm_path.display(),
        );
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(toml_text.as_bytes()).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.mode, Mode::Mono);
    }
}
