//! Subprocess-backed [`TranslatorOracle`] implementations.
//!
//! `DefaultPipeline` keeps all five translation stages (`lt-proc` →
//! `apertium-transfer` → `apertium-interchunk` → `apertium-postchunk` →
//! `lt-proc -g`) alive for the whole run and talks to the first/last stage
//! with the null-byte framing protocol (spec §4.F, §5).
//!
//! `WeightedPipeline` keeps every stage alive *except* transfer: transfer
//! is spawned fresh for each `translate_with_weights` call so it can load
//! the weights file that call names, then its output is fed into the
//! persistent interchunk → postchunk → autogen chain.

use super::{CHUNK_SUFFIX, TranslatorOracle, strip_decorations};
use crate::errors::{LearnerError, Result};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Filesystem locations of the binaries consumed by the translation
/// pipeline (spec §6: "Command-line tools named by the downstream
/// project... outside this spec").
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub autobil_bin: PathBuf,
    pub transfer_t1x: PathBuf,
    pub transfer_bin: PathBuf,
    pub interchunk_t2x: PathBuf,
    pub interchunk_bin: PathBuf,
    pub postchunk_t3x: PathBuf,
    pub postchunk_bin: PathBuf,
    pub autogen_bin: PathBuf,
}

fn spawn_piped(program: &str, args: &[&std::ffi::OsStr], stdin: Stdio) -> Result<Child> {
    Command::new(program)
        .args(args)
        .stdin(stdin)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| LearnerError::TranslatorFailure(format!("failed to spawn {program}: {e}")))
}

fn take_stdout(child: &mut Child) -> Result<ChildStdout> {
    child.stdout.take().ok_or_else(|| LearnerError::TranslatorFailure("child has no stdout pipe".into()))
}

fn take_stdin(child: &mut Child) -> Result<ChildStdin> {
    child.stdin.take().ok_or_else(|| LearnerError::TranslatorFailure("child has no stdin pipe".into()))
}

/// Writes `text` followed by the chunk sentinel and a flush (spec §5:
/// "each request writes the input followed by `\0`, flushes").
fn write_chunk<W: Write>(w: &mut W, text: &str) -> Result<()> {
    write!(w, "{text}{CHUNK_SUFFIX}").map_err(LearnerError::Io)?;
    w.write_all(&[0u8]).map_err(LearnerError::Io)?;
    w.flush().map_err(LearnerError::Io)?;
    Ok(())
}

/// Reads bytes from `r` until a `\0` sentinel (exclusive) or EOF. EOF
/// before a sentinel is a [`LearnerError::TranslatorFailure`] (spec §4.F:
/// "if the process exits, the wrapper re-raises").
fn read_until_null<R: Read>(r: &mut R) -> Result<String> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = r.read(&mut byte).map_err(LearnerError::Io)?;
        if n == 0 {
            return Err(LearnerError::TranslatorFailure(
                "pipeline stage closed before sentinel was observed".into(),
            ));
        }
        if byte[0] == 0 {
            break;
        }
        buf.push(byte[0]);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// The persistent five-stage chain used for weight-free translation.
pub struct DefaultPipeline {
    first_stdin: ChildStdin,
    last_stdout: ChildStdout,
    _chain: Vec<Child>,
}

impl DefaultPipeline {
    pub fn spawn(cfg: &PipelineConfig) -> Result<Self> {
        let mut autobil = spawn_piped(
            "lt-proc",
            &[std::ffi::OsStr::new("-b"), std::ffi::OsStr::new("-z"), cfg.autobil_bin.as_os_str()],
            Stdio::piped(),
        )?;
        let first_stdin = take_stdin(&mut autobil)?;
        let autobil_out = take_stdout(&mut autobil)?;

        let mut transfer = spawn_piped(
            "apertium-transfer",
            &[
                std::ffi::OsStr::new("-b"),
                std::ffi::OsStr::new("-z"),
                cfg.transfer_t1x.as_os_str(),
                cfg.transfer_bin.as_os_str(),
            ],
            Stdio::from(autobil_out),
        )?;
        let transfer_out = take_stdout(&mut transfer)?;

        let mut interchunk = spawn_piped(
            "apertium-interchunk",
            &[std::ffi::OsStr::new("-z"), cfg.interchunk_t2x.as_os_str(), cfg.interchunk_bin.as_os_str()],
            Stdio::from(transfer_out),
        )?;
        let interchunk_out = take_stdout(&mut interchunk)?;

        let mut postchunk = spawn_piped(
            "apertium-postchunk",
            &[std::ffi::OsStr::new("-z"), cfg.postchunk_t3x.as_os_str(), cfg.postchunk_bin.as_os_str()],
            Stdio::from(interchunk_out),
        )?;
        let postchunk_out = take_stdout(&mut postchunk)?;

        let mut autogen = spawn_piped(
            "lt-proc",
            &[std::ffi::OsStr::new("-g"), std::ffi::OsStr::new("-z"), cfg.autogen_bin.as_os_str()],
            Stdio::from(postchunk_out),
        )?;
        let last_stdout = take_stdout(&mut autogen)?;

        Ok(DefaultPipeline {
            first_stdin,
            last_stdout,
            _chain: vec![autobil, transfer, interchunk, postchunk, autogen],
        })
    }
}

impl TranslatorOracle for DefaultPipeline {
    fn translate_default(&mut self, chunk_text: &str) -> Result<String> {
        write_chunk(&mut self.first_stdin, chunk_text)?;
        let out = read_until_null(&mut self.last_stdout)?;
        Ok(strip_decorations(&out))
    }

    fn translate_with_weights(&mut self, _chunk_text: &str, _weights_xml_path: &Path) -> Result<String> {
        Err(LearnerError::TranslatorFailure(
            "DefaultPipeline does not support weighted translation; use WeightedPipeline".into(),
        ))
    }
}

/// The variant used when per-call weights must be picked up: transfer is
/// spawned fresh for each call instead of living in the persistent chain.
pub struct WeightedPipeline {
    autobil_stdin: ChildStdin,
    autobil_stdout: ChildStdout,
    interchunk_stdin: ChildStdin,
    autogen_stdout: ChildStdout,
    _autobil: Child,
    _chain_tail: Vec<Child>,
    cfg: PipelineConfig,
}

impl WeightedPipeline {
    pub fn spawn(cfg: PipelineConfig) -> Result<Self> {
        let mut autobil = spawn_piped(
            "lt-proc",
            &[std::ffi::OsStr::new("-b"), std::ffi::OsStr::new("-z"), cfg.autobil_bin.as_os_str()],
            Stdio::piped(),
        )?;
        let autobil_stdin = take_stdin(&mut autobil)?;
        let autobil_stdout = take_stdout(&mut autobil)?;

        let mut interchunk = spawn_piped(
            "apertium-interchunk",
            &[std::ffi::OsStr::new("-z"), cfg.interchunk_t2x.as_os_str(), cfg.interchunk_bin.as_os_str()],
            Stdio::piped(),
        )?;
        let interchunk_stdin = take_stdin(&mut interchunk)?;
        let interchunk_out = take_stdout(&mut interchunk)?;

        let mut postchunk = spawn_piped(
            "apertium-postchunk",
            &[std::ffi::OsStr::new("-z"), cfg.postchunk_t3x.as_os_str(), cfg.postchunk_bin.as_os_str()],
            Stdio::from(interchunk_out),
        )?;
        let postchunk_out = take_stdout(&mut postchunk)?;

        let mut autogen = spawn_piped(
            "lt-proc",
            &[std::ffi::OsStr::new("-g"), std::ffi::OsStr::new("-z"), cfg.autogen_bin.as_os_str()],
            Stdio::from(postchunk_out),
        )?;
        let autogen_stdout = take_stdout(&mut autogen)?;

        Ok(WeightedPipeline {
            autobil_stdin,
            autobil_stdout,
            interchunk_stdin,
            autogen_stdout,
            _autobil: autobil,
            _chain_tail: vec![interchunk, postchunk, autogen],
            cfg,
        })
    }
}

impl TranslatorOracle for WeightedPipeline {
    fn translate_default(&mut self, _chunk_text: &str) -> Result<String> {
        Err(LearnerError::TranslatorFailure(
            "WeightedPipeline does not support weight-free translation; use DefaultPipeline".into(),
        ))
    }

    fn translate_with_weights(&mut self, chunk_text: &str, weights_xml_path: &Path) -> Result<String> {
        write_chunk(&mut self.autobil_stdin, chunk_text)?;
        let bil_out = read_until_null(&mut self.autobil_stdout)?;

        // Short-lived transfer stage, respawned so it picks up the new
        // weights file (spec §4.F: "the weighted variant may be spawned
        // per call").
        let mut transfer = Command::new("apertium-transfer")
            .arg("-bw")
            .arg(weights_xml_path)
            .arg(&self.cfg.transfer_t1x)
            .arg(&self.cfg.transfer_bin)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| LearnerError::TranslatorFailure(format!("failed to spawn apertium-transfer: {e}")))?;
        {
            let stdin = transfer.stdin.as_mut().ok_or_else(|| LearnerError::TranslatorFailure("no stdin".into()))?;
            stdin.write_all(bil_out.as_bytes()).map_err(LearnerError::Io)?;
        }
        let output = transfer.wait_with_output().map_err(LearnerError::Io)?;
        if !output.status.success() {
            return Err(LearnerError::TranslatorFailure(format!(
                "apertium-transfer exited with {}",
                output.status
            )));
        }
        let transfer_out = String::from_utf8_lossy(&output.stdout).into_owned();

        write_chunk(&mut self.interchunk_stdin, &transfer_out)?;
        let out = read_until_null(&mut self.autogen_stdout)?;
        Ok(strip_decorations(&out))
    }
}
