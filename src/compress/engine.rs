use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use tokio::{io::AsyncReadExt, process::Command};
use tracing::{debug, warn};

use crate::compress::{error::EngineError, profile::CompressionProfile};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest diagnostic (in chars) kept from the engine's stderr.
const DIAGNOSTIC_LIMIT: usize = 4096;

/// An opaque codec that rewrites `input` into `output` using `profile`.
///
/// On `Ok(())` the output file exists. On error the output may be missing or
/// partial; the caller owns its cleanup.
#[async_trait]
pub trait CompressionEngine: Send + Sync + 'static {
    async fn compress(
        &self,
        input: &Path,
        profile: &CompressionProfile,
        output: &Path,
    ) -> Result<(), EngineError>;
}

/// Runs Ghostscript's `pdfwrite` device as a child process.
///
/// Arguments are passed as a list straight to the process, never through a
/// shell. The child is killed if it outlives the timeout or if the
/// compression future is dropped.
#[derive(Debug, Clone)]
pub struct Ghostscript {
    program: PathBuf,
    timeout: Duration,
}

impl Default for Ghostscript {
    fn default() -> Self {
        Self::new("gs", DEFAULT_TIMEOUT)
    }
}

impl Ghostscript {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn args(profile: &CompressionProfile, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-sDEVICE=pdfwrite",
            "-dCompatibilityLevel=1.4",
            "-dNOPAUSE",
            "-dQUIET",
            "-dBATCH",
            "-dSAFER",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        args.push(format!("-dPDFSETTINGS=/{}", profile.preset.as_str()).into());

        if let Some(dpi) = profile.resolution {
            for kind in ["Color", "Gray", "Mono"] {
                args.push(format!("-dDownsample{kind}Images=true").into());
                args.push(format!("-d{kind}ImageResolution={dpi}").into());
            }
        }

        let mut out = OsString::from("-sOutputFile=");
        out.push(output.as_os_str());
        args.push(out);
        args.push(input.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl CompressionEngine for Ghostscript {
    async fn compress(
        &self,
        input: &Path,
        profile: &CompressionProfile,
        output: &Path,
    ) -> Result<(), EngineError> {
        let mut child = Command::new(&self.program)
            .args(Self::args(profile, input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        debug!(pid = child.id(), profile = profile.name, "engine started");

        let mut stderr = child.stderr.take();
        let run = async {
            let mut diagnostic = Vec::new();
            let read = async {
                match stderr.as_mut() {
                    Some(pipe) => pipe.read_to_end(&mut diagnostic).await,
                    None => Ok(0),
                }
            };
            let (status, read) = tokio::join!(child.wait(), read);
            if let Err(err) = read {
                warn!(%err, "failed to read engine stderr");
            }
            status.map(|status| (status, diagnostic))
        };

        let outcome = tokio::time::timeout(self.timeout, run).await;

        let (status, diagnostic) = match outcome {
            Ok(result) => result?,
            Err(_) => {
                // kill() also reaps, so no zombie outlives the request.
                if let Err(err) = child.kill().await {
                    warn!(%err, "failed to kill timed-out engine");
                }
                return Err(EngineError::Timeout(self.timeout));
            }
        };

        if !status.success() {
            return Err(EngineError::Exit {
                status,
                diagnostic: summarize(&diagnostic),
            });
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.is_file() => Ok(()),
            _ => Err(EngineError::MissingOutput(output.to_path_buf())),
        }
    }
}

fn summarize(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.is_empty() {
        return "no diagnostic output".to_string();
    }
    text.chars().take(DIAGNOSTIC_LIMIT).collect()
}
