use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    artifact::{Artifact, IdGenerator},
    compress::{
        engine::CompressionEngine,
        error::CompressError,
        inspect::size_kb,
        profile::{CompressionProfile, ProfileLadder},
    },
};

/// An uploaded document and the size it should be squeezed under.
#[derive(Debug)]
pub struct CompressionRequest {
    input: Artifact,
    target_kb: Option<u64>,
}

impl CompressionRequest {
    /// A missing or non-positive target selects single-shot mode.
    pub fn new(input: Artifact, target_kb: Option<i64>) -> Self {
        let target_kb = target_kb.filter(|t| *t > 0).map(|t| t as u64);
        Self { input, target_kb }
    }

    pub fn input(&self) -> &Path {
        self.input.path()
    }

    pub fn target_kb(&self) -> Option<u64> {
        self.target_kb
    }
}

/// Parses a caller-supplied target. Anything that is not a number yields `None`;
/// fractional values are truncated.
pub fn parse_target(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
    })
}

/// One measured engine run.
#[derive(Debug, Clone, Copy)]
pub struct CompressionAttempt<'a> {
    pub index: usize,
    pub profile: &'a CompressionProfile,
    pub achieved_kb: u64,
}

/// The accepted output of a run. Dropping it deletes the output file.
#[derive(Debug)]
pub struct CompressionResult {
    artifact: Artifact,
    pub achieved_kb: u64,
    pub profile_index: usize,
    pub profile_name: &'static str,
    pub met_target: bool,
    pub attempts: usize,
}

impl CompressionResult {
    pub fn path(&self) -> &Path {
        self.artifact.path()
    }

    pub fn into_artifact(self) -> Artifact {
        self.artifact
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Accept { met_target: bool },
    Advance(usize),
}

fn decide(ladder: &ProfileLadder, target_kb: Option<u64>, attempt: &CompressionAttempt<'_>) -> Step {
    let Some(target) = target_kb else {
        return Step::Accept { met_target: true };
    };
    if attempt.achieved_kb <= target {
        return Step::Accept { met_target: true };
    }
    match ladder.next(attempt.index) {
        Some(next) => Step::Advance(next),
        None => Step::Accept { met_target: false },
    }
}

/// Drives the engine up the profile ladder until the output fits the target.
///
/// Attempts never revisit a milder profile, so a run makes at most
/// `ladder.len()` engine calls. All attempts write to one output path; the
/// survivor is handed back in the [`CompressionResult`], and any failure drops
/// (and deletes) it.
pub struct Controller {
    ladder: ProfileLadder,
    engine: Arc<dyn CompressionEngine>,
    output_dir: PathBuf,
    ids: Arc<dyn IdGenerator>,
}

impl Controller {
    pub fn new(
        ladder: ProfileLadder,
        engine: Arc<dyn CompressionEngine>,
        output_dir: impl Into<PathBuf>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            ladder,
            engine,
            output_dir: output_dir.into(),
            ids,
        }
    }

    pub fn ladder(&self) -> &ProfileLadder {
        &self.ladder
    }

    #[instrument(
        name = "compress",
        skip_all,
        fields(input = %request.input().display(), target_kb = ?request.target_kb())
    )]
    pub async fn run(
        &self,
        request: &CompressionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompressionResult, CompressError> {
        let target_kb = request.target_kb();
        let output = Artifact::in_dir(&self.output_dir, "compressed", "pdf", self.ids.as_ref());
        let mut index = self.ladder.index_for(target_kb);
        let mut attempts = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(CompressError::Cancelled);
            }

            let profile = self.ladder.get(index);
            output
                .clear()
                .await
                .map_err(|source| CompressError::Prepare {
                    path: output.path().to_path_buf(),
                    source,
                })?;

            attempts += 1;
            debug!(attempt = attempts, profile = profile.name, "compressing");

            let compressed = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CompressError::Cancelled),
                r = self.engine.compress(request.input(), profile, output.path()) => r,
            };
            if let Err(source) = compressed {
                error!(profile = profile.name, error = %source, "engine failed");
                return Err(CompressError::Engine {
                    profile: profile.name,
                    source,
                });
            }

            let achieved_kb =
                size_kb(output.path())
                    .await
                    .map_err(|source| CompressError::Measurement {
                        path: output.path().to_path_buf(),
                        source,
                    })?;

            let attempt = CompressionAttempt {
                index,
                profile,
                achieved_kb,
            };

            match decide(&self.ladder, target_kb, &attempt) {
                Step::Accept { met_target } => {
                    if met_target {
                        info!(achieved_kb, profile = profile.name, attempts, "accepted");
                    } else {
                        warn!(
                            achieved_kb,
                            profile = profile.name,
                            attempts,
                            "ladder exhausted above target"
                        );
                    }
                    return Ok(CompressionResult {
                        artifact: output,
                        achieved_kb,
                        profile_index: index,
                        profile_name: profile.name,
                        met_target,
                        attempts,
                    });
                }
                Step::Advance(next) => {
                    debug!(achieved_kb, from = index, to = next, "over target, escalating");
                    index = next;
                }
            }
        }
    }
}
