use std::{io, path::PathBuf, process::ExitStatus, time::Duration};

use thiserror::Error;

/// Failures of a single engine invocation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine binary could not be started.
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The engine ran past its deadline and was killed.
    #[error("engine timed out after {0:?}")]
    Timeout(Duration),

    /// The engine exited unsuccessfully.
    #[error("engine exited with {status}: {diagnostic}")]
    Exit {
        status: ExitStatus,
        diagnostic: String,
    },

    /// Exit status 0 but nothing was written.
    #[error("engine reported success but wrote no output to {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("engine I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Terminal failures of a controller run.
#[derive(Debug, Error)]
pub enum CompressError {
    #[error("compression with profile `{profile}` failed: {source}")]
    Engine {
        profile: &'static str,
        #[source]
        source: EngineError,
    },

    /// The output vanished between a successful engine run and the size check.
    #[error("could not measure {}: {source}", .path.display())]
    Measurement {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The output slot could not be prepared for the next attempt.
    #[error("could not prepare output {}: {source}", .path.display())]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("compression cancelled")]
    Cancelled,
}

/// Coarse classification of a [`CompressError`] for callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Engine,
    Measurement,
    Cancelled,
}

impl CompressError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CompressError::Engine { .. } => FailureKind::Engine,
            CompressError::Measurement { .. } | CompressError::Prepare { .. } => {
                FailureKind::Measurement
            }
            CompressError::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// Ladder construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LadderError {
    #[error("profile ladder is empty")]
    Empty,

    #[error("profile `{name}` has rank {rank}, expected {expected}")]
    OutOfOrder {
        name: &'static str,
        rank: usize,
        expected: usize,
    },

    #[error("aggressive band ({aggressive_max_kb} KB) must be below the mid band ({mid_max_kb} KB)")]
    InvertedBands {
        aggressive_max_kb: u64,
        mid_max_kb: u64,
    },
}
