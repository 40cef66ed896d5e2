//! Request-scoped temporary files and the id generators that name them.
//!
//! Every upload and every compression output lives in an [`Artifact`]. The artifact
//! owns its path and removes the file when dropped, so success, error and client
//! disconnect paths all clean up the same way. Names come from an [`IdGenerator`]
//! owned by whoever creates the artifact, which keeps concurrent requests from
//! colliding in the shared working directories.

use std::{
    io,
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicU64, Ordering},
};

use tracing::{debug, warn};
use uuid::Uuid;

/// Produces names that are unique for the lifetime of the process.
pub trait IdGenerator: Send + Sync + 'static {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Monotonic counter, prefixed with the process id so restarts never reuse a name
/// that an earlier process may have left behind.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}-{}", self.prefix, process::id(), n)
    }
}

/// A transient file that is deleted on drop.
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    /// Takes ownership of `path`. Nothing is created on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Allocates `dir/<prefix>-<id>.<ext>`.
    pub fn in_dir(dir: &Path, prefix: &str, ext: &str, ids: &dyn IdGenerator) -> Self {
        Self::new(dir.join(format!("{prefix}-{}.{ext}", ids.next_id())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file if it exists, keeping ownership of the path.
    pub async fn clear(&self) -> io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed artifact"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.path.display(), %err, "failed to remove artifact"),
        }
    }
}
