use std::{io, path::Path};

const KB: u64 = 1024;

/// Size of the file at `path` in kilobytes, rounded to the nearest whole KB.
///
/// Only metadata is read. A missing path or a non-file is an error.
pub async fn size_kb(path: &Path) -> io::Result<u64> {
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        ));
    }
    Ok(round_kb(meta.len()))
}

pub fn round_kb(bytes: u64) -> u64 {
    bytes.saturating_add(KB / 2) / KB
}
