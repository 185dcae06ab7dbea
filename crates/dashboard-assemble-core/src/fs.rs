use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{AssembleError, AssembleResult};

/// Writes `content` to `path` via a temp file in the same directory plus an
/// atomic rename, so a failed write never leaves a truncated document. When
/// `backup` is set and the target already exists, the previous document is
/// kept as `<path>.bak` first.
pub fn write_atomic(path: &Path, content: &str, backup: bool) -> AssembleResult<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    if backup && path.exists() {
        fs::copy(path, path.with_extension("bak"))?;
    }

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|err| AssembleError::Io(err.error))?;

    Ok(())
}
