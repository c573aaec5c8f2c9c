//! Write-to-temp-then-rename file replacement.

use std::io::{self, Write};
use std::path::Path;

/// File name prefix of in-flight temporary files.
pub const TEMP_PREFIX: &str = "_tmp_";

/// Replace `dest` with `bytes` without ever exposing a partial file.
///
/// The bytes go to a temporary sibling of `dest` first, which is then
/// renamed over it. Missing parent directories are created. On failure the
/// destination is left untouched and the temporary file is removed.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_data()?;
    temp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}
