use crate::error::Result;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Create `path` holding `data` unless something already lives there.
///
/// The bytes are staged in a sibling tempfile and linked into place with
/// `persist_noclobber`, so a concurrent writer can never be overwritten and
/// readers never observe a half-written file. Returns `false` when the
/// destination already existed.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;

    match staged.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error.into()),
    }
}
