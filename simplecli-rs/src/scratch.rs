//! Per-invocation scratch file.
//!
//! Commands declared with a path parameter get a fresh, empty temporary file
//! for the duration of one call.  The file is removed when the
//! [`ScratchFile`] is dropped, so every exit path of the dispatcher cleans up;
//! [`ScratchFile::remove`] does it eagerly and logs a failure.

use std::io;
use std::path::Path;

use tempfile::TempPath;

pub const PREFIX: &str = "simplecli";

#[derive(Debug)]
pub struct ScratchFile {
    path: TempPath,
}

impl ScratchFile {
    /// Create an empty file in the system temp directory.  The handle is
    /// closed straight away; commands only receive the path.
    pub fn create() -> io::Result<Self> {
        let file = tempfile::Builder::new().prefix(PREFIX).tempfile()?;
        let path = file.into_temp_path();
        tracing::debug!(path = %path.display(), "created scratch file");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now.
    pub fn remove(self) {
        let shown = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => tracing::debug!(path = %shown, "removed scratch file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %shown, error = %e, "can't remove scratch file"),
        }
    }
}
