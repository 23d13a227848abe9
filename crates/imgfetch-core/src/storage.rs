//! Download target files and cache directories.
//!
//! Downloads land in `<final>.part` and are renamed into place only once the
//! transfer succeeded, so a failed or rejected download never replaces the
//! cached copy. A part file that is never finalized is removed on drop.

use crate::error::FetchError;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Permission bits for directories created under the cache root.
#[cfg(unix)]
pub const DIR_MODE: u32 = 0o740;

/// Path for the temp file: appends `.part` to the final path (e.g. `image.tgz` → `image.tgz.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Best-effort `mkdir -p`. Errors are logged and otherwise ignored: an existing
/// directory is the common case, and a real problem resurfaces on the next write.
pub fn ensure_dir(path: &Path) {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    if let Err(e) = builder.create(path) {
        tracing::debug!(path = %path.display(), error = %e, "could not create directory");
    }
}

/// True if `dir` is missing or has no entries.
pub fn is_missing_or_empty(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

/// In-progress download file. Removed on drop unless [`PartFile::finalize`] succeeds.
pub struct PartFile {
    file: Option<File>,
    temp_path: PathBuf,
    written: u64,
}

impl PartFile {
    /// Create (or truncate) `<final_path>.part`.
    pub fn create(final_path: &Path) -> Result<Self, FetchError> {
        let temp_path = temp_path(final_path);
        let file = File::create(&temp_path).map_err(|e| FetchError::io(&temp_path, e))?;
        Ok(Self {
            file: Some(file),
            temp_path,
            written: 0,
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush, close and rename over `final_path`, replacing any previous copy.
    pub fn finalize(mut self, final_path: &Path) -> Result<(), FetchError> {
        if let Some(file) = self.file.take() {
            file.sync_all().map_err(|e| FetchError::io(&self.temp_path, e))?;
        }
        fs::rename(&self.temp_path, final_path).map_err(|e| FetchError::io(final_path, e))?;
        self.temp_path = PathBuf::new();
        Ok(())
    }
}

impl Write for PartFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "part file already closed"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        drop(self.file.take());
        if !self.temp_path.as_os_str().is_empty() {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}
