//! Gzip-compressed tar extraction.

use crate::error::FetchError;
use crate::storage;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};

/// Decompress-and-unpack capability used by the fetcher.
pub trait Unpacker {
    /// Unpacks the archive read from `reader` into `dest`, returning written paths.
    fn unpack(&self, reader: &mut dyn Read, dest: &Path) -> Result<Vec<PathBuf>, FetchError>;
}

/// Default [`Unpacker`] for `.tar.gz` / `.tgz` streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzUnpacker;

impl Unpacker for TarGzUnpacker {
    fn unpack(&self, reader: &mut dyn Read, dest: &Path) -> Result<Vec<PathBuf>, FetchError> {
        unpack(reader, dest)
    }
}

/// Unpack a gzip-compressed tar stream into `dest`.
///
/// `dest` is created if needed. An input with no bytes at all is a clean end
/// of stream and unpacks nothing. Entries keep their relative paths and types;
/// an entry that would land outside `dest` aborts with [`FetchError::UnsafeEntry`].
pub fn unpack<R: Read>(reader: R, dest: &Path) -> Result<Vec<PathBuf>, FetchError> {
    storage::ensure_dir(dest);
    let unpack_err = |source| FetchError::Unpack {
        dest: dest.to_path_buf(),
        source,
    };

    let mut reader = BufReader::new(reader);
    if reader.fill_buf().map_err(unpack_err)?.is_empty() {
        tracing::debug!(dest = %dest.display(), "archive stream is empty, nothing to unpack");
        return Ok(Vec::new());
    }

    tracing::debug!(dest = %dest.display(), "unpacking gzip tar stream");
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let mut written = Vec::new();
    for entry in archive.entries().map_err(unpack_err)? {
        let mut entry = entry.map_err(unpack_err)?;
        let rel = entry.path().map_err(unpack_err)?.into_owned();
        if !entry.unpack_in(dest).map_err(unpack_err)? {
            return Err(FetchError::UnsafeEntry {
                entry: rel,
                dest: dest.to_path_buf(),
            });
        }
        // Report where tar actually wrote the entry: root, prefix and `.` are dropped.
        let landed: PathBuf = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect();
        if !landed.as_os_str().is_empty() {
            written.push(dest.join(landed));
        }
    }
    tracing::debug!(dest = %dest.display(), entries = written.len(), "archive unpacked");
    Ok(written)
}

/// Unpack the `.tar.gz` file at `archive_path` into `dest`.
pub fn unpack_file(archive_path: &Path, dest: &Path) -> Result<Vec<PathBuf>, FetchError> {
    let file = File::open(archive_path).map_err(|e| FetchError::io(archive_path, e))?;
    unpack(file, dest)
}
