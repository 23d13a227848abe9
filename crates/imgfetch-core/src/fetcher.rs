//! Fetch → verify → cache → unpack pipeline.
//!
//! A fetch reuses the cached download when it still matches the expected
//! digest, re-downloads at most once when it does not, and unpacks the archive
//! into a directory named by the digest unless that directory already has
//! content. A non-empty extraction directory is trusted as complete. A failed
//! unpack removes its directory again; a partially unpacked directory left by
//! a killed process must be removed by hand.

use crate::archive::{TarGzUnpacker, Unpacker};
use crate::checksum::{self, DigestAlgorithm};
use crate::config::HttpConfig;
use crate::downloader::{self, CurlClient, HttpClient};
use crate::error::FetchError;
use crate::request::{ArtifactPaths, FetchRequest};
use crate::storage;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Runs fetch requests against a shared HTTP client and unpacker.
///
/// Concurrent calls on one `Fetcher` that share a cache root are serialized,
/// so two threads asking for the same artifact download it at most once.
/// Other processes using the same cache root are not coordinated.
pub struct Fetcher<C = CurlClient, U = TarGzUnpacker> {
    client: C,
    unpacker: U,
    cache_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl Fetcher {
    /// Fetcher backed by libcurl configured from `cfg`.
    pub fn from_config(cfg: &HttpConfig) -> Result<Self, curl::Error> {
        Ok(Self::new(CurlClient::new(cfg)?))
    }
}

impl<C: HttpClient> Fetcher<C> {
    pub fn new(client: C) -> Self {
        Self::with_unpacker(client, TarGzUnpacker)
    }
}

impl<C: HttpClient, U: Unpacker> Fetcher<C, U> {
    pub fn with_unpacker(client: C, unpacker: U) -> Self {
        Self {
            client,
            unpacker,
            cache_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the absolute path of a directory holding the unpacked artifact.
    ///
    /// Every file under the returned path came from an archive whose
    /// compressed bytes hashed to `request.expected_digest`.
    pub fn fetch_file(&self, request: &FetchRequest) -> Result<PathBuf, FetchError> {
        request.validate()?;
        let algorithm = request.algorithm()?;
        let download_dir = request.resolved_download_dir()?;
        let paths = ArtifactPaths::new(&download_dir, request)?;

        let lock = self.cache_lock(&download_dir);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        storage::ensure_dir(&download_dir);

        let mut file = self.acquire(request, algorithm, &paths)?;

        if storage::is_missing_or_empty(&paths.extract_dir) {
            rewind(&mut file, &paths.file_path)?;
            let written = match self.unpacker.unpack(&mut file, &paths.extract_dir) {
                Ok(written) => written,
                Err(e) => {
                    // A half-written directory would pass the non-empty gate next time.
                    if let Err(rm) = fs::remove_dir_all(&paths.extract_dir) {
                        tracing::debug!(
                            dest = %paths.extract_dir.display(),
                            error = %rm,
                            "could not remove partial extraction"
                        );
                    }
                    return Err(e);
                }
            };
            tracing::debug!(
                dest = %paths.extract_dir.display(),
                entries = written.len(),
                "artifact unpacked"
            );
        } else {
            tracing::debug!(
                dest = %paths.extract_dir.display(),
                "extraction directory already populated, skipping unpack"
            );
        }

        Ok(paths.extract_dir)
    }

    /// Returns an open, verified handle on the cached download.
    fn acquire(
        &self,
        request: &FetchRequest,
        algorithm: DigestAlgorithm,
        paths: &ArtifactPaths,
    ) -> Result<File, FetchError> {
        let path = &paths.file_path;
        tracing::debug!("opening {}", path.display());
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("{} does not exist, downloading it", path.display());
                self.download_and_open(&request.source_url, path)?
            }
            Err(e) => return Err(FetchError::io(path, e)),
        };

        match checksum::verify(&mut file, algorithm, &request.expected_digest, path) {
            Ok(()) => return Ok(file),
            Err(FetchError::ChecksumMismatch { expected, actual }) => {
                tracing::debug!(
                    expected = %expected,
                    actual = %actual,
                    "{} does not match checksum, downloading it again",
                    path.display()
                );
            }
            Err(e) => return Err(e),
        }
        drop(file);

        let mut file = self.download_and_open(&request.source_url, path)?;
        checksum::verify(&mut file, algorithm, &request.expected_digest, path)?;
        Ok(file)
    }

    fn download_and_open(&self, url: &str, path: &Path) -> Result<File, FetchError> {
        downloader::download(&self.client, url, path)?;
        File::open(path).map_err(|e| FetchError::io(path, e))
    }

    fn cache_lock(&self, download_dir: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.cache_locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(download_dir.to_path_buf()).or_default())
    }
}

fn rewind(file: &mut File, path: &Path) -> Result<(), FetchError> {
    file.seek(SeekFrom::Start(0))
        .map(|_| ())
        .map_err(|e| FetchError::io(path, e))
}

/// One-shot fetch with a default libcurl client.
pub fn fetch_file(request: &FetchRequest) -> Result<PathBuf, FetchError> {
    request.validate()?;
    let fetcher = Fetcher::from_config(&HttpConfig::default()).map_err(|source| {
        FetchError::Transport {
            url: request.source_url.clone(),
            source,
        }
    })?;
    fetcher.fetch_file(request)
}

#[cfg(test)]
mod tests;
