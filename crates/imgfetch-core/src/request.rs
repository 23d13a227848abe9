//! Fetch request and the on-disk cache layout derived from it.

use crate::checksum::DigestAlgorithm;
use crate::error::FetchError;
use crate::url_model;
use std::path::{Path, PathBuf};

/// What to fetch, how to check it, and where to cache it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    /// Remote artifact URL.
    pub source_url: String,
    /// Hex digest the downloaded bytes must hash to.
    pub expected_digest: String,
    /// Hash function name (e.g. "sha256").
    pub digest_algorithm: String,
    /// Cache root. `None` or empty uses the system temp directory.
    pub download_dir: Option<PathBuf>,
}

impl FetchRequest {
    pub fn new(
        source_url: impl Into<String>,
        expected_digest: impl Into<String>,
        digest_algorithm: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            expected_digest: expected_digest.into(),
            digest_algorithm: digest_algorithm.into(),
            download_dir: None,
        }
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Rejects requests missing a required field. Performs no I/O.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.source_url.is_empty() {
            return Err(FetchError::InvalidRequest("source URL"));
        }
        if self.expected_digest.is_empty() {
            return Err(FetchError::InvalidRequest("checksum"));
        }
        if self.digest_algorithm.is_empty() {
            return Err(FetchError::InvalidRequest("checksum type"));
        }
        Ok(())
    }

    /// Parses `digest_algorithm`.
    pub fn algorithm(&self) -> Result<DigestAlgorithm, FetchError> {
        self.digest_algorithm.parse()
    }

    /// Cache root for this request, made absolute against the current directory.
    pub fn resolved_download_dir(&self) -> Result<PathBuf, FetchError> {
        let dir = match self.download_dir.as_deref() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => std::env::temp_dir(),
        };
        if dir.is_absolute() {
            return Ok(dir);
        }
        let cwd = std::env::current_dir().map_err(|e| FetchError::io(".", e))?;
        Ok(cwd.join(dir))
    }
}

/// Where a request's artifact lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Cache root.
    pub download_dir: PathBuf,
    /// Raw downloaded bytes, named by URL basename.
    pub file_path: PathBuf,
    /// Unpacked contents, named by the expected digest.
    pub extract_dir: PathBuf,
}

impl ArtifactPaths {
    /// Derives the layout for `request` under `download_dir`.
    ///
    /// Fails with [`FetchError::PathCollision`] when the URL basename equals
    /// the expected digest.
    pub fn new(download_dir: &Path, request: &FetchRequest) -> Result<Self, FetchError> {
        let filename = url_model::artifact_filename(&request.source_url)?;
        let file_path = download_dir.join(filename);
        let extract_dir = download_dir.join(&request.expected_digest);
        if file_path == extract_dir {
            return Err(FetchError::PathCollision { path: file_path });
        }
        Ok(Self {
            download_dir: download_dir.to_path_buf(),
            file_path,
            extract_dir,
        })
    }
}
