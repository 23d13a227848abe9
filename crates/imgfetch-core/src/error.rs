//! Error type for the fetch pipeline.
//!
//! Every failure is a distinct variant so callers can tell connectivity,
//! integrity and archive problems apart (see [`FetchError::kind`]).

use std::io;
use std::path::PathBuf;

/// Error returned by any stage of the fetch pipeline.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// A required request field is missing. Signals misuse, not a runtime condition.
    #[error("invalid fetch request: {0} is required")]
    InvalidRequest(&'static str),

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported checksum algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The URL basename equals the digest, so the cached file and the
    /// extraction directory would be the same path.
    #[error("cached file and extraction directory would both be {}", .path.display())]
    PathCollision { path: PathBuf },

    /// Curl reported an error (DNS, connect, TLS, timeout, ...).
    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: curl::Error,
    },

    /// Server answered with anything other than 200.
    #[error("unable to fetch {url}: server returned HTTP {code}")]
    HttpStatus { url: String, code: u32 },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Gzip or tar decoding failed, or an entry could not be written.
    #[error("failed to unpack archive into {}: {source}", .dest.display())]
    Unpack {
        dest: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Archive entry would be written outside the destination directory.
    #[error("archive entry {} escapes destination {}", .entry.display(), .dest.display())]
    UnsafeEntry { entry: PathBuf, dest: PathBuf },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Coarse category of a [`FetchError`], for operators and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller misuse (missing field, bad URL, unknown algorithm). Not retryable.
    Usage,
    /// Could not reach the server or the server refused the request.
    Network,
    /// Downloaded content failed the integrity check.
    Integrity,
    /// The artifact is not a valid gzip-compressed tar stream.
    Archive,
    /// Local disk error.
    Filesystem,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidRequest(_)
            | FetchError::InvalidUrl { .. }
            | FetchError::UnsupportedAlgorithm(_)
            | FetchError::PathCollision { .. } => ErrorKind::Usage,
            FetchError::Transport { .. } | FetchError::HttpStatus { .. } => ErrorKind::Network,
            FetchError::ChecksumMismatch { .. } => ErrorKind::Integrity,
            FetchError::Unpack { .. } | FetchError::UnsafeEntry { .. } => ErrorKind::Archive,
            FetchError::Io { .. } => ErrorKind::Filesystem,
        }
    }

    /// True for runtime failures that a caller may reasonably retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Integrity)
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }
}
