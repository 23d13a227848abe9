//! Checksum computation and verification.
//!
//! Digests are computed over a stream in fixed-size chunks so memory stays
//! bounded regardless of artifact size. Verification reads from the reader's
//! current position; callers rewind before verifying a handle a second time.

use crate::error::FetchError;
use sha2::Digest;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

const BUF_SIZE: usize = 64 * 1024;

/// Hash function used to verify an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha224 => "sha224",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = FetchError;

    /// Accepts names case-insensitively, ignoring `-` and `_` ("SHA-256", "sha_256").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha1" => Ok(DigestAlgorithm::Sha1),
            "sha224" => Ok(DigestAlgorithm::Sha224),
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha384" => Ok(DigestAlgorithm::Sha384),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(FetchError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn hash_reader<D: Digest, R: Read + ?Sized>(reader: &mut R) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Consumes `reader` to its end and returns the digest as lowercase hex.
pub fn digest_reader<R: Read + ?Sized>(
    algorithm: DigestAlgorithm,
    reader: &mut R,
) -> io::Result<String> {
    match algorithm {
        DigestAlgorithm::Md5 => hash_reader::<md5::Md5, _>(reader),
        DigestAlgorithm::Sha1 => hash_reader::<sha1::Sha1, _>(reader),
        DigestAlgorithm::Sha224 => hash_reader::<sha2::Sha224, _>(reader),
        DigestAlgorithm::Sha256 => hash_reader::<sha2::Sha256, _>(reader),
        DigestAlgorithm::Sha384 => hash_reader::<sha2::Sha384, _>(reader),
        DigestAlgorithm::Sha512 => hash_reader::<sha2::Sha512, _>(reader),
    }
}

/// Digest of the file at `path`.
pub fn digest_path(algorithm: DigestAlgorithm, path: &Path) -> Result<String, FetchError> {
    let mut f = File::open(path).map_err(|e| FetchError::io(path, e))?;
    digest_reader(algorithm, &mut f).map_err(|e| FetchError::io(path, e))
}

/// Checks that the rest of `reader` hashes to `expected`.
///
/// The comparison is exact: `expected` must be lowercase hex to match.
/// `path` is only used to label read errors.
pub fn verify<R: Read + ?Sized>(
    reader: &mut R,
    algorithm: DigestAlgorithm,
    expected: &str,
    path: &Path,
) -> Result<(), FetchError> {
    let actual = digest_reader(algorithm, reader).map_err(|e| FetchError::io(path, e))?;
    if actual != expected {
        return Err(FetchError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Like [`verify`] but takes the algorithm by name.
pub fn verify_named<R: Read + ?Sized>(
    reader: &mut R,
    algorithm: &str,
    expected: &str,
    path: &Path,
) -> Result<(), FetchError> {
    verify(reader, algorithm.parse()?, expected, path)
}
