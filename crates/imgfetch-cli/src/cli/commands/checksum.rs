//! Checksum command: compute the digest of a file.

use anyhow::Result;
use imgfetch_core::checksum::{self, DigestAlgorithm};
use std::path::Path;

/// Compute and print the digest of the given file.
pub fn run_checksum(path: &Path, algorithm: &str) -> Result<()> {
    let algorithm: DigestAlgorithm = algorithm.parse()?;
    let digest = checksum::digest_path(algorithm, path)?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
