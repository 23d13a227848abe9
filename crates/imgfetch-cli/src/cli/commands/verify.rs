//! `imgfetch verify <path>` – check a file against an expected checksum.

use anyhow::{Context, Result};
use imgfetch_core::checksum;
use std::fs::File;
use std::path::Path;

pub fn run_verify(path: &Path, expected: &str, algorithm: &str) -> Result<()> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    checksum::verify_named(&mut file, algorithm, expected, path)?;
    println!("{}: OK", path.display());
    Ok(())
}
