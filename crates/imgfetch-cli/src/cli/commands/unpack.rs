//! `imgfetch unpack <archive> <dest>` – extract a local .tar.gz.

use anyhow::Result;
use imgfetch_core::archive;
use std::path::Path;

pub fn run_unpack(archive_path: &Path, dest: &Path) -> Result<()> {
    let written = archive::unpack_file(archive_path, dest)?;
    println!("unpacked {} entries into {}", written.len(), dest.display());
    Ok(())
}
