//! `imgfetch fetch <url>` – download, verify and unpack an archive.

use anyhow::{Context, Result};
use imgfetch_core::config::ImgfetchConfig;
use imgfetch_core::{ErrorKind, FetchRequest, Fetcher};
use std::path::PathBuf;

pub fn run_fetch(
    cfg: &ImgfetchConfig,
    url: String,
    checksum: String,
    checksum_type: String,
    download_dir: Option<PathBuf>,
) -> Result<()> {
    let mut request = FetchRequest::new(url, checksum, checksum_type);
    request.download_dir = download_dir.or_else(|| cfg.download_dir.clone());

    let fetcher = Fetcher::from_config(&cfg.http).context("failed to initialize HTTP client")?;
    match fetcher.fetch_file(&request) {
        Ok(dir) => {
            println!("{}", dir.display());
            Ok(())
        }
        Err(e) => {
            let hint = match e.kind() {
                ErrorKind::Usage => "invalid arguments",
                ErrorKind::Network => "could not download the artifact",
                ErrorKind::Integrity => "downloaded content failed the integrity check",
                ErrorKind::Archive => "could not unpack the archive",
                ErrorKind::Filesystem => "local filesystem error",
            };
            tracing::error!(url = %request.source_url, error = %e, "fetch failed");
            Err(anyhow::Error::new(e).context(hint))
        }
    }
}
