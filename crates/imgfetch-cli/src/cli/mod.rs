//! CLI for imgfetch.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use imgfetch_core::config;
use std::path::PathBuf;

use commands::{run_checksum, run_completions, run_fetch, run_manpage, run_unpack, run_verify};

/// Top-level CLI for imgfetch.
#[derive(Debug, Parser)]
#[command(name = "imgfetch")]
#[command(about = "Fetch, verify, cache and unpack remote image archives", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download (or reuse) an archive, verify it and unpack it once.
    Fetch {
        /// HTTP/HTTPS URL of the archive.
        url: String,
        /// Expected checksum (lowercase hex).
        #[arg(long)]
        checksum: String,
        /// Checksum algorithm: md5, sha1, sha224, sha256, sha384 or sha512.
        #[arg(long, value_name = "ALGORITHM")]
        checksum_type: String,
        /// Cache directory (default: config `download_dir`, else the system temp dir).
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,
    },

    /// Compute the checksum of a local file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
        #[arg(long, default_value = "sha256")]
        algorithm: String,
    },

    /// Check a local file against an expected checksum.
    Verify {
        /// Path to the file.
        path: PathBuf,
        #[arg(long)]
        checksum: String,
        #[arg(long, value_name = "ALGORITHM")]
        checksum_type: String,
    },

    /// Unpack a local .tar.gz archive into a directory.
    Unpack {
        /// Archive to unpack.
        archive: PathBuf,
        /// Destination directory (created if missing).
        dest: PathBuf,
    },

    /// Print shell completions to stdout.
    Completions {
        shell: clap_complete::Shell,
    },

    /// Print the man page (roff) to stdout.
    Manpage,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Fetch {
                url,
                checksum,
                checksum_type,
                download_dir,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_fetch(&cfg, url, checksum, checksum_type, download_dir)?;
            }
            CliCommand::Checksum { path, algorithm } => run_checksum(&path, &algorithm)?,
            CliCommand::Verify {
                path,
                checksum,
                checksum_type,
            } => run_verify(&path, &checksum, &checksum_type)?,
            CliCommand::Unpack { archive, dest } => run_unpack(&archive, &dest)?,
            CliCommand::Completions { shell } => run_completions(shell)?,
            CliCommand::Manpage => run_manpage()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
