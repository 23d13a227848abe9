pub mod config;
pub mod logging;

// Pipeline: fetcher -> downloader -> storage -> checksum -> archive
pub mod archive;
pub mod checksum;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod request;
pub mod storage;
pub mod url_model;

pub use error::{ErrorKind, FetchError};
pub use fetcher::Fetcher;
pub use request::FetchRequest;
