//! Single-GET artifact downloader.
//!
//! The HTTP transport sits behind [`HttpClient`] so one client (and its
//! connection cache) can be reused across fetches and replaced in tests.
//! [`download`] streams the body into a `.part` file and only moves it over
//! the destination after a 200 response.

mod curl_client;

pub use curl_client::CurlClient;

use crate::error::FetchError;
use crate::storage::PartFile;
use indicatif::HumanBytes;
use std::io::Write;
use std::path::Path;

/// Status code accepted as a successful download. Anything else is an error.
pub const HTTP_OK: u32 = 200;

/// Blocking HTTP GET capability.
pub trait HttpClient {
    /// Performs a GET for `url`, streaming the response body into `body`.
    /// Returns the final HTTP status code.
    fn get(&self, url: &str, body: &mut dyn Write) -> Result<u32, FetchError>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn get(&self, url: &str, body: &mut dyn Write) -> Result<u32, FetchError> {
        (**self).get(url, body)
    }
}

/// Downloads `url` to `dest`, replacing any existing file. Returns bytes written.
///
/// On transport error or non-200 status `dest` is left untouched.
pub fn download<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    dest: &Path,
) -> Result<u64, FetchError> {
    tracing::debug!(url, dest = %dest.display(), "downloading");
    let mut part = PartFile::create(dest)?;
    let code = match client.get(url, &mut part) {
        Ok(code) => code,
        // The client only sees a writer; name the file it failed to write.
        Err(FetchError::Io { source, .. }) => {
            return Err(FetchError::io(part.temp_path(), source));
        }
        Err(e) => return Err(e),
    };
    if code != HTTP_OK {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            code,
        });
    }
    part.flush().map_err(|e| FetchError::io(part.temp_path(), e))?;
    let written = part.written();
    part.finalize(dest)?;
    tracing::debug!(dest = %dest.display(), "{} written", HumanBytes(written));
    Ok(written)
}
