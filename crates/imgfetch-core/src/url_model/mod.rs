//! URL modeling and cache filename derivation.
//!
//! The cached copy of an artifact is named after the last segment of its URL
//! path, so the same URL always maps to the same file under the cache root.

mod path;

pub use path::basename_from_url_path;

use crate::error::FetchError;

/// Filename used when the URL path has no basename (e.g. `https://host/`).
pub const DEFAULT_FILENAME: &str = "unnamed";

/// Derives the cache filename for `url`.
///
/// Fails only if `url` does not parse.
///
/// # Examples
///
/// - `artifact_filename("https://host/path/image.tar.gz")` → `"image.tar.gz"`
/// - `artifact_filename("https://host/dir/")` → `"unnamed"`
pub fn artifact_filename(url: &str) -> Result<String, FetchError> {
    let parsed = url::Url::parse(url).map_err(|source| FetchError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    Ok(basename_from_url_path(&parsed).unwrap_or_else(|| DEFAULT_FILENAME.to_string()))
}
