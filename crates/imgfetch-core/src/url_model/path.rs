//! Basename extraction from a URL path.

/// Returns the text after the last `/` of the URL path.
///
/// Returns `None` when the path ends in `/` or the segment is `.` or `..`.
/// Query and fragment are not part of the path and never leak into the name.
pub fn basename_from_url_path(url: &url::Url) -> Option<String> {
    let segment = url.path().rsplit('/').next()?;
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}
