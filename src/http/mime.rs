//! MIME type detection for static content.

use std::path::Path;

use new_mime_guess::MimeGuess;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type for `path` based on its extension.
///
/// Text types get an explicit UTF-8 charset; unknown extensions fall back to
/// `application/octet-stream`.
pub fn content_type_for(path: &Path) -> String {
    match MimeGuess::from_path(path).first() {
        Some(mime) if mime.type_().as_str() == "text" => {
            format!("{}; charset=utf-8", mime.essence_str())
        }
        Some(mime) => mime.essence_str().to_string(),
        None => OCTET_STREAM.to_string(),
    }
}
