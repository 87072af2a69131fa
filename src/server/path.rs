//! Request path decoding and the document root gate.
//!
//! Everything here is pure string and path manipulation. Nothing touches the
//! filesystem, so a path that escapes the root is refused whether or not
//! anything exists at the place it points to.

use std::path::{Path, PathBuf};

use crate::server::error::ResourceError;

/// Decode `%XX` escapes in a request path.
///
/// Fails on malformed escapes, on bytes that are not UTF-8 once decoded, and
/// on control characters (NUL included).
pub fn percent_decode(raw: &str) -> Result<String, ResourceError> {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ResourceError::BadRequest(format!("invalid percent escape in {raw}")))?;
            decoded.push(hex);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    let decoded = String::from_utf8(decoded)
        .map_err(|_| ResourceError::BadRequest(format!("{raw} is not valid UTF-8 once decoded")))?;
    if decoded.chars().any(char::is_control) {
        return Err(ResourceError::BadRequest(format!("control character in {raw}")));
    }
    Ok(decoded)
}

/// Collapse `.` and `..` segments and drop empty ones.
///
/// A `..` with nothing left to pop would climb above the root and is refused.
pub fn normalize(decoded: &str) -> Result<Vec<&str>, ResourceError> {
    let mut segments = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(ResourceError::Forbidden(format!("{decoded} escapes the document root")));
                }
            }
            _ => segments.push(segment),
        }
    }
    Ok(segments)
}

/// Map a raw request path onto a location below `root`.
///
/// `root` must already be canonical. The joined path is checked to still
/// start with `root` before it is returned.
pub fn resolve_under(root: &Path, raw_path: &str) -> Result<PathBuf, ResourceError> {
    let decoded = percent_decode(raw_path)?;
    let segments = normalize(&decoded)?;

    let mut resolved = root.to_path_buf();
    resolved.extend(&segments);

    if !resolved.starts_with(root) {
        return Err(ResourceError::Forbidden(format!("{decoded} escapes the document root")));
    }
    Ok(resolved)
}
