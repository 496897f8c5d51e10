//! MIME type detection module
//!
//! Default `Content-Type` the file responder sends for a served file. The
//! resolver may later overlay its own value for compressed variants.

use std::path::Path;

/// Fallback for unknown or missing extensions
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Get MIME Content-Type based on file extension (case-insensitive)
///
/// # Examples
/// ```
/// use precomp_server::http::mime::for_extension;
/// assert_eq!(for_extension(Some("html")), "text/html; charset=utf-8");
/// assert_eq!(for_extension(Some("WASM")), "application/wasm");
/// assert_eq!(for_extension(None), "application/octet-stream");
/// ```
pub fn for_extension(extension: Option<&str>) -> &'static str {
    let Some(ext) = extension else {
        return OCTET_STREAM;
    };

    match ext.to_ascii_lowercase().as_str() {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "json" => "application/json",

        // Web runtime bundles
        "js" | "mjs" => "application/javascript",
        "wasm" => "application/wasm",
        "data" | "bin" | "unityweb" => OCTET_STREAM,
        "gz" | "gzip" => "application/gzip",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",

        // Audio / video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Archives
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "pdf" => "application/pdf",

        _ => OCTET_STREAM,
    }
}

/// Content type for a file on disk, from its final extension
pub fn for_path(path: &Path) -> &'static str {
    for_extension(path.extension().and_then(|e| e.to_str()))
}
