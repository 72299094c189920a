//! Static extension to content-type table

/// Fallback for extensions outside the table
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type for a logical (uncompressed) key
///
/// Extension matching is ASCII case-insensitive. Callers pass the logical key,
/// so `.gz` only reaches this table for keys requested by their stored name.
pub fn content_type_for(key: &str) -> &'static str {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    let extension = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return DEFAULT_CONTENT_TYPE,
    };

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "wasm" => "application/wasm",
        "webmanifest" => "application/manifest+json",
        "prbm" => "application/octet-stream",
        "gz" => "application/gzip",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
