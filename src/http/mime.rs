//! MIME type detection module
//!
//! Maps an asset key's extension to the Content-Type stored with it.

use std::path::Path;

/// Content-Type for an asset key, by its (case-insensitive) extension
pub fn content_type_for_key(key: &str) -> &'static str {
    let extension = Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    get_content_type(extension.as_deref())
}

fn get_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        // Text
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("json") => "application/json",
        Some("js" | "mjs") => "application/javascript",

        // Brand images
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",

        // Media
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Documents and 3D models
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("glb") => "model/gltf-binary",
        Some("gltf") => "model/gltf+json",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brand_assets() {
        assert_eq!(content_type_for_key("logo.png"), "image/png");
        assert_eq!(content_type_for_key("brand/mark.svg"), "image/svg+xml");
        assert_eq!(content_type_for_key("fonts/Inter.woff2"), "font/woff2");
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(content_type_for_key("HERO.JPG"), "image/jpeg");
        assert_eq!(content_type_for_key("intro.Mp4"), "video/mp4");
    }

    #[test]
    fn test_unknown_or_missing_extension() {
        assert_eq!(content_type_for_key("LICENSE"), "application/octet-stream");
        assert_eq!(content_type_for_key("archive.xyz"), "application/octet-stream");
        assert_eq!(content_type_for_key("models/bracket.glb"), "model/gltf-binary");
    }
}
